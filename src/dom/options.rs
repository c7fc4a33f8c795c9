use crate::core::{NodeId, PageDom};

/// An `<option>` whose value reads as a positive integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NumericOption {
    pub index: usize,
    pub node: NodeId,
    pub value: i64,
}

/// Leading base-10 integer of `raw`, `parseInt` style: leading whitespace and
/// an optional sign are accepted and trailing garbage is ignored, so
/// `"100 items"` reads as 100.
pub fn parse_leading_int(raw: &str) -> Option<i64> {
    let trimmed = raw.trim_start();
    let (negative, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let mut seen = false;
    let mut value: i64 = 0;
    for b in digits.bytes() {
        if !b.is_ascii_digit() {
            break;
        }
        seen = true;
        value = value.saturating_mul(10).saturating_add(i64::from(b - b'0'));
    }

    if !seen {
        return None;
    }
    Some(if negative { -value } else { value })
}

/// Reads an option's number from its value, falling back to its text when
/// the value is missing, zero or not numeric.
pub fn option_number<D: PageDom + ?Sized>(page: &D, option: NodeId) -> Option<i64> {
    match parse_leading_int(&page.option_value(option)) {
        Some(v) if v != 0 => Some(v),
        _ => parse_leading_int(&page.text_content(option)),
    }
}

/// Options of `select` with a positive numeric value, in document order.
pub fn numeric_options<D: PageDom + ?Sized>(page: &D, select: NodeId) -> Vec<NumericOption> {
    page.options(select)
        .into_iter()
        .enumerate()
        .filter_map(|(index, node)| {
            option_number(page, node)
                .filter(|v| *v > 0)
                .map(|value| NumericOption { index, node, value })
        })
        .collect()
}

/// The option with the strictly largest value; the first one wins ties.
pub fn max_option(options: &[NumericOption]) -> Option<NumericOption> {
    options.iter().copied().fold(None, |best, current| match best {
        Some(b) if current.value <= b.value => Some(b),
        _ => Some(current),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestHelper;

    #[test]
    fn test_parse_leading_int() {
        assert_eq!(parse_leading_int("100"), Some(100));
        assert_eq!(parse_leading_int("  48 per page"), Some(48));
        assert_eq!(parse_leading_int("-2"), Some(-2));
        assert_eq!(parse_leading_int("+7"), Some(7));
        assert_eq!(parse_leading_int("All"), None);
        assert_eq!(parse_leading_int(""), None);
        assert_eq!(parse_leading_int("-"), None);
    }

    #[test]
    fn test_value_falls_back_to_text() {
        let doc = TestHelper::document(
            r#"<select id="s">
                <option value="all">25</option>
                <option value="0">50 items</option>
                <option value="-3">75</option>
                <option>100</option>
                <option value="x">Everything</option>
            </select>"#,
        );
        let select = doc.find("#s").unwrap();
        let values: Vec<i64> = numeric_options(&doc, select)
            .iter()
            .map(|o| o.value)
            .collect();
        assert_eq!(values, vec![25, 50, 100]);
    }

    #[test]
    fn test_max_option_prefers_first_on_ties() {
        let options = vec![
            NumericOption { index: 0, node: NodeId(1), value: 10 },
            NumericOption { index: 1, node: NodeId(2), value: 100 },
            NumericOption { index: 2, node: NodeId(3), value: 100 },
        ];
        assert_eq!(max_option(&options).unwrap().index, 1);
        assert!(max_option(&[]).is_none());
    }
}
