use crate::classifier::signature::{compose, contains_any, truncate_chars, CandidateElement};
use crate::core::{ClassifierConfig, NodeId, PageDom};
use crate::dom::numeric_options;
use std::collections::BTreeSet;
use tracing::debug;

const CONTAINER_SELECTOR: &str = "div, span, label, form";

/// Guesses whether a select control chooses how many results a page shows.
#[derive(Debug, Clone, Default)]
pub struct PageSizeClassifier {
    config: ClassifierConfig,
}

impl PageSizeClassifier {
    pub fn new(config: ClassifierConfig) -> Self {
        Self { config }
    }

    /// First select on the page that looks like a page-size selector.
    pub fn detect<D: PageDom + ?Sized>(&self, page: &D) -> Option<CandidateElement> {
        let selects = page.query_selector_all("select").ok()?;
        selects
            .into_iter()
            .find_map(|select| self.classify(page, select))
    }

    pub fn looks_like_page_size_selector<D: PageDom + ?Sized>(&self, page: &D, select: NodeId) -> bool {
        self.classify(page, select).is_some()
    }

    pub fn classify<D: PageDom + ?Sized>(&self, page: &D, select: NodeId) -> Option<CandidateElement> {
        let signature = self.signature(page, select);
        if !contains_any(&signature, &self.config.page_size_keywords) {
            return None;
        }

        let values: Vec<i64> = numeric_options(page, select)
            .iter()
            .map(|option| option.value)
            .collect();
        if !self.has_page_size_values(&values) {
            return None;
        }

        debug!("Select {} looks like a page-size selector", select);
        Some(CandidateElement {
            node: select,
            signature,
        })
    }

    /// Attributes of the control, its `<label for>` text, and the start of
    /// its enclosing container's text.
    pub fn signature<D: PageDom + ?Sized>(&self, page: &D, select: NodeId) -> String {
        let attr = |name: &str| page.attribute(select, name).unwrap_or_default();
        let (name, id, aria_label, title, class) = (
            attr("name"),
            attr("id"),
            attr("aria-label"),
            attr("title"),
            attr("class"),
        );

        let label = if id.is_empty() {
            String::new()
        } else {
            label_selector(&id)
                .and_then(|selector| page.query_selector(&selector).ok().flatten())
                .map(|label| page.text_content(label))
                .unwrap_or_default()
        };

        let container = page
            .closest(select, CONTAINER_SELECTOR)
            .ok()
            .flatten()
            .map(|parent| page.text_content(parent))
            .unwrap_or_default();
        let container = truncate_chars(&container, self.config.container_text_limit);

        compose([
            name.as_str(),
            id.as_str(),
            aria_label.as_str(),
            title.as_str(),
            class.as_str(),
            label.as_str(),
            container,
        ])
    }

    /// Numeric half of the test: enough distinct values, and either a common
    /// page size among them or a reasonable progression.
    pub fn has_page_size_values(&self, values: &[i64]) -> bool {
        let distinct: BTreeSet<i64> = values.iter().copied().collect();
        if distinct.len() < self.config.min_numeric_options {
            return false;
        }

        let has_common_size = values
            .iter()
            .any(|v| self.config.common_page_sizes.contains(v));
        has_common_size || self.is_reasonable_progression(values)
    }

    /// Sorted values start within the configured first-value bounds and
    /// increase strictly without exceeding the maximum.
    pub fn is_reasonable_progression(&self, values: &[i64]) -> bool {
        let bounds = self.config.progression;
        let mut sorted = values.to_vec();
        sorted.sort_unstable();

        let Some(first) = sorted.first() else {
            return false;
        };
        if *first < bounds.first_min || *first > bounds.first_max {
            return false;
        }
        sorted
            .windows(2)
            .all(|pair| pair[1] > pair[0] && pair[1] <= bounds.max)
    }
}

fn label_selector(id: &str) -> Option<String> {
    if id.contains('\n') {
        return None;
    }
    let escaped = id.replace('\\', "\\\\").replace('"', "\\\"");
    Some(format!(r#"label[for="{}"]"#, escaped))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestHelper;

    fn classify(html: &str) -> bool {
        let doc = TestHelper::document(html);
        let select = doc.find("select").unwrap();
        PageSizeClassifier::default().looks_like_page_size_selector(&doc, select)
    }

    #[test]
    fn test_per_page_name_is_accepted() {
        assert!(classify(
            r#"<select name="per_page"><option>10</option><option>25</option><option>50</option><option>100</option></select>"#
        ));
    }

    #[test]
    fn test_no_keyword_is_rejected() {
        assert!(!classify(
            r#"<select name="color"><option>10</option><option>25</option><option>50</option><option>100</option></select>"#
        ));
    }

    #[test]
    fn test_single_option_is_rejected() {
        assert!(!classify(
            r#"<select name="page-size"><option>50</option></select>"#
        ));
        assert!(!classify(
            r#"<select name="page-size"><option>50</option><option value="50">fifty</option></select>"#
        ));
    }

    #[test]
    fn test_label_text_counts_as_keyword() {
        assert!(classify(
            r#"<p><label for="n">Results per page</label></p>
               <p><select id="n"><option>20</option><option>40</option></select></p>"#
        ));
    }

    #[test]
    fn test_container_text_counts_as_keyword() {
        assert!(classify(
            r#"<div>Show <select><option>20</option><option>40</option></select> entries</div>"#
        ));
    }

    #[test]
    fn test_container_text_is_truncated() {
        let filler = "x".repeat(120);
        let html = format!(
            r#"<div>{filler} per page <select><option>20</option><option>40</option></select></div>"#
        );
        assert!(!classify(&html));
    }

    #[test]
    fn test_progression_without_common_sizes() {
        let classifier = PageSizeClassifier::default();
        assert!(classifier.has_page_size_values(&[7, 14, 28]));
        assert!(!classifier.has_page_size_values(&[3, 9, 27]));
        assert!(!classifier.has_page_size_values(&[7, 14, 2000]));
        assert!(!classifier.has_page_size_values(&[55, 110]));
    }

    #[test]
    fn test_detect_returns_first_match() {
        let doc = TestHelper::document(
            r#"<select name="sort"><option>Price</option><option>Name</option></select>
               <select id="a" name="limit"><option>10</option><option>50</option></select>
               <select id="b" name="rows"><option>10</option><option>50</option></select>"#,
        );
        let found = PageSizeClassifier::default().detect(&doc).unwrap();
        assert_eq!(Some(found.node), doc.find("#a"));
        assert!(found.signature.contains("limit"));
    }

    #[test]
    fn test_label_selector_escapes_quotes() {
        assert_eq!(
            label_selector(r#"a"b"#).unwrap(),
            r#"label[for="a\"b"]"#
        );
    }
}
