use crate::classifier::signature::{compose, contains_any, normalize, CandidateElement};
use crate::core::{ClassifierConfig, NodeId, PageDom};
use tracing::debug;

/// Elements that can act as a load-more control.
pub const CLICKABLE_SELECTOR: &str =
    r#"button, a, [role="button"], input[type="button"], input[type="submit"]"#;

/// Site chrome a load-more control should not live in. Navigation landmarks
/// about products or pagination are allowed.
const CHROME_SELECTOR: &str =
    r#"header, footer, nav:not([class*="product"]):not([class*="pagination"])"#;

const BACKWARD_MARKERS: [&str; 3] = ["previous", "prev ", " back"];

/// Guesses whether a clickable element appends more results to the page.
#[derive(Debug, Clone, Default)]
pub struct LoadMoreClassifier {
    config: ClassifierConfig,
}

impl LoadMoreClassifier {
    pub fn new(config: ClassifierConfig) -> Self {
        Self { config }
    }

    /// All load-more candidates currently on the page, in document order.
    pub fn find_candidates<D: PageDom + ?Sized>(&self, page: &D) -> Vec<CandidateElement> {
        match page.query_selector_all(CLICKABLE_SELECTOR) {
            Ok(nodes) => nodes
                .into_iter()
                .filter_map(|node| self.classify(page, node))
                .collect(),
            Err(e) => {
                debug!("Cannot scan for load-more controls: {}", e);
                Vec::new()
            }
        }
    }

    pub fn looks_like_load_more_button<D: PageDom + ?Sized>(&self, page: &D, element: NodeId) -> bool {
        self.classify(page, element).is_some()
    }

    pub fn classify<D: PageDom + ?Sized>(&self, page: &D, element: NodeId) -> Option<CandidateElement> {
        if page.is_disabled(element)
            || page.attribute(element, "aria-disabled").as_deref() == Some("true")
        {
            return None;
        }

        let text = normalize(&page.text_content(element));
        let attr = |name: &str| page.attribute(element, name).unwrap_or_default();
        let (aria_label, title, class, id, href) = (
            attr("aria-label"),
            attr("title"),
            attr("class"),
            attr("id"),
            attr("href"),
        );
        let signature = compose([
            text.as_str(),
            aria_label.as_str(),
            title.as_str(),
            class.as_str(),
            id.as_str(),
            href.as_str(),
        ]);

        if !contains_any(&signature, &self.config.load_more_keywords) {
            return None;
        }

        // numbered pagination links
        if !text.is_empty() && text.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }

        if contains_any(&signature, &BACKWARD_MARKERS) {
            return None;
        }

        let in_site_chrome = page
            .closest(element, CHROME_SELECTOR)
            .ok()
            .flatten()
            .is_some();
        if in_site_chrome && !signature.contains("product") {
            return None;
        }

        Some(CandidateElement {
            node: element,
            signature,
        })
    }
}
