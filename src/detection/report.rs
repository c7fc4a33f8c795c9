use crate::core::{DetectionMethod, PageDom};
use crate::registry::{SiteConfig, Strategy};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Answer to an explicit retry request, with enough context to tell why a
/// page was or was not handled.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryReport {
    pub host: String,
    pub url: String,
    pub applied_before: bool,
    /// Whether the page size is applied after the retry.
    pub applied_after: bool,
    pub method: Option<DetectionMethod>,
    pub select_elements: usize,
    pub matched_config: Option<MatchedConfig>,
    pub timestamp: DateTime<Utc>,
}

/// The registry entry that matched the host and how much of it resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchedConfig {
    pub domain: String,
    pub strategy: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selectors: Option<Vec<String>>,
    /// Candidate selectors that currently resolve to an element.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub found_selectors: Option<Vec<String>>,
}

impl MatchedConfig {
    pub fn inspect<D: PageDom + ?Sized>(site: &SiteConfig, page: &D) -> Self {
        let (selectors, found_selectors) = match &site.descriptor.strategy {
            Strategy::SelectMaxNumeric { selectors } => {
                let found = selectors
                    .iter()
                    .filter(|selector| matches!(page.query_selector(selector), Ok(Some(_))))
                    .cloned()
                    .collect();
                (Some(selectors.clone()), Some(found))
            }
            Strategy::UrlParam { .. } => (None, None),
        };

        Self {
            domain: site.domain.clone(),
            strategy: site.descriptor.strategy.name().to_string(),
            selectors,
            found_selectors,
        }
    }
}
