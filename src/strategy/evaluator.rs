use crate::core::{DomEvent, NodeId, PageDom};
use crate::dom::{max_option, numeric_options};
use crate::errors::Result;
use crate::registry::{Strategy, StrategyDescriptor};
use serde::Serialize;
use tracing::{debug, info, warn};
use url::Url;

/// Result of one strategy attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplyOutcome {
    /// A control was switched to its largest option.
    Updated,
    /// The control or URL was already at its maximum.
    AlreadyAtMax,
    /// The page is navigating to the rewritten URL.
    Navigated,
    /// The descriptor's URL pattern rejected the current page.
    NotApplicable,
    /// Nothing on the page could be used.
    NoMatch,
}

impl ApplyOutcome {
    pub fn is_success(self) -> bool {
        matches!(
            self,
            ApplyOutcome::Updated | ApplyOutcome::AlreadyAtMax | ApplyOutcome::Navigated
        )
    }
}

/// Applies `descriptor` to the page.
pub fn apply<D: PageDom + ?Sized>(descriptor: &StrategyDescriptor, page: &mut D) -> ApplyOutcome {
    let url = page.location();
    if !descriptor.applies_to(&url) {
        debug!("URL {} does not match descriptor pattern, skipping", url);
        return ApplyOutcome::NotApplicable;
    }

    match &descriptor.strategy {
        Strategy::SelectMaxNumeric { selectors } => select_max_numeric(page, selectors),
        Strategy::UrlParam { param, max_value } => apply_url_param(page, param, max_value),
    }
}

/// Tries each selector in order until one resolves to a select control with
/// numeric options.
pub fn select_max_numeric<D: PageDom + ?Sized>(page: &mut D, selectors: &[String]) -> ApplyOutcome {
    for selector in selectors {
        let node = match page.query_selector(selector) {
            Ok(Some(node)) => node,
            Ok(None) => continue,
            Err(e) => {
                debug!("Skipping selector {}: {}", selector, e);
                continue;
            }
        };

        if page.tag_name(node).as_deref() != Some("select") {
            debug!("Selector {} matched a non-select element", selector);
            continue;
        }

        match select_max_option(page, node) {
            Ok(ApplyOutcome::NoMatch) => {
                debug!("Selector {} has no numeric options", selector);
            }
            Ok(outcome) => return outcome,
            Err(e) if e.is_transient_dom_error() => {
                debug!("Select {} changed during evaluation: {}", selector, e);
            }
            Err(e) => warn!("Select {} could not be updated: {}", selector, e),
        }
    }
    ApplyOutcome::NoMatch
}

/// Selects the option with the largest positive numeric value, then fires
/// `change` and `input` so page listeners re-render.
pub fn select_max_option<D: PageDom + ?Sized>(page: &mut D, select: NodeId) -> Result<ApplyOutcome> {
    let options = numeric_options(page, select);
    let Some(max) = max_option(&options) else {
        return Ok(ApplyOutcome::NoMatch);
    };

    if page.selected_index(select) == Some(max.index) {
        debug!("Already at max value: {}", max.value);
        return Ok(ApplyOutcome::AlreadyAtMax);
    }

    page.select_option(select, max.index)?;
    page.dispatch_event(select, DomEvent::Change)?;
    page.dispatch_event(select, DomEvent::Input)?;

    info!("Set page size to max value: {}", max.value);
    Ok(ApplyOutcome::Updated)
}

/// Sets `param` to `max_value` in the current URL and navigates, unless it
/// already holds that value.
pub fn apply_url_param<D: PageDom + ?Sized>(page: &mut D, param: &str, max_value: &str) -> ApplyOutcome {
    let current = page.location();
    let Some(target) = rewrite_url_param(&current, param, max_value) else {
        debug!("URL param {} already at max: {}", param, max_value);
        return ApplyOutcome::AlreadyAtMax;
    };

    let target = match target {
        Ok(url) => url,
        Err(e) => {
            debug!("Cannot rewrite URL {}: {}", current, e);
            return ApplyOutcome::NoMatch;
        }
    };

    match page.navigate(&target) {
        Ok(()) => {
            info!("Navigating with {}={}", param, max_value);
            ApplyOutcome::Navigated
        }
        Err(e) => {
            debug!("Navigation to {} failed: {}", target, e);
            ApplyOutcome::NoMatch
        }
    }
}

/// URL with `param` set to `value`, or `None` when the first occurrence of
/// `param` already equals `value`.
///
/// Like `URLSearchParams.set`, the first occurrence is replaced in place,
/// later duplicates are dropped, and a missing parameter is appended.
pub fn rewrite_url_param(url: &str, param: &str, value: &str) -> Option<Result<String>> {
    let mut url = match Url::parse(url) {
        Ok(url) => url,
        Err(e) => return Some(Err(e.into())),
    };

    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    if pairs
        .iter()
        .find(|(k, _)| k == param)
        .is_some_and(|(_, v)| v == value)
    {
        return None;
    }

    let mut replaced = false;
    let mut rewritten = Vec::with_capacity(pairs.len() + 1);
    for (k, v) in pairs {
        if k != param {
            rewritten.push((k, v));
        } else if !replaced {
            rewritten.push((k, value.to_string()));
            replaced = true;
        }
    }
    if !replaced {
        rewritten.push((param.to_string(), value.to_string()));
    }

    url.query_pairs_mut().clear().extend_pairs(rewritten);
    Some(Ok(url.to_string()))
}
