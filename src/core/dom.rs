use crate::errors::Result;
use crate::types::{ComputedStyle, ElementRect, ScrollMetrics, Viewport};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque handle to an element of the page.
///
/// Handles stay valid for the lifetime of the page; an element that was
/// removed keeps its handle but every query on it reports it as detached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Synthetic events dispatched on page elements. All of them bubble.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DomEvent {
    Change,
    Input,
    /// A synthetic pointer click (`MouseEvent('click')`), as opposed to the
    /// element's primary activation performed by `PageDom::click`.
    Click,
}

/// Capability interface over the live page.
///
/// Everything the engine knows about a page goes through this trait: a real
/// DOM binding implements it in the host environment and
/// [`crate::dom::HtmlDocument`] implements it over parsed HTML.
pub trait PageDom {
    /// Full URL of the current document.
    fn location(&self) -> String;

    /// Hostname of the current document, empty when the URL has none.
    fn hostname(&self) -> String {
        url::Url::parse(&self.location())
            .ok()
            .and_then(|url| url.host_str().map(str::to_string))
            .unwrap_or_default()
    }

    /// Full navigation to `url`. This unloads the page.
    fn navigate(&mut self, url: &str) -> Result<()>;

    /// First element in document order matching the CSS selector.
    fn query_selector(&self, selector: &str) -> Result<Option<NodeId>>;

    /// All elements matching the CSS selector, in document order.
    fn query_selector_all(&self, selector: &str) -> Result<Vec<NodeId>>;

    /// Nearest inclusive ancestor of `node` matching the selector.
    fn closest(&self, node: NodeId, selector: &str) -> Result<Option<NodeId>>;

    /// Lowercase tag name, `None` once the element is detached.
    fn tag_name(&self, node: NodeId) -> Option<String>;

    fn attribute(&self, node: NodeId, name: &str) -> Option<String>;

    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) -> Result<()>;

    /// Concatenated text of all descendant text nodes.
    fn text_content(&self, node: NodeId) -> String;

    /// The `<option>` elements of a select control, in document order.
    fn options(&self, select: NodeId) -> Vec<NodeId>;

    /// Value of an option: its `value` attribute, or its text when absent.
    fn option_value(&self, option: NodeId) -> String {
        self.attribute(option, "value")
            .unwrap_or_else(|| self.text_content(option).trim().to_string())
    }

    fn selected_index(&self, select: NodeId) -> Option<usize>;

    /// Sets both `value` and `selectedIndex` of a select control.
    fn select_option(&mut self, select: NodeId, index: usize) -> Result<()>;

    fn dispatch_event(&mut self, node: NodeId, event: DomEvent) -> Result<()>;

    /// Primary activation (`element.click()`).
    fn click(&mut self, node: NodeId) -> Result<()>;

    /// The `disabled` state of form controls. Other elements cannot be
    /// disabled, whatever their attributes say.
    fn is_disabled(&self, node: NodeId) -> bool {
        let form_control = matches!(
            self.tag_name(node).as_deref(),
            Some("button" | "input" | "select" | "textarea" | "fieldset" | "optgroup" | "option")
        );
        form_control && self.attribute(node, "disabled").is_some()
    }

    fn bounding_rect(&self, node: NodeId) -> Option<ElementRect>;

    fn computed_style(&self, node: NodeId) -> ComputedStyle;

    fn viewport(&self) -> Viewport;

    fn scroll_metrics(&self) -> ScrollMetrics;
}
