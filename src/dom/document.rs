use crate::core::{DomEvent, NodeId, PageDom};
use crate::dom::state::{DispatchedEvent, DocumentState};
use crate::errors::{PageSizeError, Result};
use crate::types::{ComputedStyle, ElementRect, ScrollMetrics, Viewport};
use ego_tree::{NodeRef, Tree};
use scraper::{ElementRef, Html, Node, Selector};
use std::collections::HashMap;
use tracing::debug;
use url::Url;

/// In-memory page built from HTML.
///
/// Structure and selector matching come from the parsed tree; everything a
/// script could change (selection, attributes written later, layout, scroll
/// position) lives in a [`DocumentState`] overlay. Attributes written through
/// `set_attribute` are readable but not visible to selector matching.
pub struct HtmlDocument {
    url: Url,
    html: Html,
    handles: Vec<ego_tree::NodeId>,
    index: HashMap<ego_tree::NodeId, NodeId>,
    state: DocumentState,
}

impl HtmlDocument {
    pub fn parse(url: &str, html: &str) -> Result<Self> {
        let url = Url::parse(url)?;
        let html = Html::parse_document(html);

        let mut document = Self {
            url,
            html,
            handles: Vec::new(),
            index: HashMap::new(),
            state: DocumentState::default(),
        };

        let root = document.html.tree.root().id();
        document.register_subtree(root);
        debug!(
            "Parsed document {} with {} elements",
            document.url,
            document.handles.len()
        );
        Ok(document)
    }

    pub fn state(&self) -> &DocumentState {
        &self.state
    }

    /// First element matching `selector`, ignoring invalid selectors.
    pub fn find(&self, selector: &str) -> Option<NodeId> {
        self.query_selector(selector).ok().flatten()
    }

    pub fn find_all(&self, selector: &str) -> Vec<NodeId> {
        self.query_selector_all(selector).unwrap_or_default()
    }

    pub fn events(&self) -> &[DispatchedEvent] {
        &self.state.events
    }

    pub fn activations(&self) -> &[NodeId] {
        &self.state.activations
    }

    pub fn navigations(&self) -> &[String] {
        &self.state.navigations
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.state.viewport = viewport;
    }

    /// Lays out `node` at the given page coordinates.
    pub fn set_rect(&mut self, node: NodeId, rect: ElementRect) {
        self.state.layout.insert(node, rect);
    }

    pub fn set_style(&mut self, node: NodeId, style: ComputedStyle) {
        self.state.styles.insert(node, style);
    }

    pub fn set_scroll_height(&mut self, height: f64) {
        self.state.scroll_height = Some(height);
    }

    pub fn scroll_to(&mut self, top: f64) {
        let metrics = self.scroll_metrics();
        let max_top = (metrics.scroll_height - metrics.client_height).max(0.0);
        self.state.scroll_top = top.clamp(0.0, max_top);
    }

    /// Parses `html` as a fragment and appends its elements to `parent`.
    /// Returns the handles of the appended top-level elements.
    pub fn append_html(&mut self, parent: NodeId, html: &str) -> Result<Vec<NodeId>> {
        let parent_id = self.tree_id(parent)?;
        let fragment = Html::parse_fragment(html);

        let mut appended = Vec::new();
        for child in fragment.root_element().children() {
            if let Some(id) = graft(&mut self.html.tree, parent_id, child) {
                self.register_subtree(id);
                if let Some(node) = self.index.get(&id) {
                    appended.push(*node);
                }
            }
        }
        Ok(appended)
    }

    /// Removes `node` and its subtree from the document. Existing handles
    /// report as detached from then on.
    pub fn remove(&mut self, node: NodeId) -> Result<()> {
        let id = self.tree_id(node)?;
        let removed: Vec<NodeId> = match self.html.tree.get(id) {
            Some(subtree) => subtree
                .descendants()
                .filter_map(|n| self.index.get(&n.id()).copied())
                .collect(),
            None => Vec::new(),
        };
        if let Some(mut tree_node) = self.html.tree.get_mut(id) {
            tree_node.detach();
        }
        self.state.detached.extend(removed);
        Ok(())
    }

    fn register_subtree(&mut self, id: ego_tree::NodeId) {
        let Some(subtree) = self.html.tree.get(id) else {
            return;
        };
        let new_elements: Vec<ego_tree::NodeId> = subtree
            .descendants()
            .filter(|n| n.value().is_element())
            .map(|n| n.id())
            .collect();

        for tree_id in new_elements {
            if self.index.contains_key(&tree_id) {
                continue;
            }
            let node = NodeId(self.handles.len());
            self.handles.push(tree_id);
            self.index.insert(tree_id, node);
        }
    }

    fn tree_id(&self, node: NodeId) -> Result<ego_tree::NodeId> {
        if self.state.detached.contains(&node) {
            return Err(PageSizeError::ElementDetached(node));
        }
        self.handles
            .get(node.0)
            .copied()
            .ok_or(PageSizeError::ElementDetached(node))
    }

    fn element(&self, node: NodeId) -> Option<ElementRef<'_>> {
        let id = self.tree_id(node).ok()?;
        self.html.tree.get(id).and_then(ElementRef::wrap)
    }

    fn attached_element(&self, node: NodeId) -> Result<ElementRef<'_>> {
        self.element(node)
            .ok_or(PageSizeError::ElementDetached(node))
    }

    fn handle(&self, element: ElementRef<'_>) -> Option<NodeId> {
        self.index
            .get(&element.id())
            .copied()
            .filter(|node| !self.state.detached.contains(node))
    }

    fn compile(selector: &str) -> Result<Selector> {
        Selector::parse(selector)
            .map_err(|e| PageSizeError::InvalidSelector(format!("{}: {:?}", selector, e)))
    }

    fn inline_style(&self, node: NodeId) -> ComputedStyle {
        let mut style = ComputedStyle::default();
        if self.attribute(node, "hidden").is_some() {
            style.display = "none".to_string();
        }
        let Some(inline) = self.attribute(node, "style") else {
            return style;
        };
        for declaration in inline.split(';') {
            let Some((property, value)) = declaration.split_once(':') else {
                continue;
            };
            let value = value.trim().to_ascii_lowercase();
            match property.trim().to_ascii_lowercase().as_str() {
                "display" => style.display = value,
                "visibility" => style.visibility = value,
                "opacity" => {
                    if let Ok(opacity) = value.parse::<f64>() {
                        style.opacity = opacity;
                    }
                }
                _ => {}
            }
        }
        style
    }
}

fn graft(
    tree: &mut Tree<Node>,
    parent: ego_tree::NodeId,
    source: NodeRef<'_, Node>,
) -> Option<ego_tree::NodeId> {
    let mut parent_node = tree.get_mut(parent)?;
    let id = parent_node.append(source.value().clone()).id();
    for child in source.children() {
        graft(tree, id, child);
    }
    Some(id)
}

impl PageDom for HtmlDocument {
    fn location(&self) -> String {
        self.url.to_string()
    }

    fn navigate(&mut self, url: &str) -> Result<()> {
        let target = self
            .url
            .join(url)
            .map_err(|e| PageSizeError::NavigationFailed(format!("{}: {}", url, e)))?;
        debug!("Navigating to {}", target);
        self.state.navigations.push(target.to_string());
        self.url = target;
        Ok(())
    }

    fn query_selector(&self, selector: &str) -> Result<Option<NodeId>> {
        Ok(self.query_selector_all(selector)?.into_iter().next())
    }

    fn query_selector_all(&self, selector: &str) -> Result<Vec<NodeId>> {
        let selector = Self::compile(selector)?;
        let root = self.html.root_element();

        let mut found = Vec::new();
        if selector.matches(&root) {
            found.extend(self.handle(root));
        }
        found.extend(root.select(&selector).filter_map(|el| self.handle(el)));
        Ok(found)
    }

    fn closest(&self, node: NodeId, selector: &str) -> Result<Option<NodeId>> {
        let selector = Self::compile(selector)?;
        let element = self.attached_element(node)?;
        if selector.matches(&element) {
            return Ok(Some(node));
        }
        Ok(element
            .ancestors()
            .filter_map(ElementRef::wrap)
            .find(|ancestor| selector.matches(ancestor))
            .and_then(|ancestor| self.handle(ancestor)))
    }

    fn tag_name(&self, node: NodeId) -> Option<String> {
        self.element(node)
            .map(|el| el.value().name().to_ascii_lowercase())
    }

    fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
        let element = self.element(node)?;
        self.state
            .overlay_attribute(node, name)
            .or_else(|| element.value().attr(name))
            .map(str::to_string)
    }

    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) -> Result<()> {
        self.attached_element(node)?;
        self.state
            .attributes
            .entry(node)
            .or_default()
            .insert(name.to_string(), value.to_string());
        Ok(())
    }

    fn text_content(&self, node: NodeId) -> String {
        self.element(node)
            .map(|el| el.text().collect::<String>())
            .unwrap_or_default()
    }

    fn options(&self, select: NodeId) -> Vec<NodeId> {
        let Some(element) = self.element(select) else {
            return Vec::new();
        };
        if element.value().name() != "select" {
            return Vec::new();
        }
        let Ok(option) = Self::compile("option") else {
            return Vec::new();
        };
        element
            .select(&option)
            .filter_map(|el| self.handle(el))
            .collect()
    }

    fn selected_index(&self, select: NodeId) -> Option<usize> {
        let options = self.options(select);
        if options.is_empty() {
            return None;
        }
        if let Some(index) = self.state.selections.get(&select) {
            return Some(*index);
        }
        let preselected = options
            .iter()
            .position(|option| self.attribute(*option, "selected").is_some());
        Some(preselected.unwrap_or(0))
    }

    fn select_option(&mut self, select: NodeId, index: usize) -> Result<()> {
        let element = self.attached_element(select)?;
        if element.value().name() != "select" {
            return Err(PageSizeError::NotASelect(select));
        }
        if index >= self.options(select).len() {
            return Err(PageSizeError::OptionOutOfRange { select, index });
        }
        self.state.selections.insert(select, index);
        Ok(())
    }

    fn dispatch_event(&mut self, node: NodeId, event: DomEvent) -> Result<()> {
        self.attached_element(node)?;
        self.state.record_event(node, event);
        Ok(())
    }

    fn click(&mut self, node: NodeId) -> Result<()> {
        self.attached_element(node)?;
        self.state.activations.push(node);
        Ok(())
    }

    fn bounding_rect(&self, node: NodeId) -> Option<ElementRect> {
        self.element(node)?;
        self.state
            .layout
            .get(&node)
            .map(|rect| rect.translated(0.0, -self.state.scroll_top))
    }

    fn computed_style(&self, node: NodeId) -> ComputedStyle {
        self.state
            .styles
            .get(&node)
            .cloned()
            .unwrap_or_else(|| self.inline_style(node))
    }

    fn viewport(&self) -> Viewport {
        self.state.viewport
    }

    fn scroll_metrics(&self) -> ScrollMetrics {
        let client_height = self.state.viewport.height;
        let scroll_height = self
            .state
            .scroll_height
            .unwrap_or_else(|| self.state.content_height())
            .max(client_height);
        ScrollMetrics {
            scroll_top: self.state.scroll_top,
            scroll_height,
            client_height,
        }
    }
}
