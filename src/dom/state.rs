use crate::core::{DomEvent, NodeId};
use crate::types::{ComputedStyle, ElementRect, Viewport};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

/// A synthetic event observed by the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchedEvent {
    pub node: NodeId,
    pub event: DomEvent,
}

/// Mutable page state layered over the parsed HTML tree: form state,
/// attributes written after parsing, layout, and a log of every side effect
/// the page observed.
#[derive(Debug, Clone, Default)]
pub struct DocumentState {
    pub attributes: HashMap<NodeId, BTreeMap<String, String>>,
    pub selections: HashMap<NodeId, usize>,
    /// Element boxes in page coordinates.
    pub layout: HashMap<NodeId, ElementRect>,
    pub styles: HashMap<NodeId, ComputedStyle>,
    pub detached: HashSet<NodeId>,
    pub events: Vec<DispatchedEvent>,
    pub activations: Vec<NodeId>,
    pub navigations: Vec<String>,
    pub viewport: Viewport,
    pub scroll_top: f64,
    pub scroll_height: Option<f64>,
}

impl DocumentState {
    pub fn record_event(&mut self, node: NodeId, event: DomEvent) {
        self.events.push(DispatchedEvent { node, event });
    }

    pub fn events_for(&self, node: NodeId) -> Vec<DomEvent> {
        self.events
            .iter()
            .filter(|e| e.node == node)
            .map(|e| e.event)
            .collect()
    }

    pub fn overlay_attribute(&self, node: NodeId, name: &str) -> Option<&str> {
        self.attributes
            .get(&node)
            .and_then(|attrs| attrs.get(name))
            .map(String::as_str)
    }

    /// Bottom edge of the lowest laid-out element.
    pub fn content_height(&self) -> f64 {
        self.layout
            .iter()
            .filter(|(node, _)| !self.detached.contains(node))
            .map(|(_, rect)| rect.bottom())
            .fold(0.0, f64::max)
    }

    pub fn clear_log(&mut self) {
        self.events.clear();
        self.activations.clear();
        self.navigations.clear();
    }
}
