use crate::core::{NodeId, PageDom};
use crate::types::ElementRect;
use std::collections::HashSet;

/// Reports elements entering the viewport extended by a margin.
///
/// Edge-triggered: an element is reported once when it starts intersecting
/// and again only after it has left the area.
#[derive(Debug, Clone)]
pub struct ProximityObserver {
    root_margin: f64,
    observed: Vec<NodeId>,
    intersecting: HashSet<NodeId>,
}

impl ProximityObserver {
    pub fn new(root_margin: f64) -> Self {
        Self {
            root_margin,
            observed: Vec::new(),
            intersecting: HashSet::new(),
        }
    }

    /// Starts watching `node`. Returns false if it was already watched.
    pub fn observe(&mut self, node: NodeId) -> bool {
        if self.observed.contains(&node) {
            return false;
        }
        self.observed.push(node);
        true
    }

    pub fn is_observing(&self, node: NodeId) -> bool {
        self.observed.contains(&node)
    }

    pub fn observed(&self) -> &[NodeId] {
        &self.observed
    }

    pub fn disconnect(&mut self) {
        self.observed.clear();
        self.intersecting.clear();
    }

    /// Elements that started intersecting since the last call, in the order
    /// they were observed. Detached elements are dropped.
    pub fn take_records<D: PageDom + ?Sized>(&mut self, page: &D) -> Vec<NodeId> {
        self.observed.retain(|node| page.tag_name(*node).is_some());
        self.intersecting.retain(|node| page.tag_name(*node).is_some());

        let mut entered = Vec::new();
        for node in &self.observed {
            let now = page
                .bounding_rect(*node)
                .is_some_and(|rect| self.within_margin(page, &rect));
            if now {
                if self.intersecting.insert(*node) {
                    entered.push(*node);
                }
            } else {
                self.intersecting.remove(node);
            }
        }
        entered
    }

    fn within_margin<D: PageDom + ?Sized>(&self, page: &D, rect: &ElementRect) -> bool {
        if rect.is_empty() {
            return false;
        }
        let viewport = page.viewport();
        let margin = self.root_margin;
        rect.top() < viewport.height + margin
            && rect.bottom() > -margin
            && rect.left() < viewport.width + margin
            && rect.right() > -margin
    }
}
