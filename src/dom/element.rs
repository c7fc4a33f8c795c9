use crate::core::{NodeId, PageDom};
use crate::types::ElementRect;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const SNAPSHOT_ATTRIBUTES: [&str; 7] = [
    "name",
    "aria-label",
    "aria-disabled",
    "title",
    "href",
    "role",
    "type",
];

/// Serializable view of a page element, for reports and diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomElement {
    pub node: NodeId,
    pub tag_name: String,
    pub element_id: Option<String>,
    pub class_name: Option<String>,
    pub text_content: Option<String>,
    pub attributes: BTreeMap<String, String>,
    pub rect: Option<ElementRect>,
}

impl DomElement {
    /// Captures `node`, or `None` if it is no longer attached.
    pub fn capture<D: PageDom + ?Sized>(page: &D, node: NodeId) -> Option<Self> {
        let tag_name = page.tag_name(node)?;

        let attributes = SNAPSHOT_ATTRIBUTES
            .iter()
            .filter_map(|name| page.attribute(node, name).map(|v| (name.to_string(), v)))
            .collect();

        let text = page
            .text_content(node)
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");

        Some(Self {
            node,
            tag_name,
            element_id: page.attribute(node, "id"),
            class_name: page.attribute(node, "class"),
            text_content: (!text.is_empty()).then_some(text),
            attributes,
            rect: page.bounding_rect(node),
        })
    }

    /// Short CSS-like description, e.g. `button#more.btn.primary`.
    pub fn describe(&self) -> String {
        let mut label = self.tag_name.clone();
        if let Some(id) = &self.element_id {
            label.push('#');
            label.push_str(id);
        }
        if let Some(classes) = &self.class_name {
            for class in classes.split_whitespace() {
                label.push('.');
                label.push_str(class);
            }
        }
        label
    }
}
