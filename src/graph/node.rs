//! Node implementation for the property graph

use super::property::{PropertyMap, PropertyValue};
use super::types::{Label, NodeId};
use serde_json::{json, Value as JsonValue};
use std::collections::BTreeSet;

/// A node in the property graph
///
/// Nodes have:
/// - A store-scoped unique ID
/// - A set of labels (order irrelevant, duplicates collapsed)
/// - Properties (key-value pairs)
#[derive(Debug, Clone)]
pub struct Node {
    /// Unique identifier for this node
    pub id: NodeId,

    /// Set of labels for this node
    pub labels: BTreeSet<Label>,

    /// Properties associated with this node
    pub properties: PropertyMap,
}

impl Node {
    /// Create a new node with labels and properties
    pub fn new(
        id: NodeId,
        labels: impl IntoIterator<Item = Label>,
        properties: PropertyMap,
    ) -> Self {
        Node {
            id,
            labels: labels.into_iter().collect(),
            properties,
        }
    }

    /// Check if node has a specific label
    pub fn has_label(&self, label: &Label) -> bool {
        self.labels.contains(label)
    }

    /// Get a property value
    pub fn get_property(&self, key: &str) -> Option<&PropertyValue> {
        self.properties.get(key)
    }

    /// Replace the whole property map, returning the previous one
    pub fn replace_properties(&mut self, properties: PropertyMap) -> PropertyMap {
        std::mem::replace(&mut self.properties, properties)
    }

    pub fn property_count(&self) -> usize {
        self.properties.len()
    }

    pub fn label_count(&self) -> usize {
        self.labels.len()
    }

    /// Full structured representation used in query results:
    /// `{"id", "labels", "properties"}` with labels sorted.
    pub fn to_json(&self) -> JsonValue {
        let properties: serde_json::Map<String, JsonValue> = self
            .properties
            .iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect();
        json!({
            "id": self.id.as_u64(),
            "labels": self.labels.iter().map(Label::as_str).collect::<Vec<_>>(),
            "properties": properties,
        })
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Node {}

impl std::hash::Hash for Node {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}
