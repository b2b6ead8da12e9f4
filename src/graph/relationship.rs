//! Directed relationship between two nodes

use super::property::{PropertyMap, PropertyValue};
use super::types::{NodeId, RelationshipId, RelationshipType};
use serde_json::{json, Value as JsonValue};

/// A directed, typed relationship in the property graph
///
/// `start` and `end` always reference nodes present in the owning store;
/// [`GraphStore`](super::GraphStore) refuses to create dangling relationships
/// and removes incident relationships when a node is deleted.
#[derive(Debug, Clone)]
pub struct Relationship {
    /// Unique identifier for this relationship
    pub id: RelationshipId,

    /// Type of relationship (e.g., "KNOWS")
    pub rel_type: RelationshipType,

    /// Node the relationship goes FROM
    pub start: NodeId,

    /// Node the relationship goes TO
    pub end: NodeId,

    /// Properties associated with this relationship
    pub properties: PropertyMap,
}

impl Relationship {
    pub fn new(
        id: RelationshipId,
        rel_type: impl Into<RelationshipType>,
        start: NodeId,
        end: NodeId,
        properties: PropertyMap,
    ) -> Self {
        Relationship {
            id,
            rel_type: rel_type.into(),
            start,
            end,
            properties,
        }
    }

    /// Get a property value
    pub fn get_property(&self, key: &str) -> Option<&PropertyValue> {
        self.properties.get(key)
    }

    pub fn property_count(&self) -> usize {
        self.properties.len()
    }

    /// Check if this relationship goes FROM a specific node
    pub fn starts_from(&self, node: NodeId) -> bool {
        self.start == node
    }

    /// Check if this relationship goes TO a specific node
    pub fn ends_at(&self, node: NodeId) -> bool {
        self.end == node
    }

    /// Check if either endpoint is `node`
    pub fn touches(&self, node: NodeId) -> bool {
        self.start == node || self.end == node
    }

    /// Full structured representation used in query results:
    /// `{"id", "type", "start", "end", "properties"}`.
    pub fn to_json(&self) -> JsonValue {
        let properties: serde_json::Map<String, JsonValue> = self
            .properties
            .iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect();
        json!({
            "id": self.id.as_u64(),
            "type": self.rel_type.as_str(),
            "start": self.start.as_u64(),
            "end": self.end.as_u64(),
            "properties": properties,
        })
    }
}

impl PartialEq for Relationship {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Relationship {}

impl std::hash::Hash for Relationship {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relationship_direction() {
        let rel = Relationship::new(
            RelationshipId::new(2),
            "FOLLOWS",
            NodeId::new(10),
            NodeId::new(20),
            PropertyMap::new(),
        );

        assert!(rel.starts_from(NodeId::new(10)));
        assert!(rel.ends_at(NodeId::new(20)));
        assert!(!rel.starts_from(NodeId::new(20)));
        assert!(!rel.ends_at(NodeId::new(10)));
        assert!(rel.touches(NodeId::new(20)));
        assert!(!rel.touches(NodeId::new(30)));
    }

    #[test]
    fn test_relationship_properties() {
        let mut props = PropertyMap::new();
        props.insert("since".to_string(), 2020i64.into());
        let rel = Relationship::new(
            RelationshipId::new(3),
            "KNOWS",
            NodeId::new(1),
            NodeId::new(2),
            props,
        );

        assert_eq!(rel.get_property("since").unwrap().as_integer(), Some(2020));
        assert_eq!(rel.property_count(), 1);
    }

    #[test]
    fn test_to_json() {
        let rel = Relationship::new(
            RelationshipId::new(4),
            "KNOWS",
            NodeId::new(1),
            NodeId::new(2),
            PropertyMap::new(),
        );
        assert_eq!(
            rel.to_json(),
            json!({"id": 4, "type": "KNOWS", "start": 1, "end": 2, "properties": {}})
        );
    }

    #[test]
    fn test_parallel_relationships_are_distinct() {
        let a = Relationship::new(RelationshipId::new(1), "KNOWS", NodeId::new(1), NodeId::new(2), PropertyMap::new());
        let b = Relationship::new(RelationshipId::new(2), "KNOWS", NodeId::new(1), NodeId::new(2), PropertyMap::new());
        assert_ne!(a, b);
    }
}
