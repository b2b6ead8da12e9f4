//! Variable bindings produced by pattern matching
//!
//! A [`Bindings`] maps variable names to snapshots of the matched entities.
//! It is a persistent map: [`Bindings::bind`] returns a new context and
//! leaves the original untouched, so sibling search branches never observe
//! each other's assignments.

use crate::graph::{Node, NodeId, PropertyValue, Relationship, RelationshipId};
use im::OrdMap;
use serde_json::Value as JsonValue;

/// A matched node or relationship
#[derive(Debug, Clone)]
pub enum Entity {
    Node(Node),
    Relationship(Relationship),
}

/// Identity of an [`Entity`], used for join keys and rebinding checks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityRef {
    Node(NodeId),
    Relationship(RelationshipId),
}

impl Entity {
    pub fn identity(&self) -> EntityRef {
        match self {
            Entity::Node(node) => EntityRef::Node(node.id),
            Entity::Relationship(rel) => EntityRef::Relationship(rel.id),
        }
    }

    pub fn get_property(&self, key: &str) -> Option<&PropertyValue> {
        match self {
            Entity::Node(node) => node.get_property(key),
            Entity::Relationship(rel) => rel.get_property(key),
        }
    }

    pub fn as_node(&self) -> Option<&Node> {
        match self {
            Entity::Node(node) => Some(node),
            _ => None,
        }
    }

    pub fn as_relationship(&self) -> Option<&Relationship> {
        match self {
            Entity::Relationship(rel) => Some(rel),
            _ => None,
        }
    }

    pub fn to_json(&self) -> JsonValue {
        match self {
            Entity::Node(node) => node.to_json(),
            Entity::Relationship(rel) => rel.to_json(),
        }
    }
}

// Same entity == same identity, whatever the snapshot holds
impl PartialEq for Entity {
    fn eq(&self, other: &Self) -> bool {
        self.identity() == other.identity()
    }
}

impl Eq for Entity {}

impl From<Node> for Entity {
    fn from(node: Node) -> Self {
        Entity::Node(node)
    }
}

impl From<Relationship> for Entity {
    fn from(rel: Relationship) -> Self {
        Entity::Relationship(rel)
    }
}

/// One candidate solution: variable name -> entity
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bindings {
    entries: OrdMap<String, Entity>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, variable: &str) -> Option<&Entity> {
        self.entries.get(variable)
    }

    pub fn contains(&self, variable: &str) -> bool {
        self.entries.contains_key(variable)
    }

    /// New context with `variable` bound to `entity`
    pub fn bind(&self, variable: impl Into<String>, entity: impl Into<Entity>) -> Bindings {
        Bindings {
            entries: self.entries.update(variable.into(), entity.into()),
        }
    }

    /// True when every variable bound in both contexts names the same entity
    pub fn agrees_with(&self, other: &Bindings) -> bool {
        other.entries.iter().all(|(var, entity)| {
            self.entries
                .get(var)
                .map_or(true, |mine| mine.identity() == entity.identity())
        })
    }

    /// Union of two agreeing contexts
    pub fn merged(&self, other: &Bindings) -> Bindings {
        Bindings {
            entries: self.entries.clone().union(other.entries.clone()),
        }
    }

    /// Identities of `variables` in order, or None if any is unbound
    pub fn key_for(&self, variables: &[&str]) -> Option<Vec<EntityRef>> {
        variables
            .iter()
            .map(|var| self.entries.get(*var).map(Entity::identity))
            .collect()
    }

    /// Bound variable names in sorted order
    pub fn variables(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Entity)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `{variable: entity}` object
    pub fn to_json(&self) -> JsonValue {
        JsonValue::Object(
            self.entries
                .iter()
                .map(|(var, entity)| (var.clone(), entity.to_json()))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Label, PropertyMap};

    fn node(id: u64, name: &str) -> Node {
        let mut props = PropertyMap::new();
        props.insert("name".to_string(), name.into());
        Node::new(NodeId::new(id), vec![Label::new("Person")], props)
    }

    #[test]
    fn test_bind_is_copy_on_write() {
        let empty = Bindings::new();
        let with_a = empty.bind("a", node(1, "Alice"));
        let with_b = with_a.bind("b", node(2, "Bob"));

        assert!(empty.is_empty());
        assert_eq!(with_a.len(), 1);
        assert!(!with_a.contains("b"));
        assert_eq!(with_b.len(), 2);
        assert_eq!(with_b.get("a").unwrap().identity(), EntityRef::Node(NodeId::new(1)));
    }

    #[test]
    fn test_agreement_is_by_identity() {
        let left = Bindings::new().bind("a", node(1, "Alice"));
        let same_id = Bindings::new().bind("a", node(1, "Renamed"));
        let twin = Bindings::new().bind("a", node(2, "Alice"));
        let disjoint = Bindings::new().bind("z", node(9, "Zed"));

        assert!(left.agrees_with(&same_id));
        assert!(!left.agrees_with(&twin));
        assert!(left.agrees_with(&disjoint));
    }

    #[test]
    fn test_merged_and_key() {
        let left = Bindings::new().bind("a", node(1, "Alice")).bind("b", node(2, "Bob"));
        let right = Bindings::new().bind("b", node(2, "Bob")).bind("c", node(3, "Carol"));
        let merged = left.merged(&right);

        assert_eq!(merged.variables().collect::<Vec<_>>(), vec!["a", "b", "c"]);
        assert_eq!(
            merged.key_for(&["c", "a"]),
            Some(vec![EntityRef::Node(NodeId::new(3)), EntityRef::Node(NodeId::new(1))])
        );
        assert_eq!(left.key_for(&["c"]), None);
    }

    #[test]
    fn test_to_json() {
        let bindings = Bindings::new().bind("p", node(4, "Dan"));
        assert_eq!(
            bindings.to_json(),
            serde_json::json!({"p": {"id": 4, "labels": ["Person"], "properties": {"name": "Dan"}}})
        );
    }
}
