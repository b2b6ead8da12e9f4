//! In-memory entity store for a single database
//!
//! Owns every [`Node`] and [`Relationship`], allocates identifiers and keeps
//! the secondary indices the pattern matcher reads from.

use super::node::Node;
use super::property::PropertyMap;
use super::relationship::Relationship;
use super::types::{Label, NodeId, RelationshipId, RelationshipType};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use thiserror::Error;
use tracing::debug;

/// Errors that can occur during graph operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphError {
    #[error("Node {0} not found")]
    NodeNotFound(NodeId),

    #[error("Relationship {0} not found")]
    RelationshipNotFound(RelationshipId),

    #[error("Dangling reference: start node {0} does not exist")]
    DanglingStart(NodeId),

    #[error("Dangling reference: end node {0} does not exist")]
    DanglingEnd(NodeId),
}

impl GraphError {
    /// True for relationship creation naming a missing endpoint
    pub fn is_dangling_reference(&self) -> bool {
        matches!(self, GraphError::DanglingStart(_) | GraphError::DanglingEnd(_))
    }
}

pub type GraphResult<T> = Result<T, GraphError>;

/// In-memory graph storage
///
/// - nodes: NodeId -> Node (ordered by id)
/// - relationships: RelationshipId -> Relationship (ordered by id)
/// - outgoing / incoming: NodeId -> relationship ids (adjacency)
/// - label_index: Label -> node ids
///
/// Every index iterates in ascending id order, so a lookup through an index
/// yields the same sequence as filtering a full scan.
///
/// Identifiers are never reused: `next_*_id` only grows, and after recovery
/// it is seeded past the largest recovered id.
#[derive(Debug)]
pub struct GraphStore {
    nodes: BTreeMap<NodeId, Node>,

    relationships: BTreeMap<RelationshipId, Relationship>,

    outgoing: HashMap<NodeId, BTreeSet<RelationshipId>>,

    incoming: HashMap<NodeId, BTreeSet<RelationshipId>>,

    label_index: HashMap<Label, BTreeSet<NodeId>>,

    next_node_id: NodeId,

    next_relationship_id: RelationshipId,
}

impl GraphStore {
    /// Create a new empty graph store
    pub fn new() -> Self {
        GraphStore {
            nodes: BTreeMap::new(),
            relationships: BTreeMap::new(),
            outgoing: HashMap::new(),
            incoming: HashMap::new(),
            label_index: HashMap::new(),
            next_node_id: NodeId::FIRST,
            next_relationship_id: RelationshipId::FIRST,
        }
    }

    /// Create a node with labels and properties, returning its new id
    pub fn add_node(&mut self, labels: Vec<Label>, properties: PropertyMap) -> NodeId {
        let node_id = self.next_node_id;
        self.next_node_id = node_id.successor();

        let node = Node::new(node_id, labels, properties);
        self.index_node(&node);
        debug!(id = node_id.as_u64(), labels = node.label_count(), "node created");
        self.nodes.insert(node_id, node);
        node_id
    }

    /// Create a relationship between two existing nodes
    ///
    /// Fails with a dangling-reference error, leaving the store unchanged,
    /// when either endpoint is absent.
    pub fn add_relationship(
        &mut self,
        rel_type: impl Into<RelationshipType>,
        start: NodeId,
        end: NodeId,
        properties: PropertyMap,
    ) -> GraphResult<RelationshipId> {
        if !self.has_node(start) {
            return Err(GraphError::DanglingStart(start));
        }
        if !self.has_node(end) {
            return Err(GraphError::DanglingEnd(end));
        }

        let rel_id = self.next_relationship_id;
        self.next_relationship_id = rel_id.successor();

        let relationship = Relationship::new(rel_id, rel_type, start, end, properties);
        debug!(
            id = rel_id.as_u64(),
            rel_type = relationship.rel_type.as_str(),
            start = start.as_u64(),
            end = end.as_u64(),
            "relationship created"
        );
        self.link(&relationship);
        self.relationships.insert(rel_id, relationship);
        Ok(rel_id)
    }

    /// Get a node by ID
    pub fn get_node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    /// Get a relationship by ID
    pub fn get_relationship(&self, id: RelationshipId) -> Option<&Relationship> {
        self.relationships.get(&id)
    }

    /// Check if a node exists
    pub fn has_node(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Check if a relationship exists
    pub fn has_relationship(&self, id: RelationshipId) -> bool {
        self.relationships.contains_key(&id)
    }

    /// Get all nodes in id order
    pub fn all_nodes(&self) -> Vec<&Node> {
        self.nodes.values().collect()
    }

    /// Get all relationships in id order
    pub fn all_relationships(&self) -> Vec<&Relationship> {
        self.relationships.values().collect()
    }

    /// Replace a node's property map, returning the previous one
    pub fn set_node_properties(
        &mut self,
        id: NodeId,
        properties: PropertyMap,
    ) -> GraphResult<PropertyMap> {
        let node = self.nodes.get_mut(&id).ok_or(GraphError::NodeNotFound(id))?;
        Ok(node.replace_properties(properties))
    }

    /// Delete a node and every relationship starting or ending at it
    ///
    /// Incident relationships are removed before the node itself. Deleting
    /// an absent id is a no-op returning `None`.
    pub fn delete_node(&mut self, id: NodeId) -> Option<Node> {
        if !self.has_node(id) {
            return None;
        }

        let mut incident: BTreeSet<RelationshipId> =
            self.outgoing.remove(&id).unwrap_or_default();
        incident.extend(self.incoming.remove(&id).unwrap_or_default());
        for rel_id in &incident {
            self.delete_relationship(*rel_id);
        }

        let node = self.nodes.remove(&id)?;
        for label in &node.labels {
            if let Some(node_set) = self.label_index.get_mut(label) {
                node_set.remove(&id);
                if node_set.is_empty() {
                    self.label_index.remove(label);
                }
            }
        }
        debug!(id = id.as_u64(), cascaded = incident.len(), "node deleted");
        Some(node)
    }

    /// Delete a single relationship; endpoints are untouched.
    ///
    /// Deleting an absent id is a no-op returning `None`.
    pub fn delete_relationship(&mut self, id: RelationshipId) -> Option<Relationship> {
        let relationship = self.relationships.remove(&id)?;

        if let Some(adj) = self.outgoing.get_mut(&relationship.start) {
            adj.remove(&id);
        }
        if let Some(adj) = self.incoming.get_mut(&relationship.end) {
            adj.remove(&id);
        }
        debug!(id = id.as_u64(), "relationship deleted");
        Some(relationship)
    }

    /// Get all relationships starting at a node, in id order
    pub fn outgoing(&self, node_id: NodeId) -> Vec<&Relationship> {
        self.outgoing
            .get(&node_id)
            .map(|ids| ids.iter().filter_map(|id| self.relationships.get(id)).collect())
            .unwrap_or_default()
    }

    /// Get all relationships ending at a node, in id order
    pub fn incoming(&self, node_id: NodeId) -> Vec<&Relationship> {
        self.incoming
            .get(&node_id)
            .map(|ids| ids.iter().filter_map(|id| self.relationships.get(id)).collect())
            .unwrap_or_default()
    }

    /// Get all nodes carrying a label, in id order
    pub fn nodes_by_label(&self, label: &Label) -> Vec<&Node> {
        self.label_index
            .get(label)
            .map(|ids| ids.iter().filter_map(|id| self.nodes.get(id)).collect())
            .unwrap_or_default()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn relationship_count(&self) -> usize {
        self.relationships.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.relationships.is_empty()
    }

    /// Id the next created node will receive
    pub fn next_node_id(&self) -> NodeId {
        self.next_node_id
    }

    /// Id the next created relationship will receive
    pub fn next_relationship_id(&self) -> RelationshipId {
        self.next_relationship_id
    }

    // ============================================================
    // Recovery methods - used to rebuild a store from persisted data
    // ============================================================

    /// Insert a recovered node, preserving its ID
    pub fn insert_recovered_node(&mut self, node: Node) {
        let node_id = node.id;
        self.index_node(&node);
        self.nodes.insert(node_id, node);

        self.next_node_id = self.next_node_id.max(node_id.successor());
    }

    /// Insert a recovered relationship, preserving its ID
    ///
    /// Both endpoints must already have been recovered.
    pub fn insert_recovered_relationship(&mut self, relationship: Relationship) -> GraphResult<()> {
        if !self.has_node(relationship.start) {
            return Err(GraphError::DanglingStart(relationship.start));
        }
        if !self.has_node(relationship.end) {
            return Err(GraphError::DanglingEnd(relationship.end));
        }

        let rel_id = relationship.id;
        self.link(&relationship);
        self.relationships.insert(rel_id, relationship);

        self.next_relationship_id = self.next_relationship_id.max(rel_id.successor());
        Ok(())
    }

    /// Raise the id counters to at least the given values
    ///
    /// Restores counters saved alongside the records, so ids of entities
    /// deleted before the save are not handed out again. Counters never
    /// move backwards.
    pub fn reserve_ids(&mut self, next_node: NodeId, next_relationship: RelationshipId) {
        self.next_node_id = self.next_node_id.max(next_node);
        self.next_relationship_id = self.next_relationship_id.max(next_relationship);
    }

    fn index_node(&mut self, node: &Node) {
        for label in &node.labels {
            self.label_index
                .entry(label.clone())
                .or_default()
                .insert(node.id);
        }
    }

    fn link(&mut self, relationship: &Relationship) {
        self.outgoing
            .entry(relationship.start)
            .or_default()
            .insert(relationship.id);
        self.incoming
            .entry(relationship.end)
            .or_default()
            .insert(relationship.id);
    }
}

impl Default for GraphStore {
    fn default() -> Self {
        Self::new()
    }
}
