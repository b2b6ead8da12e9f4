//! Property graph data model
//!
//! - Nodes with a set of labels and properties
//! - Directed, typed relationships with properties
//! - Multiple relationships between the same pair of nodes
//! - In-memory storage with label and adjacency indices

pub mod node;
pub mod property;
pub mod relationship;
pub mod store;
pub mod types;

// Re-export main types
pub use node::Node;
pub use property::{PropertyMap, PropertyValue};
pub use relationship::Relationship;
pub use store::{GraphError, GraphResult, GraphStore};
pub use types::{Label, NodeId, RelationshipId, RelationshipType};
