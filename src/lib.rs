//! Coffy Graph
//!
//! An embedded property graph database with a small Cypher subset.
//!
//! # Architecture
//!
//! - [`graph`]: nodes, relationships and the in-memory [`GraphStore`]
//! - [`persistence`]: JSON files per named database and the
//!   [`GraphDatabase`] registry with its current selector
//! - [`query`]: Pest parser for `CREATE`, `MATCH [WHERE]`,
//!   `RETURN [DISTINCT]` and `DELETE`, and the backtracking
//!   [`CypherExecutor`]
//!
//! Everything runs synchronously on the caller's thread. Share a database
//! across threads by wrapping it in a lock.
//!
//! ## Example Usage
//!
//! ```rust
//! use coffy_graph::{GraphDatabase, StatementOutcome};
//!
//! let mut db = GraphDatabase::in_memory();
//! let mut executor = db.executor();
//!
//! executor
//!     .execute(r#"CREATE (a:Person {name: "Alice"})-[:KNOWS]->(b:Person {name: "Bob"})"#)
//!     .unwrap();
//!
//! let outcomes = executor
//!     .execute("MATCH (a:Person)-[:KNOWS]->(b:Person) RETURN a, b")
//!     .unwrap();
//! let rows = outcomes[1].as_returned().unwrap();
//! assert_eq!(rows.len(), 1);
//! assert_eq!(rows[0]["b"]["properties"]["name"], "Bob");
//! assert!(matches!(outcomes[0], StatementOutcome::Matched(_)));
//! ```

#![allow(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod graph;
pub mod persistence;
pub mod query;

// Re-export main types for convenience
pub use config::DatabaseConfig;

pub use graph::{
    GraphError, GraphResult, GraphStore, Label, Node, NodeId, PropertyMap, PropertyValue,
    Relationship, RelationshipId, RelationshipType,
};

pub use persistence::{GraphDatabase, JsonStorage, PersistenceError, PersistenceResult};

pub use query::{
    parse_query, Bindings, CypherExecutor, Entity, ExecutionError, ExecutionResult, ParseError,
    ParseResult, ReturnRow, Statement, StatementOutcome,
};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get version string
pub fn version() -> &'static str {
    VERSION
}
