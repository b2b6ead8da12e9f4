//! Persistence layer
//!
//! - [`JsonStorage`]: per-database JSON files written with an atomic
//!   write-then-rename
//! - [`GraphDatabase`]: named in-memory stores with a current selector,
//!   loaded from storage on first use

pub mod databases;
pub mod storage;

pub use databases::GraphDatabase;
pub use storage::{validate_database_name, JsonStorage, FORMAT_VERSION};

use crate::graph::GraphError;
use thiserror::Error;

/// Errors raised while reading or writing persisted state
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Unsupported format version {found} (supported up to {supported})")]
    UnsupportedVersion { found: u32, supported: u32 },

    /// Persisted relationship referencing a node missing from the same database
    #[error("Corrupt database: {0}")]
    Graph(#[from] GraphError),

    #[error("Invalid database name: {0:?}")]
    InvalidName(String),
}

pub type PersistenceResult<T> = Result<T, PersistenceError>;
