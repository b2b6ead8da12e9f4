//! Query processing
//!
//! - [`parser`]: text to [`Statement`] list (Pest grammar in `cypher.pest`)
//! - [`executor`]: CREATE / MATCH / RETURN / DELETE against a database

pub mod ast;
pub mod executor;
pub mod parser;

// Re-export main types
pub use ast::{
    CreateClause, DeleteClause, MatchClause, NodePattern, Pattern, PatternElement, PatternItem,
    RelationshipPattern, ReturnClause, Statement, StatementKind, WhereClause,
};
pub use executor::{
    Bindings, CreateSummary, CypherExecutor, DeleteSummary, Entity, EntityRef, ExecutionError,
    ExecutionResult, PatternMatcher, ReturnRow, StatementOutcome,
};
pub use parser::{parse_query, ParseError, ParseResult};
