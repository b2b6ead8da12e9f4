//! Statement execution
//!
//! [`CypherExecutor`] runs statements against the current database of a
//! [`GraphDatabase`]. Its only session state is the binding list of the most
//! recent MATCH, which RETURN and DELETE read and only a later MATCH
//! replaces.

pub mod bindings;
pub mod matcher;
pub mod outcome;

pub use bindings::{Bindings, Entity, EntityRef};
pub use matcher::PatternMatcher;
pub use outcome::{CreateSummary, DeleteSummary, ReturnRow, StatementOutcome};

use crate::graph::{GraphError, GraphStore, NodeId};
use crate::persistence::{GraphDatabase, PersistenceError};
use crate::query::ast::*;
use crate::query::parser::{parse_query, ParseError};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, warn};

/// Execution errors
#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    /// Structurally malformed statement, e.g. a CREATE relationship with no
    /// type or no following node
    #[error("Semantic error: {0}")]
    Semantic(String),
}

pub type ExecutionResult<T> = Result<T, ExecutionError>;

/// Executes Cypher statements with session-scoped last-match state
pub struct CypherExecutor<'a> {
    db: &'a mut GraphDatabase,
    last_match: Vec<Bindings>,
}

impl<'a> CypherExecutor<'a> {
    /// Create an executor with an empty last-match state
    pub fn new(db: &'a mut GraphDatabase) -> Self {
        Self {
            db,
            last_match: Vec::new(),
        }
    }

    /// Parse and execute a query, one outcome per statement
    ///
    /// A failing statement aborts the rest; effects of earlier statements
    /// are kept.
    pub fn execute(&mut self, query: &str) -> ExecutionResult<Vec<StatementOutcome>> {
        let statements = parse_query(query)?;
        self.execute_statements(&statements)
    }

    pub fn execute_statements(&mut self, statements: &[Statement]) -> ExecutionResult<Vec<StatementOutcome>> {
        let mut outcomes = Vec::with_capacity(statements.len());
        for statement in statements {
            outcomes.push(self.execute_statement(statement)?);
        }
        Ok(outcomes)
    }

    pub fn execute_statement(&mut self, statement: &Statement) -> ExecutionResult<StatementOutcome> {
        debug!(kind = %statement.kind(), database = self.db.current_name(), "executing statement");
        match statement {
            Statement::Create(clause) => self.create(clause).map(StatementOutcome::Created),
            Statement::Match(clause) => Ok(StatementOutcome::Matched(self.match_pattern(clause))),
            Statement::Return(clause) => Ok(StatementOutcome::Returned(self.project(clause))),
            Statement::Delete(clause) => self.delete(clause).map(StatementOutcome::Deleted),
        }
    }

    /// Bindings of the most recent MATCH
    pub fn last_match(&self) -> &[Bindings] {
        &self.last_match
    }

    pub fn database(&self) -> &GraphDatabase {
        &*self.db
    }

    pub fn database_mut(&mut self) -> &mut GraphDatabase {
        &mut *self.db
    }

    fn create(&mut self, clause: &CreateClause) -> ExecutionResult<CreateSummary> {
        validate_create_pattern(&clause.pattern)?;

        let store = self.db.store_mut();
        let mut summary = CreateSummary::default();
        // Shared by every element of the statement
        let mut variables: HashMap<String, NodeId> = HashMap::new();

        for element in &clause.pattern.elements {
            let mut previous: Option<NodeId> = None;
            let mut idx = 0;

            while let Some(item) = element.items.get(idx) {
                match item {
                    PatternItem::Node(desc) => {
                        previous = Some(resolve_node(store, desc, &mut variables, &mut summary));
                        idx += 1;
                    }
                    PatternItem::Relationship(desc) => {
                        let (Some(start), Some(PatternItem::Node(next)), Some(rel_type)) =
                            (previous, element.items.get(idx + 1), desc.rel_type.as_ref())
                        else {
                            return Err(ExecutionError::Semantic(
                                "relationship must sit between two node patterns and name a type".to_string(),
                            ));
                        };
                        let end = resolve_node(store, next, &mut variables, &mut summary);
                        store.add_relationship(rel_type.clone(), start, end, desc.properties.clone())?;
                        summary.relationships_created += 1;
                        previous = Some(end);
                        idx += 2;
                    }
                }
            }
        }

        debug!(
            nodes = summary.nodes_created,
            relationships = summary.relationships_created,
            "CREATE applied"
        );
        self.db.save()?;
        Ok(summary)
    }

    fn match_pattern(&mut self, clause: &MatchClause) -> Vec<Bindings> {
        if let Some(filter) = &clause.where_clause {
            if !clause.pattern.variables().contains(&filter.variable.as_str()) {
                warn!(
                    variable = %filter.variable,
                    "WHERE names a variable the pattern never binds; condition ignored"
                );
            }
        }

        let matcher = PatternMatcher::new(self.db.store(), clause.where_clause.as_ref());
        self.last_match = matcher.match_pattern(&clause.pattern);
        debug!(matches = self.last_match.len(), "MATCH complete");
        self.last_match.clone()
    }

    fn project(&self, clause: &ReturnClause) -> Vec<ReturnRow> {
        let rows = self.last_match.iter().map(|bindings| {
            clause
                .variables
                .iter()
                .map(|var| {
                    let value = bindings.get(var).map_or(JsonValue::Null, Entity::to_json);
                    (var.clone(), value)
                })
                .collect::<ReturnRow>()
        });

        if clause.distinct {
            outcome::distinct_rows(rows)
        } else {
            rows.collect()
        }
    }

    fn delete(&mut self, clause: &DeleteClause) -> ExecutionResult<DeleteSummary> {
        let store = self.db.store_mut();
        let nodes_before = store.node_count();
        let relationships_before = store.relationship_count();

        for bindings in &self.last_match {
            for var in &clause.variables {
                match bindings.get(var).map(Entity::identity) {
                    Some(EntityRef::Node(id)) => {
                        store.delete_node(id);
                    }
                    Some(EntityRef::Relationship(id)) => {
                        store.delete_relationship(id);
                    }
                    None => {}
                }
            }
        }

        let summary = DeleteSummary {
            nodes_deleted: nodes_before - store.node_count(),
            relationships_deleted: relationships_before - store.relationship_count(),
        };
        debug!(
            nodes = summary.nodes_deleted,
            relationships = summary.relationships_deleted,
            "DELETE applied"
        );
        self.db.save()?;
        Ok(summary)
    }
}

/// Reuse the node bound to the descriptor's variable or create a new one
fn resolve_node(
    store: &mut GraphStore,
    desc: &NodePattern,
    variables: &mut HashMap<String, NodeId>,
    summary: &mut CreateSummary,
) -> NodeId {
    if let Some(id) = desc.variable.as_ref().and_then(|var| variables.get(var)) {
        return *id;
    }

    let id = store.add_node(desc.label.iter().cloned().collect(), desc.properties.clone());
    summary.nodes_created += 1;
    if let Some(var) = &desc.variable {
        variables.insert(var.clone(), id);
    }
    id
}

/// Reject CREATE patterns that cannot be applied in full, before any
/// entity is created
fn validate_create_pattern(pattern: &Pattern) -> ExecutionResult<()> {
    for element in &pattern.elements {
        let items = &element.items;
        if !matches!(items.first(), Some(PatternItem::Node(_))) {
            return Err(ExecutionError::Semantic(
                "CREATE pattern element must start with a node".to_string(),
            ));
        }
        for (idx, item) in items.iter().enumerate() {
            let PatternItem::Relationship(rel) = item else {
                continue;
            };
            if rel.rel_type.is_none() {
                return Err(ExecutionError::Semantic(
                    "CREATE relationship needs a type".to_string(),
                ));
            }
            if !matches!(items.get(idx + 1), Some(PatternItem::Node(_))) {
                return Err(ExecutionError::Semantic(
                    "CREATE relationship must be followed by a node".to_string(),
                ));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Label;
    use serde_json::json;

    #[test]
    fn test_create_then_match_return() {
        let mut db = GraphDatabase::in_memory();
        let mut executor = db.executor();

        let outcomes = executor
            .execute(r#"CREATE (a:Person {name: "Alice"})-[:KNOWS]->(b:Person {name: "Bob"})"#)
            .unwrap();
        assert_eq!(
            outcomes,
            vec![StatementOutcome::Created(CreateSummary {
                nodes_created: 2,
                relationships_created: 1,
            })]
        );

        let outcomes = executor
            .execute("MATCH (a:Person)-[:KNOWS]->(b:Person) RETURN a, b")
            .unwrap();
        let rows = outcomes[1].as_returned().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["a"]["properties"]["name"], json!("Alice"));
        assert_eq!(rows[0]["b"]["properties"]["name"], json!("Bob"));
    }

    #[test]
    fn test_create_variables_span_elements() {
        let mut db = GraphDatabase::in_memory();
        let mut executor = db.executor();
        let outcomes = executor
            .execute("CREATE (a:Hub)-[:LINK]->(b:Leaf), (a)-[:LINK]->(c:Leaf), (b)-[:LINK]->(c)")
            .unwrap();
        assert_eq!(
            outcomes[0],
            StatementOutcome::Created(CreateSummary {
                nodes_created: 3,
                relationships_created: 3,
            })
        );

        let store = executor.database().store();
        let hubs = store.nodes_by_label(&Label::new("Hub"));
        assert_eq!(hubs.len(), 1);
        assert_eq!(store.outgoing(hubs[0].id).len(), 2);
    }

    #[test]
    fn test_create_anonymous_target_once() {
        let mut db = GraphDatabase::in_memory();
        let mut executor = db.executor();
        executor.execute("CREATE (a)-[:X]->(), ()").unwrap();
        assert_eq!(executor.database().store().node_count(), 3);
        assert_eq!(executor.database().store().relationship_count(), 1);
    }

    #[test]
    fn test_create_untyped_relationship_rejected_without_side_effects() {
        let mut db = GraphDatabase::in_memory();
        let mut executor = db.executor();
        let result = executor.execute("CREATE (a), (b)-[]->(c)");
        assert!(matches!(result, Err(ExecutionError::Semantic(_))));
        assert!(executor.database().store().is_empty());
    }

    #[test]
    fn test_malformed_programmatic_create() {
        let mut db = GraphDatabase::in_memory();
        let mut executor = db.executor();
        let statement = Statement::Create(CreateClause {
            pattern: Pattern::new(vec![PatternElement {
                items: vec![
                    PatternItem::Node(NodePattern::new()),
                    PatternItem::Relationship(RelationshipPattern::new().rel_type("X")),
                ],
            }]),
        });
        let result = executor.execute_statement(&statement);
        assert!(matches!(result, Err(ExecutionError::Semantic(_))));
    }

    #[test]
    fn test_return_unbound_variable_is_null() {
        let mut db = GraphDatabase::in_memory();
        let mut executor = db.executor();
        executor.execute("CREATE (n:Thing)").unwrap();
        let outcomes = executor.execute("MATCH (n:Thing) RETURN n, missing").unwrap();
        let rows = outcomes[1].as_returned().unwrap();
        assert_eq!(rows[0]["missing"], JsonValue::Null);
        assert_eq!(rows[0].keys().collect::<Vec<_>>(), vec!["n", "missing"]);
    }

    #[test]
    fn test_return_without_match_is_empty() {
        let mut db = GraphDatabase::in_memory();
        let mut executor = db.executor();
        let outcomes = executor.execute("RETURN n").unwrap();
        assert_eq!(outcomes, vec![StatementOutcome::Returned(vec![])]);
    }

    #[test]
    fn test_last_match_persists_across_calls() {
        let mut db = GraphDatabase::in_memory();
        let mut executor = db.executor();
        executor.execute("CREATE (a:A), (b:B)").unwrap();

        executor.execute("MATCH (x:A)").unwrap();
        assert_eq!(executor.last_match().len(), 1);
        let outcomes = executor.execute("RETURN x").unwrap();
        assert_eq!(outcomes[0].as_returned().unwrap().len(), 1);

        // Replaced by the next MATCH, even an empty one
        executor.execute("MATCH (x:Nothing)").unwrap();
        assert!(executor.last_match().is_empty());
        let outcomes = executor.execute("RETURN x").unwrap();
        assert!(outcomes[0].as_returned().unwrap().is_empty());
    }

    #[test]
    fn test_delete_is_idempotent_across_bindings() {
        let mut db = GraphDatabase::in_memory();
        let mut executor = db.executor();
        executor
            .execute("CREATE (hub:Hub)-[:E]->(a), (hub)-[:E]->(b)")
            .unwrap();

        let outcomes = executor.execute("MATCH (h:Hub)-[r:E]->(x) DELETE h, r").unwrap();
        assert_eq!(outcomes[0].as_matched().unwrap().len(), 2);
        assert_eq!(
            outcomes[1],
            StatementOutcome::Deleted(DeleteSummary {
                nodes_deleted: 1,
                relationships_deleted: 2,
            })
        );
        assert_eq!(executor.database().store().node_count(), 2);
        assert_eq!(executor.database().store().relationship_count(), 0);

        // Deleting the same bindings again changes nothing
        let outcomes = executor.execute("DELETE h, r").unwrap();
        assert_eq!(outcomes[0], StatementOutcome::Deleted(DeleteSummary::default()));
    }

    #[test]
    fn test_failure_keeps_earlier_effects() {
        let mut db = GraphDatabase::in_memory();
        let mut executor = db.executor();
        let statements = vec![
            Statement::Create(CreateClause {
                pattern: Pattern::new(vec![PatternElement::new(NodePattern::new().label("Kept"))]),
            }),
            Statement::Create(CreateClause {
                pattern: Pattern::new(vec![PatternElement { items: vec![] }]),
            }),
        ];
        assert!(executor.execute_statements(&statements).is_err());
        assert_eq!(executor.database().store().node_count(), 1);
    }

    #[test]
    fn test_parse_error_surfaces() {
        let mut db = GraphDatabase::in_memory();
        let mut executor = db.executor();
        let result = executor.execute("MATCH (n");
        assert!(matches!(result, Err(ExecutionError::Parse(ParseError::Syntax { .. }))));
    }
}
