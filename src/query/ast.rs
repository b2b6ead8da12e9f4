//! Abstract syntax tree for the supported Cypher subset
//!
//! A query is an ordered list of [`Statement`]s. Patterns are lists of
//! [`PatternElement`]s, each an alternating `node (-[rel]-> node)*` chain.

use crate::graph::{Label, PropertyMap, PropertyValue, RelationshipType};
use std::fmt;

/// One executable statement
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Create(CreateClause),
    Match(MatchClause),
    Return(ReturnClause),
    Delete(DeleteClause),
}

/// Statement discriminant, used for logging
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatementKind {
    Create,
    Match,
    Return,
    Delete,
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StatementKind::Create => "CREATE",
            StatementKind::Match => "MATCH",
            StatementKind::Return => "RETURN",
            StatementKind::Delete => "DELETE",
        };
        f.write_str(name)
    }
}

impl Statement {
    pub fn kind(&self) -> StatementKind {
        match self {
            Statement::Create(_) => StatementKind::Create,
            Statement::Match(_) => StatementKind::Match,
            Statement::Return(_) => StatementKind::Return,
            Statement::Delete(_) => StatementKind::Delete,
        }
    }

    /// True if executing the statement never changes the store
    pub fn is_read_only(&self) -> bool {
        matches!(self, Statement::Match(_) | Statement::Return(_))
    }
}

/// CREATE clause
#[derive(Debug, Clone, PartialEq)]
pub struct CreateClause {
    pub pattern: Pattern,
}

/// MATCH clause with its optional WHERE filter
#[derive(Debug, Clone, PartialEq)]
pub struct MatchClause {
    pub pattern: Pattern,
    pub where_clause: Option<WhereClause>,
}

/// RETURN clause
#[derive(Debug, Clone, PartialEq)]
pub struct ReturnClause {
    pub variables: Vec<String>,
    pub distinct: bool,
}

/// DELETE clause
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteClause {
    pub variables: Vec<String>,
}

/// Single equality condition: `variable.key = value`
#[derive(Debug, Clone, PartialEq)]
pub struct WhereClause {
    pub variable: String,
    pub key: String,
    pub value: PropertyValue,
}

impl WhereClause {
    pub fn new(variable: impl Into<String>, key: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        Self {
            variable: variable.into(),
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Comma-separated pattern elements
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Pattern {
    pub elements: Vec<PatternElement>,
}

impl Pattern {
    pub fn new(elements: Vec<PatternElement>) -> Self {
        Self { elements }
    }

    /// Every variable named anywhere in the pattern
    pub fn variables(&self) -> Vec<&str> {
        self.elements.iter().flat_map(|e| e.variables()).collect()
    }
}

/// Alternating node/relationship chain: `(a)-[r]->(b)`
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PatternElement {
    pub items: Vec<PatternItem>,
}

impl PatternElement {
    pub fn new(start: NodePattern) -> Self {
        Self {
            items: vec![PatternItem::Node(start)],
        }
    }

    /// Append a relationship and the node it points to
    pub fn then(mut self, rel: RelationshipPattern, node: NodePattern) -> Self {
        self.items.push(PatternItem::Relationship(rel));
        self.items.push(PatternItem::Node(node));
        self
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn variables(&self) -> impl Iterator<Item = &str> {
        self.items.iter().filter_map(PatternItem::variable)
    }
}

/// One position in a pattern element
#[derive(Debug, Clone, PartialEq)]
pub enum PatternItem {
    Node(NodePattern),
    Relationship(RelationshipPattern),
}

impl PatternItem {
    pub fn variable(&self) -> Option<&str> {
        match self {
            PatternItem::Node(node) => node.variable.as_deref(),
            PatternItem::Relationship(rel) => rel.variable.as_deref(),
        }
    }
}

/// Node descriptor: `(var:Label {key: value})`
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NodePattern {
    pub variable: Option<String>,
    pub label: Option<Label>,
    pub properties: PropertyMap,
}

impl NodePattern {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn variable(mut self, name: impl Into<String>) -> Self {
        self.variable = Some(name.into());
        self
    }

    pub fn label(mut self, label: impl Into<Label>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn property(mut self, key: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }
}

/// Relationship descriptor: `-[var:TYPE {key: value}]->`
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RelationshipPattern {
    pub variable: Option<String>,
    pub rel_type: Option<RelationshipType>,
    pub properties: PropertyMap,
}

impl RelationshipPattern {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn variable(mut self, name: impl Into<String>) -> Self {
        self.variable = Some(name.into());
        self
    }

    pub fn rel_type(mut self, rel_type: impl Into<RelationshipType>) -> Self {
        self.rel_type = Some(rel_type.into());
        self
    }

    pub fn property(mut self, key: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }
}
