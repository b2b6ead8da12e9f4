//! Cypher parser using Pest
//!
//! Turns query text into an ordered list of [`Statement`]s. No semantic
//! checks happen here: variables referenced before they are bound are the
//! executor's concern.

use crate::graph::{Label, PropertyMap, PropertyValue, RelationshipType};
use crate::query::ast::*;
use pest::error::{Error as PestError, LineColLocation};
use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser;
use thiserror::Error;

#[derive(Parser)]
#[grammar = "query/cypher.pest"]
struct CypherParser;

/// Parser errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    /// Query text outside the supported grammar
    #[error("Syntax error at line {line}, column {column}: {message}")]
    Syntax {
        line: usize,
        column: usize,
        message: String,
    },

    /// Literal that matches the grammar but has no value (e.g. integer overflow)
    #[error("Invalid literal: {0}")]
    InvalidLiteral(String),
}

pub type ParseResult<T> = Result<T, ParseError>;

impl From<PestError<Rule>> for ParseError {
    fn from(err: PestError<Rule>) -> Self {
        let (line, column) = match err.line_col {
            LineColLocation::Pos(pos) => pos,
            LineColLocation::Span(start, _) => start,
        };
        ParseError::Syntax {
            line,
            column,
            message: err.variant.message().to_string(),
        }
    }
}

/// Parse one or more statements
pub fn parse_query(input: &str) -> ParseResult<Vec<Statement>> {
    let pairs = CypherParser::parse(Rule::query, input)?;

    let mut statements = Vec::new();
    for pair in pairs {
        if pair.as_rule() != Rule::query {
            continue;
        }
        for inner in pair.into_inner() {
            match inner.as_rule() {
                Rule::create_stmt => statements.push(parse_create_statement(inner)?),
                Rule::match_stmt => statements.push(parse_match_statement(inner)?),
                Rule::return_stmt => statements.push(parse_return_statement(inner)),
                Rule::delete_stmt => statements.push(parse_delete_statement(inner)),
                Rule::EOI => break,
                _ => {}
            }
        }
    }

    Ok(statements)
}

fn parse_create_statement(pair: Pair<Rule>) -> ParseResult<Statement> {
    let mut pattern = Pattern::default();
    for inner in pair.into_inner() {
        if inner.as_rule() == Rule::pattern {
            pattern = parse_pattern(inner)?;
        }
    }
    Ok(Statement::Create(CreateClause { pattern }))
}

fn parse_match_statement(pair: Pair<Rule>) -> ParseResult<Statement> {
    let mut pattern = Pattern::default();
    let mut where_clause = None;

    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::pattern => pattern = parse_pattern(inner)?,
            Rule::where_clause => where_clause = Some(parse_where_clause(inner)?),
            _ => {}
        }
    }

    Ok(Statement::Match(MatchClause {
        pattern,
        where_clause,
    }))
}

fn parse_return_statement(pair: Pair<Rule>) -> Statement {
    let mut variables = Vec::new();
    let mut distinct = false;

    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::distinct => distinct = true,
            Rule::variable_list => variables = parse_variable_list(inner),
            _ => {}
        }
    }

    Statement::Return(ReturnClause {
        variables,
        distinct,
    })
}

fn parse_delete_statement(pair: Pair<Rule>) -> Statement {
    let variables = pair
        .into_inner()
        .find(|inner| inner.as_rule() == Rule::variable_list)
        .map(parse_variable_list)
        .unwrap_or_default();
    Statement::Delete(DeleteClause { variables })
}

fn parse_variable_list(pair: Pair<Rule>) -> Vec<String> {
    pair.into_inner()
        .filter(|inner| inner.as_rule() == Rule::variable)
        .map(|inner| inner.as_str().to_string())
        .collect()
}

fn parse_where_clause(pair: Pair<Rule>) -> ParseResult<WhereClause> {
    let mut variable = String::new();
    let mut key = String::new();
    let mut value = PropertyValue::Null;

    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::variable => variable = inner.as_str().to_string(),
            Rule::property_key => key = inner.as_str().to_string(),
            Rule::string | Rule::number => value = parse_literal(inner)?,
            _ => {}
        }
    }

    Ok(WhereClause {
        variable,
        key,
        value,
    })
}

fn parse_pattern(pair: Pair<Rule>) -> ParseResult<Pattern> {
    let mut elements = Vec::new();
    for inner in pair.into_inner() {
        if inner.as_rule() == Rule::pattern_element {
            elements.push(parse_pattern_element(inner)?);
        }
    }
    Ok(Pattern { elements })
}

fn parse_pattern_element(pair: Pair<Rule>) -> ParseResult<PatternElement> {
    let mut items = Vec::new();
    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::node_pattern => items.push(PatternItem::Node(parse_node_pattern(inner)?)),
            Rule::relationship_pattern => {
                items.push(PatternItem::Relationship(parse_relationship_pattern(inner)?))
            }
            _ => {}
        }
    }
    Ok(PatternElement { items })
}

fn parse_node_pattern(pair: Pair<Rule>) -> ParseResult<NodePattern> {
    let mut node = NodePattern::new();
    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::variable => node.variable = Some(inner.as_str().to_string()),
            Rule::label => node.label = Some(Label::new(inner.as_str())),
            Rule::properties => node.properties = parse_properties(inner)?,
            _ => {}
        }
    }
    Ok(node)
}

fn parse_relationship_pattern(pair: Pair<Rule>) -> ParseResult<RelationshipPattern> {
    let mut rel = RelationshipPattern::new();
    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::variable => rel.variable = Some(inner.as_str().to_string()),
            Rule::rel_type => rel.rel_type = Some(RelationshipType::new(inner.as_str())),
            Rule::properties => rel.properties = parse_properties(inner)?,
            _ => {}
        }
    }
    Ok(rel)
}

fn parse_properties(pair: Pair<Rule>) -> ParseResult<PropertyMap> {
    let mut props = PropertyMap::new();

    for prop in pair.into_inner() {
        if prop.as_rule() != Rule::property {
            continue;
        }
        let mut key = String::new();
        let mut value = PropertyValue::Null;

        for part in prop.into_inner() {
            match part.as_rule() {
                Rule::property_key => key = part.as_str().to_string(),
                Rule::string | Rule::number => value = parse_literal(part)?,
                _ => {}
            }
        }

        // Later duplicates win
        props.insert(key, value);
    }

    Ok(props)
}

fn parse_literal(pair: Pair<Rule>) -> ParseResult<PropertyValue> {
    match pair.as_rule() {
        Rule::number => parse_number(pair.as_str()),
        Rule::string => {
            let raw = pair
                .into_inner()
                .next()
                .map(|inner| inner.as_str())
                .unwrap_or("");
            Ok(PropertyValue::String(unescape(raw)?))
        }
        _ => Err(ParseError::InvalidLiteral(pair.as_str().to_string())),
    }
}

/// A `.` or exponent makes a float; anything else must fit an i64
fn parse_number(text: &str) -> ParseResult<PropertyValue> {
    if text.contains(['.', 'e', 'E']) {
        match text.parse::<f64>() {
            Ok(f) if f.is_finite() => Ok(PropertyValue::Float(f)),
            _ => Err(ParseError::InvalidLiteral(text.to_string())),
        }
    } else {
        text.parse::<i64>()
            .map(PropertyValue::Integer)
            .map_err(|_| ParseError::InvalidLiteral(text.to_string()))
    }
}

fn unescape(raw: &str) -> ParseResult<String> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            Some('/') => out.push('/'),
            Some('b') => out.push('\u{0008}'),
            Some('f') => out.push('\u{000C}'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('u') => {
                let hex: String = chars.by_ref().take(4).collect();
                let ch = u32::from_str_radix(&hex, 16)
                    .ok()
                    .and_then(char::from_u32)
                    .ok_or_else(|| ParseError::InvalidLiteral(format!("\\u{}", hex)))?;
                out.push(ch);
            }
            other => {
                return Err(ParseError::InvalidLiteral(format!(
                    "\\{}",
                    other.map(String::from).unwrap_or_default()
                )))
            }
        }
    }

    Ok(out)
}
