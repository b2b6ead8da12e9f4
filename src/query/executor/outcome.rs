//! Per-statement results

use super::bindings::Bindings;
use indexmap::IndexMap;
use rustc_hash::FxHashSet;
use serde::{Serialize, Serializer};
use serde_json::{json, Value as JsonValue};

/// Projected RETURN record, columns in RETURN order
pub type ReturnRow = IndexMap<String, JsonValue>;

/// Entities created by one CREATE
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CreateSummary {
    pub nodes_created: usize,
    pub relationships_created: usize,
}

/// Entities removed by one DELETE, cascaded relationships included
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeleteSummary {
    pub nodes_deleted: usize,
    pub relationships_deleted: usize,
}

/// Result of executing one statement
#[derive(Debug, Clone, PartialEq)]
pub enum StatementOutcome {
    Created(CreateSummary),
    Matched(Vec<Bindings>),
    Returned(Vec<ReturnRow>),
    Deleted(DeleteSummary),
}

impl StatementOutcome {
    pub fn as_matched(&self) -> Option<&[Bindings]> {
        match self {
            StatementOutcome::Matched(matches) => Some(matches),
            _ => None,
        }
    }

    pub fn as_returned(&self) -> Option<&[ReturnRow]> {
        match self {
            StatementOutcome::Returned(rows) => Some(rows),
            _ => None,
        }
    }

    /// `{"status": "created"}`, `{"matched": [...]}`, `{"return": [...]}`
    /// or `{"status": "deleted"}`
    pub fn to_json(&self) -> JsonValue {
        match self {
            StatementOutcome::Created(_) => json!({"status": "created"}),
            StatementOutcome::Matched(matches) => {
                json!({"matched": matches.iter().map(Bindings::to_json).collect::<Vec<_>>()})
            }
            StatementOutcome::Returned(rows) => {
                json!({"return": rows.iter().map(row_to_json).collect::<Vec<_>>()})
            }
            StatementOutcome::Deleted(_) => json!({"status": "deleted"}),
        }
    }
}

impl Serialize for StatementOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

pub fn row_to_json(row: &ReturnRow) -> JsonValue {
    JsonValue::Object(row.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
}

/// Drop rows equal to an earlier row, keeping first occurrences
pub fn distinct_rows(rows: impl IntoIterator<Item = ReturnRow>) -> Vec<ReturnRow> {
    let mut seen = FxHashSet::default();
    rows.into_iter()
        .filter(|row| seen.insert(canonical_key(row)))
        .collect()
}

/// Serialization with object keys sorted at every level
///
/// `serde_json::Map` is key-ordered without the `preserve_order` feature.
fn canonical_key(row: &ReturnRow) -> String {
    row_to_json(row).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(&str, JsonValue)]) -> ReturnRow {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn test_outcome_json_shapes() {
        assert_eq!(
            StatementOutcome::Created(CreateSummary::default()).to_json(),
            json!({"status": "created"})
        );
        assert_eq!(
            StatementOutcome::Deleted(DeleteSummary::default()).to_json(),
            json!({"status": "deleted"})
        );
        assert_eq!(StatementOutcome::Matched(vec![]).to_json(), json!({"matched": []}));

        let rows = vec![row(&[("n", json!(null))])];
        assert_eq!(
            StatementOutcome::Returned(rows).to_json(),
            json!({"return": [{"n": null}]})
        );
    }

    #[test]
    fn test_distinct_keeps_first_occurrence() {
        let rows = vec![
            row(&[("a", json!(1))]),
            row(&[("a", json!(2))]),
            row(&[("a", json!(1))]),
        ];
        let unique = distinct_rows(rows);
        assert_eq!(unique, vec![row(&[("a", json!(1))]), row(&[("a", json!(2))])]);
    }

    #[test]
    fn test_distinct_ignores_key_order() {
        let first = row(&[("a", json!({"x": 1, "y": 2})), ("b", json!(null))]);
        let second = row(&[("b", json!(null)), ("a", json!({"y": 2, "x": 1}))]);
        assert_eq!(distinct_rows(vec![first, second]).len(), 1);
    }

    #[test]
    fn test_distinct_is_idempotent() {
        let rows = vec![row(&[("a", json!("x"))]), row(&[("a", json!("y"))])];
        let once = distinct_rows(rows.clone());
        assert_eq!(once, rows);
        assert_eq!(distinct_rows(once.clone()), once);
    }

    #[test]
    fn test_serialize_matches_to_json() {
        let outcome = StatementOutcome::Created(CreateSummary {
            nodes_created: 2,
            relationships_created: 1,
        });
        assert_eq!(serde_json::to_value(&outcome).unwrap(), outcome.to_json());
    }
}
