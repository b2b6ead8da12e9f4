//! Backtracking pattern matcher and cross-element join

use super::bindings::{Bindings, Entity, EntityRef};
use crate::graph::{GraphStore, Node, NodeId, PropertyMap, PropertyValue, Relationship};
use crate::query::ast::{NodePattern, Pattern, PatternElement, PatternItem, RelationshipPattern, WhereClause};
use rustc_hash::FxHashMap;

/// Where the search stands within a pattern element
#[derive(Debug, Clone, Copy)]
enum Cursor {
    /// Nothing matched yet
    Start,
    /// Last position matched this node; the next relationship starts here
    Node(NodeId),
    /// Last position matched a relationship; the next node must be its end
    Relationship { end: NodeId },
}

/// Finds every binding context satisfying a pattern
pub struct PatternMatcher<'a> {
    store: &'a GraphStore,
    where_clause: Option<&'a WhereClause>,
}

impl<'a> PatternMatcher<'a> {
    pub fn new(store: &'a GraphStore, where_clause: Option<&'a WhereClause>) -> Self {
        Self {
            store,
            where_clause,
        }
    }

    /// Match each element independently, then join left to right
    pub fn match_pattern(&self, pattern: &Pattern) -> Vec<Bindings> {
        let per_element = pattern
            .elements
            .iter()
            .map(|element| self.match_element(element))
            .collect();
        join_all(per_element)
    }

    /// All binding contexts for one element, in store id order
    pub fn match_element(&self, element: &PatternElement) -> Vec<Bindings> {
        let mut matches = Vec::new();
        if !element.is_empty() {
            self.search(&element.items, Cursor::Start, Bindings::new(), &mut matches);
        }
        matches
    }

    fn search(&self, items: &[PatternItem], cursor: Cursor, bindings: Bindings, out: &mut Vec<Bindings>) {
        let Some((item, rest)) = items.split_first() else {
            out.push(bindings);
            return;
        };

        match item {
            PatternItem::Node(desc) => {
                for node in self.node_candidates(desc, cursor, &bindings) {
                    if let Some(next) = self.accept_node(desc, node, &bindings) {
                        self.search(rest, Cursor::Node(node.id), next, out);
                    }
                }
            }
            PatternItem::Relationship(desc) => {
                // A relationship only traverses from a matched node
                let Cursor::Node(anchor) = cursor else {
                    return;
                };
                for rel in self.store.outgoing(anchor) {
                    if let Some(next) = self.accept_relationship(desc, rel, &bindings) {
                        self.search(rest, Cursor::Relationship { end: rel.end }, next, out);
                    }
                }
            }
        }
    }

    /// Candidate nodes in id order; narrower sources yield the same
    /// survivors as a full scan
    fn node_candidates(&self, desc: &NodePattern, cursor: Cursor, bindings: &Bindings) -> Vec<&'a Node> {
        if let Cursor::Relationship { end } = cursor {
            return self.store.get_node(end).into_iter().collect();
        }
        if let Some(Entity::Node(bound)) = desc.variable.as_deref().and_then(|v| bindings.get(v)) {
            return self.store.get_node(bound.id).into_iter().collect();
        }
        match &desc.label {
            Some(label) => self.store.nodes_by_label(label),
            None => self.store.all_nodes(),
        }
    }

    fn accept_node(&self, desc: &NodePattern, node: &Node, bindings: &Bindings) -> Option<Bindings> {
        if let Some(label) = &desc.label {
            if !node.has_label(label) {
                return None;
            }
        }
        if !properties_hold(&desc.properties, |key| node.get_property(key)) {
            return None;
        }
        self.bind_checked(
            desc.variable.as_deref(),
            EntityRef::Node(node.id),
            |key| node.get_property(key),
            || Entity::Node(node.clone()),
            bindings,
        )
    }

    fn accept_relationship(
        &self,
        desc: &RelationshipPattern,
        rel: &Relationship,
        bindings: &Bindings,
    ) -> Option<Bindings> {
        if let Some(rel_type) = &desc.rel_type {
            if &rel.rel_type != rel_type {
                return None;
            }
        }
        if !properties_hold(&desc.properties, |key| rel.get_property(key)) {
            return None;
        }
        self.bind_checked(
            desc.variable.as_deref(),
            EntityRef::Relationship(rel.id),
            |key| rel.get_property(key),
            || Entity::Relationship(rel.clone()),
            bindings,
        )
    }

    /// Apply the rebinding rule and the WHERE filter for a named position
    fn bind_checked<'p>(
        &self,
        variable: Option<&str>,
        identity: EntityRef,
        property: impl Fn(&str) -> Option<&'p PropertyValue>,
        snapshot: impl FnOnce() -> Entity,
        bindings: &Bindings,
    ) -> Option<Bindings> {
        let Some(var) = variable else {
            return Some(bindings.clone());
        };

        if let Some(filter) = self.where_clause {
            if filter.variable == var
                && !property(filter.key.as_str()).is_some_and(|value| value.matches(&filter.value))
            {
                return None;
            }
        }

        match bindings.get(var) {
            Some(existing) if existing.identity() == identity => Some(bindings.clone()),
            Some(_) => None,
            None => Some(bindings.bind(var, snapshot())),
        }
    }
}

fn properties_hold<'p>(
    required: &PropertyMap,
    property: impl Fn(&str) -> Option<&'p PropertyValue>,
) -> bool {
    required
        .iter()
        .all(|(key, expected)| property(key.as_str()).is_some_and(|actual| actual.matches(expected)))
}

/// Join per-element match lists left to right
///
/// Returns nothing for an empty list of lists.
pub fn join_all(lists: Vec<Vec<Bindings>>) -> Vec<Bindings> {
    let mut lists = lists.into_iter();
    let Some(mut joined) = lists.next() else {
        return Vec::new();
    };
    for next in lists {
        joined = join(&joined, &next);
    }
    joined
}

/// Pairs from `left` x `right` agreeing on every shared variable, merged
///
/// Output order is that of a nested loop with `left` outermost. Shared
/// variables are keyed by entity identity through a hash table built over
/// `right`.
pub fn join(left: &[Bindings], right: &[Bindings]) -> Vec<Bindings> {
    let (Some(l0), Some(r0)) = (left.first(), right.first()) else {
        return Vec::new();
    };
    let shared: Vec<&str> = l0.variables().filter(|v| r0.contains(v)).collect();

    let keyed: Option<Vec<Vec<EntityRef>>> = right.iter().map(|b| b.key_for(&shared)).collect();
    let right_keys = match keyed {
        Some(keys) if !shared.is_empty() => keys,
        _ => return nested_loop_join(left, right),
    };

    let mut index: FxHashMap<&[EntityRef], Vec<usize>> = FxHashMap::default();
    for (i, key) in right_keys.iter().enumerate() {
        index.entry(key.as_slice()).or_default().push(i);
    }

    let mut joined = Vec::new();
    for l in left {
        match l.key_for(&shared) {
            Some(key) => {
                if let Some(matches) = index.get(key.as_slice()) {
                    for &i in matches {
                        if l.agrees_with(&right[i]) {
                            joined.push(l.merged(&right[i]));
                        }
                    }
                }
            }
            None => joined.extend(
                right
                    .iter()
                    .filter(|r| l.agrees_with(r))
                    .map(|r| l.merged(r)),
            ),
        }
    }
    joined
}

fn nested_loop_join(left: &[Bindings], right: &[Bindings]) -> Vec<Bindings> {
    left.iter()
        .flat_map(|l| {
            right
                .iter()
                .filter(move |r| l.agrees_with(r))
                .map(move |r| l.merged(r))
        })
        .collect()
}
