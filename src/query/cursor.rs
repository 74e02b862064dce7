//! Match iteration over a tree.
//!
//! `QueryCursor` drives a compiled query over every node of a tree and yields
//! matches lazily. Iteration order is fixed: all matches of pattern 0 in
//! pre-order position of their root, then pattern 1, and so on — repeated
//! runs over the same query and tree produce identical sequences.

use std::mem;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::PredicateError;
use crate::query::matcher::match_pattern_at;
use crate::query::parser::{CaptureId, Query};
use crate::query::predicate::{MatchContext, RegexCache};
use crate::tree::Node;

pub struct QueryCursor {
    cancel: Option<Arc<AtomicBool>>,
    errors: Vec<PredicateError>,
    regexes: RegexCache,
}

impl QueryCursor {
    pub fn new() -> Self {
        Self {
            cancel: None,
            errors: Vec::new(),
            regexes: RegexCache::new(),
        }
    }

    /// Install a cancellation flag. Once it reads `true`, iteration stops at
    /// the next visited node; checked cooperatively, never blocking.
    pub fn set_cancellation_flag(&mut self, flag: Option<Arc<AtomicBool>>) {
        self.cancel = flag;
    }

    /// Iterate matches of `query` with `node` as the search root.
    ///
    /// Clears errors from any previous run on this cursor.
    pub fn matches<'q, 't, 'c>(
        &'c mut self,
        query: &'q Query,
        node: Node<'t>,
    ) -> Matches<'q, 't, 'c> {
        debug_assert_eq!(query.grammar().name(), node.grammar().name());
        self.errors.clear();
        Matches {
            cursor: self,
            query,
            root: node,
            pattern_index: 0,
            stack: vec![node],
            poisoned: vec![false; query.pattern_count()],
            caps: Vec::new(),
        }
    }

    /// Predicate evaluation failures from the most recent `matches` run.
    pub fn errors(&self) -> &[PredicateError] {
        &self.errors
    }

    fn cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }
}

impl Default for QueryCursor {
    fn default() -> Self {
        Self::new()
    }
}

pub struct Matches<'q, 't, 'c> {
    cursor: &'c mut QueryCursor,
    query: &'q Query,
    root: Node<'t>,
    pattern_index: usize,
    stack: Vec<Node<'t>>,
    poisoned: Vec<bool>,
    caps: Vec<(CaptureId, Node<'t>)>,
}

impl<'q, 't> Iterator for Matches<'q, 't, '_> {
    type Item = QueryMatch<'q, 't>;

    fn next(&mut self) -> Option<QueryMatch<'q, 't>> {
        let query = self.query;
        while self.pattern_index < query.pattern_count() {
            if self.poisoned[self.pattern_index] {
                self.advance_pattern();
                continue;
            }
            let Some(node) = self.stack.pop() else {
                self.advance_pattern();
                continue;
            };
            if self.cursor.cancelled() {
                return None;
            }
            for i in (0..node.child_count()).rev() {
                if let Some(child) = node.child(i) {
                    self.stack.push(child);
                }
            }

            self.caps.clear();
            let pattern = &query.patterns()[self.pattern_index];
            if !match_pattern_at(pattern, node, &mut self.caps) {
                continue;
            }

            let mut accepted = true;
            for pred in &pattern.predicates {
                let ctx = MatchContext::new(&self.caps, &self.cursor.regexes);
                match (pred.func)(&pred.args, &ctx) {
                    Ok(true) => {}
                    Ok(false) => {
                        accepted = false;
                        break;
                    }
                    Err(message) => {
                        self.poisoned[self.pattern_index] = true;
                        self.cursor.errors.push(PredicateError {
                            pattern_index: self.pattern_index,
                            predicate: pred.name.clone(),
                            message,
                        });
                        accepted = false;
                        break;
                    }
                }
            }
            if !accepted {
                continue;
            }

            return Some(QueryMatch {
                query,
                pattern_index: self.pattern_index,
                captures: mem::take(&mut self.caps),
            });
        }
        None
    }
}

impl Matches<'_, '_, '_> {
    fn advance_pattern(&mut self) {
        self.pattern_index += 1;
        self.stack.clear();
        self.stack.push(self.root);
    }
}

/// One accepted match: the pattern that fired and its capture bindings in
/// source order. Nodes borrow the tree; text resolves on demand.
pub struct QueryMatch<'q, 't> {
    query: &'q Query,
    pattern_index: usize,
    captures: Vec<(CaptureId, Node<'t>)>,
}

impl<'q, 't> QueryMatch<'q, 't> {
    pub fn pattern_index(&self) -> usize {
        self.pattern_index
    }

    pub fn captures(&self) -> &[(CaptureId, Node<'t>)] {
        &self.captures
    }

    pub fn capture_name(&self, id: CaptureId) -> &'q str {
        self.query.capture_name(id)
    }

    /// Every node bound to the named capture, in source order.
    pub fn nodes_for<'a>(&'a self, name: &str) -> impl Iterator<Item = Node<'t>> + 'a {
        let id = self.query.capture_index(name);
        self.captures
            .iter()
            .filter(move |(cap, _)| Some(*cap) == id)
            .map(|(_, node)| *node)
    }

    /// The first node bound to the named capture.
    pub fn node_for(&self, name: &str) -> Option<Node<'t>> {
        self.nodes_for(name).next()
    }

    /// The pattern's `tag` property, if a `#set!` directive declared one.
    pub fn tag(&self) -> Option<&'q str> {
        self.property("tag")
    }

    pub fn property(&self, key: &str) -> Option<&'q str> {
        self.query.patterns()[self.pattern_index].property(key)
    }
}
