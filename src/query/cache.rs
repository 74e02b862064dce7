//! Process-wide cache of compiled queries.
//!
//! Keyed by (grammar name, SHA-256 of the query source); compilation happens
//! outside the locks, so concurrent readers either see a fully published
//! `Arc<Query>` or compile their own copy and race to publish it — the first
//! insert wins and later compiles of the same source are dropped.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use sha2::{Digest, Sha256};

use crate::error::CompileError;
use crate::grammar::Grammar;
use crate::query::parser::Query;

pub struct QueryCache {
    entries: RwLock<HashMap<(String, String), Arc<Query>>>,
}

impl QueryCache {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn get_or_compile(
        &self,
        grammar: &Arc<Grammar>,
        source: &str,
    ) -> Result<Arc<Query>, CompileError> {
        let key = (grammar.name().to_string(), content_hash(source));

        if let Ok(entries) = self.entries.read() {
            if let Some(query) = entries.get(&key) {
                return Ok(Arc::clone(query));
            }
        }

        let query = Arc::new(Query::new(source, grammar)?);
        match self.entries.write() {
            Ok(mut entries) => Ok(Arc::clone(
                entries.entry(key).or_insert_with(|| Arc::clone(&query)),
            )),
            // A poisoned lock only costs us the cache, not correctness.
            Err(_) => Ok(query),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.write() {
            entries.clear();
        }
    }
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new()
    }
}

/// SHA-256 of query source text, hex encoded.
fn content_hash(source: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source.as_bytes());
    format!("{:x}", hasher.finalize())
}
