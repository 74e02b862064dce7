//! Grammar kind table — interned node-kind and field names for one language.
//!
//! Patterns are resolved against a `Grammar` at compile time so that an
//! unknown kind or field is a `CompileError`, not a silent runtime no-match
//! (unknown names indicate a pattern/grammar version mismatch). A grammar can
//! be declared in code or loaded from a tree-sitter style `node-types.json`.

use std::collections::HashMap;

use serde::Deserialize;

pub type KindId = u16;
pub type FieldId = u16;

#[derive(Debug)]
pub struct Grammar {
    name: String,
    kinds: Vec<KindEntry>,
    kind_index: HashMap<String, KindId>,
    fields: Vec<String>,
    field_index: HashMap<String, FieldId>,
}

#[derive(Debug)]
struct KindEntry {
    name: String,
    named: bool,
}

impl Grammar {
    /// Build a grammar from explicit kind and field lists.
    ///
    /// `named_kinds` are the grammar's named node kinds; `anonymous_kinds`
    /// are literal tokens (punctuation, keywords) matched by string patterns.
    pub fn new(
        name: &str,
        named_kinds: &[&str],
        anonymous_kinds: &[&str],
        fields: &[&str],
    ) -> Self {
        let mut grammar = Self {
            name: name.to_string(),
            kinds: Vec::new(),
            kind_index: HashMap::new(),
            fields: Vec::new(),
            field_index: HashMap::new(),
        };
        for kind in named_kinds {
            grammar.add_kind(kind, true);
        }
        for kind in anonymous_kinds {
            grammar.add_kind(kind, false);
        }
        for field in fields {
            grammar.add_field(field);
        }
        grammar
    }

    /// Load a grammar from the contents of a `node-types.json` file.
    ///
    /// Field names are collected as the union of every node type's fields.
    pub fn from_node_types(name: &str, json: &str) -> Result<Self, serde_json::Error> {
        let node_types: Vec<NodeType> = serde_json::from_str(json)?;
        let mut grammar = Self {
            name: name.to_string(),
            kinds: Vec::new(),
            kind_index: HashMap::new(),
            fields: Vec::new(),
            field_index: HashMap::new(),
        };
        for node_type in &node_types {
            grammar.add_kind(&node_type.kind, node_type.named);
            for field in node_type.fields.keys() {
                grammar.add_field(field);
            }
        }
        Ok(grammar)
    }

    fn add_kind(&mut self, name: &str, named: bool) {
        if self.kind_index.contains_key(name) {
            return;
        }
        let id = self.kinds.len() as KindId;
        self.kinds.push(KindEntry {
            name: name.to_string(),
            named,
        });
        self.kind_index.insert(name.to_string(), id);
    }

    fn add_field(&mut self, name: &str) {
        if self.field_index.contains_key(name) {
            return;
        }
        let id = self.fields.len() as FieldId;
        self.fields.push(name.to_string());
        self.field_index.insert(name.to_string(), id);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind_id(&self, name: &str) -> Option<KindId> {
        self.kind_index.get(name).copied()
    }

    pub fn kind_name(&self, id: KindId) -> &str {
        &self.kinds[id as usize].name
    }

    pub fn kind_is_named(&self, id: KindId) -> bool {
        self.kinds[id as usize].named
    }

    pub fn field_id(&self, name: &str) -> Option<FieldId> {
        self.field_index.get(name).copied()
    }

    pub fn field_name(&self, id: FieldId) -> &str {
        &self.fields[id as usize]
    }

    pub fn kind_count(&self) -> usize {
        self.kinds.len()
    }
}

/// One entry of a `node-types.json` array. Children and subtype listings are
/// not needed for query compilation and are ignored.
#[derive(Deserialize)]
struct NodeType {
    #[serde(rename = "type")]
    kind: String,
    named: bool,
    #[serde(default)]
    fields: HashMap<String, serde_json::Value>,
}
