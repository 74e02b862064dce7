//! Arena-backed concrete syntax tree consumed by the query engine.
//!
//! The engine does not parse source text; an external parser populates a
//! `SyntaxTree` through `TreeBuilder` (or the serde `TreeFile` form used by
//! the CLI). Nodes are immutable for the lifetime of the tree, carry a kind
//! from the tree's `Grammar`, an optional field name under their parent, an
//! ordered child list, and a byte range into the source text.

use std::fmt;
use std::ops::Range;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::grammar::{FieldId, Grammar, KindId};

pub struct SyntaxTree {
    grammar: Arc<Grammar>,
    source: String,
    nodes: Vec<NodeData>,
}

struct NodeData {
    kind: KindId,
    named: bool,
    field: Option<FieldId>,
    parent: Option<u32>,
    index_in_parent: u32,
    children: Vec<u32>,
    start: usize,
    end: usize,
}

impl SyntaxTree {
    pub fn root(&self) -> Node<'_> {
        Node { tree: self, id: 0 }
    }

    pub fn grammar(&self) -> &Arc<Grammar> {
        &self.grammar
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    fn data(&self, id: u32) -> &NodeData {
        &self.nodes[id as usize]
    }
}

/// A lightweight handle to one node; copying is free.
#[derive(Clone, Copy)]
pub struct Node<'t> {
    tree: &'t SyntaxTree,
    id: u32,
}

impl<'t> Node<'t> {
    pub fn kind_id(&self) -> KindId {
        self.tree.data(self.id).kind
    }

    pub fn kind(&self) -> &'t str {
        self.tree.grammar.kind_name(self.tree.data(self.id).kind)
    }

    pub fn is_named(&self) -> bool {
        self.tree.data(self.id).named
    }

    /// The field this node occupies under its parent, if any.
    pub fn field_id(&self) -> Option<FieldId> {
        self.tree.data(self.id).field
    }

    pub fn field_name(&self) -> Option<&'t str> {
        self.tree
            .data(self.id)
            .field
            .map(|f| self.tree.grammar.field_name(f))
    }

    pub fn parent(&self) -> Option<Node<'t>> {
        self.tree.data(self.id).parent.map(|id| Node {
            tree: self.tree,
            id,
        })
    }

    /// Position of this node in its parent's child list (0 for the root).
    pub fn index_in_parent(&self) -> usize {
        self.tree.data(self.id).index_in_parent as usize
    }

    pub fn child_count(&self) -> usize {
        self.tree.data(self.id).children.len()
    }

    pub fn child(&self, i: usize) -> Option<Node<'t>> {
        self.tree
            .data(self.id)
            .children
            .get(i)
            .map(|&id| Node {
                tree: self.tree,
                id,
            })
    }

    pub fn children(&self) -> Children<'t> {
        Children {
            tree: self.tree,
            ids: &self.tree.data(self.id).children,
            next: 0,
        }
    }

    /// First child attached under the given field id.
    pub fn child_by_field_id(&self, field: FieldId) -> Option<Node<'t>> {
        self.children().find(|c| c.field_id() == Some(field))
    }

    pub fn child_by_field(&self, name: &str) -> Option<Node<'t>> {
        let field = self.tree.grammar.field_id(name)?;
        self.child_by_field_id(field)
    }

    pub fn byte_range(&self) -> Range<usize> {
        let data = self.tree.data(self.id);
        data.start..data.end
    }

    pub fn text(&self) -> &'t str {
        let data = self.tree.data(self.id);
        &self.tree.source[data.start..data.end]
    }

    /// Stable id within this tree (pre-order creation index).
    pub fn id(&self) -> usize {
        self.id as usize
    }

    pub fn grammar(&self) -> &'t Grammar {
        &self.tree.grammar
    }

    /// Render this subtree as an s-expression of named nodes, for debugging
    /// and CLI output.
    pub fn to_sexp(&self) -> String {
        let mut out = String::new();
        self.write_sexp(&mut out);
        out
    }

    fn write_sexp(&self, out: &mut String) {
        if !self.is_named() {
            out.push('"');
            out.push_str(self.kind());
            out.push('"');
            return;
        }
        if let Some(field) = self.field_name() {
            out.push_str(field);
            out.push_str(": ");
        }
        out.push('(');
        out.push_str(self.kind());
        for child in self.children() {
            out.push(' ');
            child.write_sexp(out);
        }
        out.push(')');
    }
}

impl PartialEq for Node<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.tree, other.tree) && self.id == other.id
    }
}

impl Eq for Node<'_> {}

impl fmt::Debug for Node<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{:?}", self.kind(), self.byte_range())
    }
}

pub struct Children<'t> {
    tree: &'t SyntaxTree,
    ids: &'t [u32],
    next: usize,
}

impl<'t> Iterator for Children<'t> {
    type Item = Node<'t>;

    fn next(&mut self) -> Option<Node<'t>> {
        let id = *self.ids.get(self.next)?;
        self.next += 1;
        Some(Node {
            tree: self.tree,
            id,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.ids.len() - self.next;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Children<'_> {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    UnknownKind(String),
    UnknownField(String),
    /// `close` without a matching `open`, or `finish` with open nodes left.
    Unbalanced,
    /// A second root was opened at the top level.
    MultipleRoots,
    /// `finish` called before any node was opened.
    Empty,
    /// Token byte range exceeds the source text.
    RangeOutOfBounds(usize, usize),
    /// A leaf in a `TreeFile` is missing its byte range.
    MissingRange(String),
}

impl fmt::Display for TreeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TreeError::UnknownKind(name) => write!(f, "unknown node kind `{name}`"),
            TreeError::UnknownField(name) => write!(f, "unknown field `{name}`"),
            TreeError::Unbalanced => write!(f, "unbalanced open/close calls"),
            TreeError::MultipleRoots => write!(f, "tree must have exactly one root"),
            TreeError::Empty => write!(f, "tree has no root node"),
            TreeError::RangeOutOfBounds(start, end) => {
                write!(f, "token range {start}..{end} exceeds source length")
            }
            TreeError::MissingRange(kind) => {
                write!(f, "leaf node `{kind}` is missing a byte range")
            }
        }
    }
}

impl std::error::Error for TreeError {}

/// Incremental builder used by parser front-ends.
///
/// Call `open`/`close` around interior nodes and `token` for leaves; interior
/// byte ranges are derived from their children on `close`.
pub struct TreeBuilder {
    grammar: Arc<Grammar>,
    source: String,
    nodes: Vec<NodeData>,
    stack: Vec<u32>,
}

impl TreeBuilder {
    pub fn new(grammar: Arc<Grammar>, source: impl Into<String>) -> Self {
        Self {
            grammar,
            source: source.into(),
            nodes: Vec::new(),
            stack: Vec::new(),
        }
    }

    /// Open an interior node. `field` is its field name under the parent.
    pub fn open(&mut self, kind: &str, field: Option<&str>) -> Result<(), TreeError> {
        let id = self.push_node(kind, field, true, 0..0)?;
        self.stack.push(id);
        Ok(())
    }

    /// Add a leaf token spanning `range` of the source.
    pub fn token(
        &mut self,
        kind: &str,
        field: Option<&str>,
        range: Range<usize>,
    ) -> Result<(), TreeError> {
        if range.end > self.source.len() {
            return Err(TreeError::RangeOutOfBounds(range.start, range.end));
        }
        self.push_node(kind, field, false, range)?;
        Ok(())
    }

    /// Close the most recently opened node, deriving its span from children.
    pub fn close(&mut self) -> Result<(), TreeError> {
        let id = self.stack.pop().ok_or(TreeError::Unbalanced)?;
        let children = self.nodes[id as usize].children.clone();
        if let (Some(&first), Some(&last)) = (children.first(), children.last()) {
            self.nodes[id as usize].start = self.nodes[first as usize].start;
            self.nodes[id as usize].end = self.nodes[last as usize].end;
        }
        Ok(())
    }

    pub fn finish(self) -> Result<SyntaxTree, TreeError> {
        if !self.stack.is_empty() {
            return Err(TreeError::Unbalanced);
        }
        if self.nodes.is_empty() {
            return Err(TreeError::Empty);
        }
        Ok(SyntaxTree {
            grammar: self.grammar,
            source: self.source,
            nodes: self.nodes,
        })
    }

    fn push_node(
        &mut self,
        kind: &str,
        field: Option<&str>,
        interior: bool,
        range: Range<usize>,
    ) -> Result<u32, TreeError> {
        let kind_id = self
            .grammar
            .kind_id(kind)
            .ok_or_else(|| TreeError::UnknownKind(kind.to_string()))?;
        let field_id = match field {
            Some(name) => Some(
                self.grammar
                    .field_id(name)
                    .ok_or_else(|| TreeError::UnknownField(name.to_string()))?,
            ),
            None => None,
        };
        if self.stack.is_empty() && !self.nodes.is_empty() {
            return Err(TreeError::MultipleRoots);
        }
        let id = self.nodes.len() as u32;
        let parent = self.stack.last().copied();
        let index_in_parent = match parent {
            Some(p) => {
                let index = self.nodes[p as usize].children.len() as u32;
                self.nodes[p as usize].children.push(id);
                index
            }
            None => 0,
        };
        // Anonymous tokens keep their grammar flag; interior nodes are named.
        let named = interior || self.grammar.kind_is_named(kind_id);
        self.nodes.push(NodeData {
            kind: kind_id,
            named,
            field: field_id,
            parent,
            index_in_parent,
            children: Vec::new(),
            start: range.start,
            end: range.end,
        });
        Ok(id)
    }
}

/// Serde form of a tree, used by the CLI to load parser output from JSON.
#[derive(Debug, Serialize, Deserialize)]
pub struct TreeFile {
    /// Grammar name this tree was parsed with (informational).
    pub grammar: String,
    pub source: String,
    pub root: TreeFileNode,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TreeFileNode {
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    /// Byte range; required on leaves, ignored on interior nodes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<(usize, usize)>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TreeFileNode>,
}

impl TreeFile {
    pub fn build(&self, grammar: Arc<Grammar>) -> Result<SyntaxTree, TreeError> {
        let mut builder = TreeBuilder::new(grammar, self.source.clone());
        build_node(&mut builder, &self.root)?;
        builder.finish()
    }
}

fn build_node(builder: &mut TreeBuilder, node: &TreeFileNode) -> Result<(), TreeError> {
    let field = node.field.as_deref();
    if node.children.is_empty() {
        let (start, end) = node
            .range
            .ok_or_else(|| TreeError::MissingRange(node.kind.clone()))?;
        builder.token(&node.kind, field, start..end)
    } else {
        builder.open(&node.kind, field)?;
        for child in &node.children {
            build_node(builder, child)?;
        }
        builder.close()
    }
}
