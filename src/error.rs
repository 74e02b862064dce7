//! Error types for query compilation and predicate evaluation.
//!
//! A `CompileError` is fatal to the pattern set that produced it and carries
//! the byte offset plus line/column of the offending token. A
//! `PredicateError` is localized to a single top-level pattern at match time;
//! the cursor disables that pattern for the rest of the query run and keeps
//! matching the others.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileError {
    pub kind: CompileErrorKind,
    /// Byte offset into the query source.
    pub offset: usize,
    /// 1-indexed line number.
    pub line: usize,
    /// 0-indexed column (byte offset within the line).
    pub column: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompileErrorKind {
    Syntax(String),
    UnknownKind(String),
    UnknownField(String),
    UnknownPredicate(String),
    ArityMismatch {
        predicate: String,
        expected: String,
        got: usize,
    },
    UndeclaredCapture(String),
    InvalidDirective(String),
}

impl CompileError {
    /// Build an error at `offset`, deriving line/column from `source`.
    pub fn new(kind: CompileErrorKind, offset: usize, source: &str) -> Self {
        let (line, column) = position(source, offset);
        Self {
            kind,
            offset,
            line,
            column,
        }
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: ", self.line, self.column)?;
        match &self.kind {
            CompileErrorKind::Syntax(msg) => write!(f, "syntax error: {msg}"),
            CompileErrorKind::UnknownKind(name) => {
                write!(f, "unknown node kind `{name}`")
            }
            CompileErrorKind::UnknownField(name) => {
                write!(f, "unknown field `{name}`")
            }
            CompileErrorKind::UnknownPredicate(name) => {
                write!(f, "unknown predicate `#{name}`")
            }
            CompileErrorKind::ArityMismatch {
                predicate,
                expected,
                got,
            } => write!(
                f,
                "predicate `#{predicate}` expects {expected} argument(s), got {got}"
            ),
            CompileErrorKind::UndeclaredCapture(name) => write!(
                f,
                "capture `@{name}` is not declared earlier in this pattern"
            ),
            CompileErrorKind::InvalidDirective(msg) => {
                write!(f, "invalid directive: {msg}")
            }
        }
    }
}

impl std::error::Error for CompileError {}

/// A predicate evaluation failure (e.g. a malformed regex literal).
///
/// Reported once per offending pattern; the pattern produces no further
/// matches for the remainder of the query run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PredicateError {
    pub pattern_index: usize,
    pub predicate: String,
    pub message: String,
}

impl fmt::Display for PredicateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "pattern {}: `#{}`: {}",
            self.pattern_index, self.predicate, self.message
        )
    }
}

impl std::error::Error for PredicateError {}

/// Compute (1-indexed line, 0-indexed byte column) for a byte offset.
fn position(source: &str, offset: usize) -> (usize, usize) {
    let offset = offset.min(source.len());
    let before = &source.as_bytes()[..offset];
    let line = before.iter().filter(|&&b| b == b'\n').count() + 1;
    let column = before
        .iter()
        .rposition(|&b| b == b'\n')
        .map(|nl| offset - nl - 1)
        .unwrap_or(offset);
    (line, column)
}
