//! Query compilation and execution.
//!
//! `Query::new` compiles an S-expression pattern set against a `Grammar`;
//! `QueryCursor::matches` runs it over a tree. `QueryCache` memoizes compiled
//! queries process-wide.

pub mod cache;
pub mod cursor;
pub mod lexer;
pub mod matcher;
pub mod parser;
pub mod predicate;

pub use cache::QueryCache;
pub use cursor::{Matches, QueryCursor, QueryMatch};
pub use parser::{CaptureId, PredicateArg, Quantifier, Query};
pub use predicate::{MatchContext, PredicateEntry, PredicateFn, PredicateRegistry, RegexCache};
