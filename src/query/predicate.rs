//! Predicate registry and built-in predicates.
//!
//! Predicates are pure functions over the captures of a structurally matched
//! pattern; a `false` result discards the match. `#set!` is a directive, not
//! a filter: the parser folds it into pattern properties and it never runs at
//! match time. Names are resolved eagerly at compile time, so an unknown
//! predicate is a `CompileError` rather than a silent no-op.

use std::cell::RefCell;
use std::collections::HashMap;

use regex::Regex;

use crate::query::parser::{CaptureId, PredicateArg};
use crate::tree::Node;

/// A filter predicate. `Err` poisons the owning pattern for the rest of the
/// query run; it is reserved for evaluation failures like a malformed regex,
/// not for ordinary rejection.
pub type PredicateFn =
    fn(&[PredicateArg], &MatchContext<'_, '_>) -> Result<bool, String>;

#[derive(Clone, Copy)]
pub enum PredicateKind {
    Filter(PredicateFn),
    Directive,
}

#[derive(Clone, Copy)]
pub struct PredicateEntry {
    pub kind: PredicateKind,
    pub min_args: usize,
    pub max_args: Option<usize>,
    /// Whether the first argument must be a capture reference.
    pub capture_first: bool,
}

impl PredicateEntry {
    pub fn filter(
        func: PredicateFn,
        min_args: usize,
        max_args: Option<usize>,
        capture_first: bool,
    ) -> Self {
        Self {
            kind: PredicateKind::Filter(func),
            min_args,
            max_args,
            capture_first,
        }
    }

    /// Human-readable arity for error messages.
    pub fn arity(&self) -> String {
        match self.max_args {
            Some(max) if max == self.min_args => max.to_string(),
            Some(max) => format!("{}..{}", self.min_args, max),
            None => format!("at least {}", self.min_args),
        }
    }
}

pub struct PredicateRegistry {
    entries: HashMap<String, PredicateEntry>,
}

impl PredicateRegistry {
    pub fn empty() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    pub fn register(&mut self, name: &str, entry: PredicateEntry) {
        self.entries.insert(name.to_string(), entry);
    }

    pub fn get(&self, name: &str) -> Option<&PredicateEntry> {
        self.entries.get(name)
    }
}

impl Default for PredicateRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register("eq?", PredicateEntry::filter(pred_eq, 2, Some(2), true));
        registry.register("not-eq?", PredicateEntry::filter(pred_not_eq, 2, Some(2), true));
        registry.register("match?", PredicateEntry::filter(pred_match, 2, Some(2), true));
        registry.register(
            "not-match?",
            PredicateEntry::filter(pred_not_match, 2, Some(2), true),
        );
        registry.register("any-of?", PredicateEntry::filter(pred_any_of, 2, None, true));
        registry.register(
            "set!",
            PredicateEntry {
                kind: PredicateKind::Directive,
                min_args: 1,
                max_args: Some(2),
                capture_first: false,
            },
        );
        registry
    }
}

/// Capture bindings of one structural match, as seen by predicates.
pub struct MatchContext<'m, 't> {
    captures: &'m [(CaptureId, Node<'t>)],
    regexes: &'m RegexCache,
}

impl<'m, 't> MatchContext<'m, 't> {
    pub fn new(captures: &'m [(CaptureId, Node<'t>)], regexes: &'m RegexCache) -> Self {
        Self { captures, regexes }
    }

    /// Text of the first node bound to a capture, if any.
    pub fn first_text(&self, cap: CaptureId) -> Option<&'t str> {
        self.texts(cap).next()
    }

    /// Texts of every node bound to a capture, in source order.
    pub fn texts(&self, cap: CaptureId) -> impl Iterator<Item = &'t str> + '_ {
        self.captures
            .iter()
            .filter(move |(id, _)| *id == cap)
            .map(|(_, node)| node.text())
    }

    /// Resolve an argument to text: a literal's value, or the first node
    /// bound to a capture. `None` when the capture is unbound.
    pub fn arg_text<'a>(&'a self, arg: &'a PredicateArg) -> Option<&'a str> {
        match arg {
            PredicateArg::Capture(cap) => self.first_text(*cap),
            PredicateArg::Literal(lit) => Some(lit),
        }
    }

    pub fn regex(&self, pattern: &str) -> Result<Regex, String> {
        self.regexes.get(pattern)
    }
}

/// Compiled-regex cache shared across one cursor's lifetime. Compilation
/// failures are cached too, so a bad literal is reported once and never
/// recompiled.
pub struct RegexCache {
    map: RefCell<HashMap<String, Result<Regex, String>>>,
}

impl RegexCache {
    pub fn new() -> Self {
        Self {
            map: RefCell::new(HashMap::new()),
        }
    }

    pub fn get(&self, pattern: &str) -> Result<Regex, String> {
        if let Some(cached) = self.map.borrow().get(pattern) {
            return cached.clone();
        }
        let compiled = Regex::new(pattern).map_err(|e| e.to_string());
        self.map
            .borrow_mut()
            .insert(pattern.to_string(), compiled.clone());
        compiled
    }
}

impl Default for RegexCache {
    fn default() -> Self {
        Self::new()
    }
}

// Predicates referencing an unbound capture evaluate to false: a match that
// never bound the capture cannot satisfy a condition on its text.

fn pred_eq(args: &[PredicateArg], ctx: &MatchContext<'_, '_>) -> Result<bool, String> {
    let (Some(left), Some(right)) = (ctx.arg_text(&args[0]), ctx.arg_text(&args[1])) else {
        return Ok(false);
    };
    Ok(left == right)
}

fn pred_not_eq(args: &[PredicateArg], ctx: &MatchContext<'_, '_>) -> Result<bool, String> {
    let (Some(left), Some(right)) = (ctx.arg_text(&args[0]), ctx.arg_text(&args[1])) else {
        return Ok(false);
    };
    Ok(left != right)
}

fn pred_match(args: &[PredicateArg], ctx: &MatchContext<'_, '_>) -> Result<bool, String> {
    let PredicateArg::Capture(cap) = args[0] else {
        return Err("first argument must be a capture".to_string());
    };
    let Some(pattern) = ctx.arg_text(&args[1]) else {
        return Ok(false);
    };
    let regex = ctx.regex(pattern)?;
    let mut texts = ctx.texts(cap).peekable();
    if texts.peek().is_none() {
        return Ok(false);
    }
    Ok(texts.all(|text| regex.is_match(text)))
}

fn pred_not_match(args: &[PredicateArg], ctx: &MatchContext<'_, '_>) -> Result<bool, String> {
    let PredicateArg::Capture(cap) = args[0] else {
        return Err("first argument must be a capture".to_string());
    };
    let Some(pattern) = ctx.arg_text(&args[1]) else {
        return Ok(false);
    };
    let regex = ctx.regex(pattern)?;
    let mut texts = ctx.texts(cap).peekable();
    if texts.peek().is_none() {
        return Ok(false);
    }
    Ok(texts.all(|text| !regex.is_match(text)))
}

fn pred_any_of(args: &[PredicateArg], ctx: &MatchContext<'_, '_>) -> Result<bool, String> {
    let Some(text) = ctx.arg_text(&args[0]) else {
        return Ok(false);
    };
    Ok(args[1..]
        .iter()
        .filter_map(|arg| ctx.arg_text(arg))
        .any(|candidate| candidate == text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::source_tree;

    fn ctx_with<'m, 't>(
        captures: &'m [(CaptureId, Node<'t>)],
        regexes: &'m RegexCache,
    ) -> MatchContext<'m, 't> {
        MatchContext::new(captures, regexes)
    }

    fn lit(s: &str) -> PredicateArg {
        PredicateArg::Literal(s.to_string())
    }

    #[test]
    fn eq_compares_first_binding_to_literal() {
        let tree = source_tree();
        // Bind capture 0 to the root; its text is the whole source.
        let caps = vec![(0, tree.root())];
        let regexes = RegexCache::new();
        let ctx = ctx_with(&caps, &regexes);
        let args = [PredicateArg::Capture(0), lit(tree.root().text())];
        assert_eq!(pred_eq(&args, &ctx), Ok(true));
        assert_eq!(pred_not_eq(&args, &ctx), Ok(false));
    }

    #[test]
    fn eq_with_unbound_capture_is_false() {
        let caps: Vec<(CaptureId, Node<'_>)> = Vec::new();
        let regexes = RegexCache::new();
        let ctx = ctx_with(&caps, &regexes);
        let args = [PredicateArg::Capture(7), lit("x")];
        assert_eq!(pred_eq(&args, &ctx), Ok(false));
        assert_eq!(pred_not_eq(&args, &ctx), Ok(false));
    }

    #[test]
    fn match_requires_all_bindings_to_match() {
        let tree = source_tree();
        let root = tree.root();
        let caps = vec![(0, root), (0, root)];
        let regexes = RegexCache::new();
        let ctx = ctx_with(&caps, &regexes);
        assert_eq!(
            pred_match(&[PredicateArg::Capture(0), lit("using")], &ctx),
            Ok(true)
        );
        assert_eq!(
            pred_match(&[PredicateArg::Capture(0), lit("^zzz$")], &ctx),
            Ok(false)
        );
        assert_eq!(
            pred_not_match(&[PredicateArg::Capture(0), lit("^zzz$")], &ctx),
            Ok(true)
        );
    }

    #[test]
    fn match_with_unbound_capture_is_false() {
        let caps: Vec<(CaptureId, Node<'_>)> = Vec::new();
        let regexes = RegexCache::new();
        let ctx = ctx_with(&caps, &regexes);
        assert_eq!(
            pred_match(&[PredicateArg::Capture(0), lit(".*")], &ctx),
            Ok(false)
        );
    }

    #[test]
    fn malformed_regex_is_an_evaluation_error() {
        let tree = source_tree();
        let caps = vec![(0, tree.root())];
        let regexes = RegexCache::new();
        let ctx = ctx_with(&caps, &regexes);
        assert!(pred_match(&[PredicateArg::Capture(0), lit("(unclosed")], &ctx).is_err());
    }

    #[test]
    fn any_of_checks_membership() {
        let tree = source_tree();
        let caps = vec![(0, tree.root())];
        let regexes = RegexCache::new();
        let ctx = ctx_with(&caps, &regexes);
        let root_text = tree.root().text().to_string();
        assert_eq!(
            pred_any_of(
                &[PredicateArg::Capture(0), lit("nope"), lit(&root_text)],
                &ctx
            ),
            Ok(true)
        );
        assert_eq!(
            pred_any_of(&[PredicateArg::Capture(0), lit("nope")], &ctx),
            Ok(false)
        );
    }

    #[test]
    fn regex_cache_caches_failures() {
        let cache = RegexCache::new();
        let first = cache.get("(bad");
        let second = cache.get("(bad");
        assert!(first.is_err());
        assert_eq!(first.err(), second.err());
        assert!(cache.get("^ok$").is_ok());
    }

    #[test]
    fn default_registry_has_builtins() {
        let registry = PredicateRegistry::default();
        for name in ["eq?", "not-eq?", "match?", "not-match?", "any-of?", "set!"] {
            assert!(registry.get(name).is_some(), "missing {name}");
        }
        assert!(registry.get("frobnicate?").is_none());
        assert_eq!(registry.get("match?").map(|e| e.arity()).as_deref(), Some("2"));
        assert_eq!(
            registry.get("any-of?").map(|e| e.arity()).as_deref(),
            Some("at least 2")
        );
    }
}
