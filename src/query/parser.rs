//! Query DSL parser.
//!
//! Turns a token stream into a validated `Query`: an ordered list of
//! top-level patterns with interned capture names. All names are resolved at
//! compile time — node kinds and fields against the `Grammar`, predicate
//! names against the `PredicateRegistry` — so a compiled query can never hit
//! an unknown name during matching.

use std::collections::HashSet;
use std::sync::Arc;

use crate::error::{CompileError, CompileErrorKind};
use crate::grammar::{FieldId, Grammar, KindId};
use crate::query::lexer::{Lexer, Spanned, Token};
use crate::query::matcher::{compile_sequence, SeqInst};
use crate::query::predicate::{PredicateFn, PredicateKind, PredicateRegistry};

pub type CaptureId = u16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quantifier {
    One,
    ZeroOrOne,
    ZeroOrMore,
    OneOrMore,
}

/// One slot in a sibling sequence: a node to match plus its positional
/// constraints.
#[derive(Debug, Clone)]
pub(crate) struct PatternChild {
    pub(crate) field: Option<FieldId>,
    pub(crate) anchor_before: bool,
    pub(crate) quantifier: Quantifier,
    pub(crate) node: PatternNode,
}

#[derive(Debug, Clone)]
pub(crate) struct PatternNode {
    pub(crate) matcher: NodeMatcher,
    pub(crate) children: Vec<PatternChild>,
    /// Compiled sibling-sequence program for `children`.
    pub(crate) seq: Vec<SeqInst>,
    pub(crate) negated_fields: Vec<FieldId>,
    pub(crate) anchor_last: bool,
    pub(crate) captures: Vec<CaptureId>,
}

impl PatternNode {
    fn leaf(matcher: NodeMatcher) -> Self {
        Self {
            matcher,
            children: Vec::new(),
            seq: Vec::new(),
            negated_fields: Vec::new(),
            anchor_last: false,
            captures: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) enum NodeMatcher {
    /// A named node of this kind.
    Kind(KindId),
    /// `(_)` — any named node.
    NamedWildcard,
    /// `_` — any node at all.
    AnyWildcard,
    /// An anonymous token, written as a string literal.
    Token(KindId),
    /// `[...]` — ordered choice, first branch that matches wins.
    Alternation(Vec<PatternNode>),
    /// `(...)` around a sibling sequence.
    Group,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PredicateArg {
    Capture(CaptureId),
    Literal(String),
}

/// A filter predicate application, resolved against the registry.
#[derive(Debug, Clone)]
pub(crate) struct PredicateApp {
    pub(crate) name: String,
    pub(crate) args: Vec<PredicateArg>,
    pub(crate) func: PredicateFn,
}

#[derive(Debug, Clone)]
pub(crate) struct Pattern {
    pub(crate) root: PatternChild,
    pub(crate) predicates: Vec<PredicateApp>,
    pub(crate) properties: Vec<(String, String)>,
}

impl Pattern {
    pub(crate) fn property(&self, key: &str) -> Option<&str> {
        self.properties
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// A compiled, immutable set of patterns for one grammar.
#[derive(Debug)]
pub struct Query {
    patterns: Vec<Pattern>,
    capture_names: Vec<String>,
    grammar: Arc<Grammar>,
}

impl Query {
    /// Compile with the built-in predicate registry.
    pub fn new(source: &str, grammar: &Arc<Grammar>) -> Result<Self, CompileError> {
        Self::with_registry(source, grammar, &PredicateRegistry::default())
    }

    pub fn with_registry(
        source: &str,
        grammar: &Arc<Grammar>,
        registry: &PredicateRegistry,
    ) -> Result<Self, CompileError> {
        let tokens = Lexer::new(source).tokenize()?;
        let parser = Parser {
            source,
            tokens,
            pos: 0,
            grammar,
            registry,
            capture_names: Vec::new(),
        };
        let (patterns, capture_names) = parser.parse()?;
        Ok(Self {
            patterns,
            capture_names,
            grammar: Arc::clone(grammar),
        })
    }

    pub fn pattern_count(&self) -> usize {
        self.patterns.len()
    }

    pub(crate) fn patterns(&self) -> &[Pattern] {
        &self.patterns
    }

    pub fn capture_names(&self) -> &[String] {
        &self.capture_names
    }

    pub fn capture_index(&self, name: &str) -> Option<CaptureId> {
        self.capture_names
            .iter()
            .position(|n| n == name)
            .map(|i| i as CaptureId)
    }

    pub fn capture_name(&self, id: CaptureId) -> &str {
        &self.capture_names[id as usize]
    }

    /// The `tag` property of a pattern, if a `#set!` directive declared one.
    pub fn pattern_tag(&self, index: usize) -> Option<&str> {
        self.patterns.get(index)?.property("tag")
    }

    pub fn grammar(&self) -> &Arc<Grammar> {
        &self.grammar
    }
}

#[derive(Default)]
struct PatternState {
    declared: HashSet<CaptureId>,
    predicates: Vec<PredicateApp>,
    properties: Vec<(String, String)>,
}

enum ParsedPredicate {
    Filter(PredicateApp),
    Directive(String, String),
}

struct Parser<'a> {
    source: &'a str,
    tokens: Vec<Spanned>,
    pos: usize,
    grammar: &'a Grammar,
    registry: &'a PredicateRegistry,
    capture_names: Vec<String>,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|s| &s.token)
    }

    fn peek2(&self) -> Option<&Token> {
        self.tokens.get(self.pos + 1).map(|s| &s.token)
    }

    /// Offset of the current token, or end of input.
    fn offset(&self) -> usize {
        self.tokens
            .get(self.pos)
            .map(|s| s.offset)
            .unwrap_or(self.source.len())
    }

    fn advance(&mut self) -> Option<Spanned> {
        let sp = self.tokens.get(self.pos).cloned()?;
        self.pos += 1;
        Some(sp)
    }

    fn err(&self, kind: CompileErrorKind, offset: usize) -> CompileError {
        CompileError::new(kind, offset, self.source)
    }

    fn syntax(&self, msg: impl Into<String>, offset: usize) -> CompileError {
        self.err(CompileErrorKind::Syntax(msg.into()), offset)
    }

    fn intern_capture(&mut self, name: &str) -> CaptureId {
        if let Some(i) = self.capture_names.iter().position(|n| n == name) {
            return i as CaptureId;
        }
        self.capture_names.push(name.to_string());
        (self.capture_names.len() - 1) as CaptureId
    }

    fn at_predicate_form(&self) -> bool {
        matches!(self.peek(), Some(Token::LParen))
            && matches!(self.peek2(), Some(Token::Predicate(_)))
    }

    fn parse(mut self) -> Result<(Vec<Pattern>, Vec<String>), CompileError> {
        let mut patterns: Vec<Pattern> = Vec::new();
        let mut last_declared: HashSet<CaptureId> = HashSet::new();

        while self.peek().is_some() {
            if self.at_predicate_form() {
                // A trailing predicate form applies to the preceding pattern.
                let offset = self.offset();
                if patterns.is_empty() {
                    return Err(self.syntax("predicate must follow a pattern", offset));
                }
                let parsed = self.parse_predicate_form(&last_declared)?;
                if let Some(last) = patterns.last_mut() {
                    match parsed {
                        ParsedPredicate::Filter(app) => last.predicates.push(app),
                        ParsedPredicate::Directive(key, value) => {
                            last.properties.push((key, value));
                        }
                    }
                }
            } else {
                if matches!(self.peek(), Some(Token::Anchor)) {
                    let offset = self.offset();
                    return Err(self.syntax("anchor is only allowed inside a pattern", offset));
                }
                let mut state = PatternState::default();
                let root = self.parse_child(&mut state, false, None)?;
                last_declared = state.declared;
                patterns.push(Pattern {
                    root,
                    predicates: state.predicates,
                    properties: state.properties,
                });
            }
        }

        Ok((patterns, self.capture_names))
    }

    /// Parse one node along with its suffixes (quantifier, captures).
    fn parse_child(
        &mut self,
        state: &mut PatternState,
        anchor_before: bool,
        field: Option<FieldId>,
    ) -> Result<PatternChild, CompileError> {
        let mut node = self.parse_primary(state)?;
        let mut quantifier = Quantifier::One;
        let mut saw_quantifier = false;
        let mut saw_capture = false;

        loop {
            match self.peek() {
                Some(Token::Star | Token::Plus | Token::Question) => {
                    let offset = self.offset();
                    if saw_capture {
                        return Err(self.syntax("quantifier must precede captures", offset));
                    }
                    if saw_quantifier {
                        return Err(self.syntax("repeated quantifier", offset));
                    }
                    saw_quantifier = true;
                    quantifier = match self.advance().map(|s| s.token) {
                        Some(Token::Star) => Quantifier::ZeroOrMore,
                        Some(Token::Plus) => Quantifier::OneOrMore,
                        _ => Quantifier::ZeroOrOne,
                    };
                }
                Some(Token::Capture(_)) => {
                    let Some(Spanned {
                        token: Token::Capture(name),
                        offset,
                    }) = self.advance()
                    else {
                        break;
                    };
                    if matches!(node.matcher, NodeMatcher::Group) {
                        return Err(self.syntax("a group cannot be captured", offset));
                    }
                    let id = self.intern_capture(&name);
                    state.declared.insert(id);
                    node.captures.push(id);
                    saw_capture = true;
                }
                _ => break,
            }
        }

        Ok(PatternChild {
            field,
            anchor_before,
            quantifier,
            node,
        })
    }

    fn parse_primary(&mut self, state: &mut PatternState) -> Result<PatternNode, CompileError> {
        let Some(sp) = self.advance() else {
            return Err(self.syntax("unexpected end of query", self.source.len()));
        };
        match sp.token {
            Token::LParen => match self.peek() {
                Some(Token::Ident(_)) => {
                    let Some(Spanned {
                        token: Token::Ident(kind),
                        offset,
                    }) = self.advance()
                    else {
                        return Err(self.syntax("expected node kind", sp.offset));
                    };
                    let Some(id) = self.grammar.kind_id(&kind) else {
                        return Err(self.err(CompileErrorKind::UnknownKind(kind), offset));
                    };
                    let matcher = if self.grammar.kind_is_named(id) {
                        NodeMatcher::Kind(id)
                    } else {
                        NodeMatcher::Token(id)
                    };
                    self.parse_node_body(state, matcher, false, sp.offset)
                }
                Some(Token::Wildcard) => {
                    self.advance();
                    self.parse_node_body(state, NodeMatcher::NamedWildcard, false, sp.offset)
                }
                Some(Token::LParen | Token::LBracket | Token::Str(_)) => {
                    self.parse_node_body(state, NodeMatcher::Group, true, sp.offset)
                }
                Some(Token::Predicate(_)) => {
                    Err(self.syntax("predicate is not allowed here", self.offset()))
                }
                _ => Err(self.syntax("expected node kind after `(`", self.offset())),
            },
            Token::LBracket => {
                let mut branches = Vec::new();
                loop {
                    match self.peek() {
                        None => return Err(self.syntax("unclosed `[`", sp.offset)),
                        Some(Token::RBracket) => {
                            self.advance();
                            break;
                        }
                        _ => {
                            let mut branch = self.parse_primary(state)?;
                            while matches!(self.peek(), Some(Token::Capture(_))) {
                                let Some(Spanned {
                                    token: Token::Capture(name),
                                    ..
                                }) = self.advance()
                                else {
                                    break;
                                };
                                let id = self.intern_capture(&name);
                                state.declared.insert(id);
                                branch.captures.push(id);
                            }
                            branches.push(branch);
                        }
                    }
                }
                if branches.is_empty() {
                    return Err(self.syntax("empty alternation", sp.offset));
                }
                Ok(PatternNode::leaf(NodeMatcher::Alternation(branches)))
            }
            Token::Wildcard => Ok(PatternNode::leaf(NodeMatcher::AnyWildcard)),
            Token::Str(lit) => {
                let Some(id) = self.grammar.kind_id(&lit) else {
                    return Err(self.err(CompileErrorKind::UnknownKind(lit), sp.offset));
                };
                Ok(PatternNode::leaf(NodeMatcher::Token(id)))
            }
            _ => Err(self.syntax("expected `(`, `[`, `_`, or a string literal", sp.offset)),
        }
    }

    /// Parse the interior of a `(...)` form up to the closing paren.
    fn parse_node_body(
        &mut self,
        state: &mut PatternState,
        matcher: NodeMatcher,
        is_group: bool,
        open_offset: usize,
    ) -> Result<PatternNode, CompileError> {
        let mut node = PatternNode::leaf(matcher);
        let mut pending_anchor = false;

        loop {
            let offset = self.offset();
            match self.peek() {
                None => return Err(self.syntax("unclosed `(`", open_offset)),
                Some(Token::RParen) => {
                    self.advance();
                    break;
                }
                Some(Token::Anchor) => {
                    self.advance();
                    if matches!(self.peek(), Some(Token::RParen)) {
                        node.anchor_last = true;
                    } else {
                        pending_anchor = true;
                    }
                }
                Some(Token::Negate) => {
                    self.advance();
                    if is_group {
                        return Err(self.syntax("negated field is not allowed in a group", offset));
                    }
                    let Some(Spanned {
                        token: Token::Ident(name),
                        offset: name_offset,
                    }) = self.advance()
                    else {
                        return Err(self.syntax("expected field name after `!`", offset));
                    };
                    let Some(fid) = self.grammar.field_id(&name) else {
                        return Err(self.err(CompileErrorKind::UnknownField(name), name_offset));
                    };
                    node.negated_fields.push(fid);
                }
                Some(Token::Ident(_)) => {
                    if !matches!(self.peek2(), Some(Token::Colon)) {
                        return Err(self.syntax("expected `:` after field name", offset));
                    }
                    let Some(Spanned {
                        token: Token::Ident(name),
                        offset: name_offset,
                    }) = self.advance()
                    else {
                        return Err(self.syntax("expected field name", offset));
                    };
                    self.advance(); // :
                    let Some(fid) = self.grammar.field_id(&name) else {
                        return Err(self.err(CompileErrorKind::UnknownField(name), name_offset));
                    };
                    let anchor = std::mem::take(&mut pending_anchor);
                    let child = self.parse_child(state, anchor, Some(fid))?;
                    if matches!(child.node.matcher, NodeMatcher::Group) {
                        return Err(self.syntax("a group cannot take a field", name_offset));
                    }
                    node.children.push(child);
                }
                Some(Token::LParen) if matches!(self.peek2(), Some(Token::Predicate(_))) => {
                    match self.parse_predicate_form(&state.declared)? {
                        ParsedPredicate::Filter(app) => state.predicates.push(app),
                        ParsedPredicate::Directive(key, value) => {
                            state.properties.push((key, value));
                        }
                    }
                }
                Some(Token::LParen | Token::LBracket | Token::Wildcard | Token::Str(_)) => {
                    let anchor = std::mem::take(&mut pending_anchor);
                    let child = self.parse_child(state, anchor, None)?;
                    node.children.push(child);
                }
                Some(_) => {
                    return Err(self.syntax("unexpected token in pattern", offset));
                }
            }
        }

        if is_group && node.children.is_empty() {
            return Err(self.syntax("empty group", open_offset));
        }
        node.seq = compile_sequence(&node.children, node.anchor_last, is_group);
        Ok(node)
    }

    /// Parse `(#name args...)`; the caller has verified the shape.
    fn parse_predicate_form(
        &mut self,
        declared: &HashSet<CaptureId>,
    ) -> Result<ParsedPredicate, CompileError> {
        let open = self.advance(); // (
        let open_offset = open.map(|s| s.offset).unwrap_or(self.source.len());
        let Some(Spanned {
            token: Token::Predicate(name),
            offset,
        }) = self.advance()
        else {
            return Err(self.syntax("expected predicate name", open_offset));
        };

        let mut args = Vec::new();
        loop {
            match self.advance() {
                None => return Err(self.syntax("unclosed predicate", open_offset)),
                Some(Spanned {
                    token: Token::RParen,
                    ..
                }) => break,
                Some(Spanned {
                    token: Token::Capture(cap),
                    offset: arg_offset,
                }) => {
                    let declared_id = self
                        .capture_names
                        .iter()
                        .position(|n| *n == cap)
                        .map(|i| i as CaptureId)
                        .filter(|id| declared.contains(id));
                    let Some(id) = declared_id else {
                        return Err(self.err(CompileErrorKind::UndeclaredCapture(cap), arg_offset));
                    };
                    args.push(PredicateArg::Capture(id));
                }
                Some(Spanned {
                    token: Token::Str(lit) | Token::Ident(lit),
                    ..
                }) => args.push(PredicateArg::Literal(lit)),
                Some(Spanned {
                    offset: arg_offset, ..
                }) => {
                    return Err(self.syntax("unexpected token in predicate", arg_offset));
                }
            }
        }

        let Some(entry) = self.registry.get(&name) else {
            return Err(self.err(CompileErrorKind::UnknownPredicate(name), offset));
        };
        if args.len() < entry.min_args
            || entry.max_args.is_some_and(|max| args.len() > max)
        {
            return Err(self.err(
                CompileErrorKind::ArityMismatch {
                    predicate: name,
                    expected: entry.arity(),
                    got: args.len(),
                },
                offset,
            ));
        }
        if entry.capture_first && !matches!(args.first(), Some(PredicateArg::Capture(_))) {
            return Err(self.syntax(
                format!("first argument to `#{name}` must be a capture"),
                offset,
            ));
        }

        match entry.kind {
            PredicateKind::Filter(func) => {
                Ok(ParsedPredicate::Filter(PredicateApp { name, args, func }))
            }
            PredicateKind::Directive => {
                let mut literals = Vec::with_capacity(args.len());
                for arg in &args {
                    match arg {
                        PredicateArg::Literal(lit) => literals.push(lit.clone()),
                        PredicateArg::Capture(_) => {
                            return Err(self.err(
                                CompileErrorKind::InvalidDirective(format!(
                                    "`#{name}` arguments must be literals"
                                )),
                                offset,
                            ));
                        }
                    }
                }
                let mut literals = literals.into_iter();
                let key = literals.next().unwrap_or_default();
                let value = literals.next().unwrap_or_default();
                Ok(ParsedPredicate::Directive(key, value))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::csharp_grammar;

    fn compile(source: &str) -> Result<Query, CompileError> {
        Query::new(source, &csharp_grammar())
    }

    #[test]
    fn compiles_simple_pattern() {
        let query = compile("(method_declaration name: (identifier) @name)").unwrap();
        assert_eq!(query.pattern_count(), 1);
        assert_eq!(query.capture_names(), ["name"]);
        assert_eq!(query.capture_index("name"), Some(0));
        assert_eq!(query.capture_index("nope"), None);
    }

    #[test]
    fn multiple_patterns_share_interned_names() {
        let query = compile("(identifier) @x (comment) @x (block) @y").unwrap();
        assert_eq!(query.pattern_count(), 3);
        assert_eq!(query.capture_names(), ["x", "y"]);
    }

    #[test]
    fn unknown_kind_is_reported_with_position() {
        let err = compile("(method_decl)").unwrap_err();
        assert_eq!(err.kind, CompileErrorKind::UnknownKind("method_decl".to_string()));
        assert_eq!(err.offset, 1);
        assert_eq!((err.line, err.column), (1, 1));
    }

    #[test]
    fn unknown_field_is_reported() {
        let err = compile("(method_declaration nom: (identifier))").unwrap_err();
        assert_eq!(err.kind, CompileErrorKind::UnknownField("nom".to_string()));
    }

    #[test]
    fn unknown_anonymous_token_is_reported() {
        let err = compile(r#"(block "%%")"#).unwrap_err();
        assert_eq!(err.kind, CompileErrorKind::UnknownKind("%%".to_string()));
    }

    #[test]
    fn unknown_predicate_is_reported() {
        let err = compile("((identifier) @x (#frobnicate? @x))").unwrap_err();
        assert_eq!(
            err.kind,
            CompileErrorKind::UnknownPredicate("frobnicate?".to_string())
        );
    }

    #[test]
    fn arity_mismatch_is_reported() {
        let err = compile("((identifier) @x (#match? @x))").unwrap_err();
        assert_eq!(
            err.kind,
            CompileErrorKind::ArityMismatch {
                predicate: "match?".to_string(),
                expected: "2".to_string(),
                got: 1,
            }
        );
    }

    #[test]
    fn predicate_capture_must_be_declared_earlier() {
        // @y is declared after the predicate that names it.
        let err = compile("((identifier) (#eq? @y @y) (comment) @y)").unwrap_err();
        assert_eq!(err.kind, CompileErrorKind::UndeclaredCapture("y".to_string()));
    }

    #[test]
    fn predicate_capture_from_another_pattern_is_undeclared() {
        let err = compile("(identifier) @x ((comment) (#eq? @x @x))").unwrap_err();
        assert_eq!(err.kind, CompileErrorKind::UndeclaredCapture("x".to_string()));
    }

    #[test]
    fn trailing_predicate_attaches_to_previous_pattern() {
        let query = compile(
            r#"(identifier) @name (#match? @name "^Test") (#set! tag test-target)"#,
        )
        .unwrap();
        assert_eq!(query.pattern_count(), 1);
        assert_eq!(query.patterns()[0].predicates.len(), 1);
        assert_eq!(query.pattern_tag(0), Some("test-target"));
    }

    #[test]
    fn trailing_predicate_without_pattern_is_error() {
        let err = compile("(#set! tag x)").unwrap_err();
        assert!(matches!(err.kind, CompileErrorKind::Syntax(_)));
    }

    #[test]
    fn set_directive_rejects_capture_argument() {
        let err = compile("((identifier) @x (#set! tag @x))").unwrap_err();
        assert!(matches!(err.kind, CompileErrorKind::InvalidDirective(_)));
    }

    #[test]
    fn set_with_single_argument_is_a_flag() {
        let query = compile("((identifier) (#set! local))").unwrap();
        assert_eq!(query.patterns()[0].property("local"), Some(""));
    }

    #[test]
    fn quantifier_after_capture_is_error() {
        let err = compile("(comment) @doc +").unwrap_err();
        assert!(matches!(err.kind, CompileErrorKind::Syntax(_)));
    }

    #[test]
    fn double_quantifier_is_error() {
        let err = compile("(comment)+*").unwrap_err();
        assert!(matches!(err.kind, CompileErrorKind::Syntax(_)));
    }

    #[test]
    fn top_level_anchor_is_error() {
        let err = compile(". (identifier)").unwrap_err();
        assert!(matches!(err.kind, CompileErrorKind::Syntax(_)));
    }

    #[test]
    fn group_cannot_be_captured() {
        let err = compile("((identifier) (comment)) @pair").unwrap_err();
        assert!(matches!(err.kind, CompileErrorKind::Syntax(_)));
    }

    #[test]
    fn group_cannot_take_a_field() {
        let err = compile("(block body: ((identifier) (comment)))").unwrap_err();
        assert!(matches!(err.kind, CompileErrorKind::Syntax(_)));
    }

    #[test]
    fn empty_alternation_is_error() {
        let err = compile("[]").unwrap_err();
        assert!(matches!(err.kind, CompileErrorKind::Syntax(_)));
    }

    #[test]
    fn unclosed_paren_is_error() {
        let err = compile("(identifier").unwrap_err();
        assert!(matches!(err.kind, CompileErrorKind::Syntax(_)));
        assert_eq!(err.offset, 0);
    }

    #[test]
    fn alternation_with_captures_compiles() {
        let query = compile("[(identifier) @id (comment) @c]").unwrap();
        assert_eq!(query.pattern_count(), 1);
        assert_eq!(query.capture_names(), ["id", "c"]);
    }

    #[test]
    fn negated_field_compiles() {
        let query = compile("(method_declaration !body)").unwrap();
        assert_eq!(query.patterns()[0].root.node.negated_fields.len(), 1);
    }

    #[test]
    fn empty_query_compiles_to_no_patterns() {
        let query = compile("; just a comment\n").unwrap();
        assert_eq!(query.pattern_count(), 0);
    }

    #[test]
    fn custom_registry_predicate_resolves() {
        fn always(_: &[PredicateArg], _: &crate::query::predicate::MatchContext<'_, '_>) -> Result<bool, String> {
            Ok(true)
        }
        let mut registry = PredicateRegistry::default();
        registry.register(
            "always?",
            crate::query::predicate::PredicateEntry::filter(always, 0, Some(0), false),
        );
        let query =
            Query::with_registry("((identifier) (#always?))", &csharp_grammar(), &registry)
                .unwrap();
        assert_eq!(query.patterns()[0].predicates.len(), 1);
    }
}
