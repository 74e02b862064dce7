//! Query DSL lexer.
//!
//! Tokenizes S-expression query strings like
//! `(method_declaration name: (identifier) @name)`. Each token carries its
//! byte offset so the parser can report positions in compile errors.

use crate::error::{CompileError, CompileErrorKind};

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    LParen,
    RParen,
    LBracket, // [ alternation
    RBracket, // ]
    Anchor,   // .
    Star,
    Plus,
    Question,
    Colon,             // after a field name
    Negate,            // !field
    Wildcard,          // _
    Capture(String),   // @name (dotted names allowed)
    Predicate(String), // #eq? / #set! etc., without the leading #
    Ident(String),     // node kinds and field names
    Str(String),       // "literal"
}

#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub offset: usize,
}

pub struct Lexer<'a> {
    source: &'a str,
    input: &'a [u8],
    pos: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            input: source.as_bytes(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn advance(&mut self) -> Option<u8> {
        let ch = self.input.get(self.pos).copied()?;
        self.pos += 1;
        Some(ch)
    }

    fn skip_trivia(&mut self) {
        while let Some(ch) = self.peek() {
            match ch {
                b' ' | b'\t' | b'\n' | b'\r' => {
                    self.pos += 1;
                }
                b';' => {
                    // Comment to end of line.
                    while self.peek().is_some_and(|c| c != b'\n') {
                        self.pos += 1;
                    }
                }
                _ => break,
            }
        }
    }

    fn read_while(&mut self, pred: impl Fn(u8) -> bool) -> String {
        let start = self.pos;
        while self.pos < self.input.len() && pred(self.input[self.pos]) {
            self.pos += 1;
        }
        String::from_utf8_lossy(&self.input[start..self.pos]).into_owned()
    }

    fn is_ident_char(ch: u8) -> bool {
        ch.is_ascii_alphanumeric() || ch == b'_' || ch == b'-'
    }

    fn error(&self, msg: impl Into<String>, offset: usize) -> CompileError {
        CompileError::new(CompileErrorKind::Syntax(msg.into()), offset, self.source)
    }

    fn read_string(&mut self) -> Result<Token, CompileError> {
        let start = self.pos;
        self.advance(); // opening quote
        let mut out = Vec::new();
        loop {
            match self.advance() {
                Some(b'"') => {
                    return Ok(Token::Str(String::from_utf8_lossy(&out).into_owned()));
                }
                Some(b'\\') => match self.advance() {
                    Some(b'"') => out.push(b'"'),
                    Some(b'\\') => out.push(b'\\'),
                    Some(b'n') => out.push(b'\n'),
                    Some(b't') => out.push(b'\t'),
                    Some(other) => {
                        return Err(self.error(
                            format!("unknown escape `\\{}`", other as char),
                            self.pos - 2,
                        ));
                    }
                    None => return Err(self.error("unterminated string", start)),
                },
                Some(other) => out.push(other),
                None => return Err(self.error("unterminated string", start)),
            }
        }
    }

    pub fn tokenize(mut self) -> Result<Vec<Spanned>, CompileError> {
        let mut tokens = Vec::new();

        loop {
            self.skip_trivia();
            let Some(ch) = self.peek() else { break };
            let offset = self.pos;

            let token = match ch {
                b'(' => {
                    self.advance();
                    Token::LParen
                }
                b')' => {
                    self.advance();
                    Token::RParen
                }
                b'[' => {
                    self.advance();
                    Token::LBracket
                }
                b']' => {
                    self.advance();
                    Token::RBracket
                }
                b'.' => {
                    self.advance();
                    Token::Anchor
                }
                b'*' => {
                    self.advance();
                    Token::Star
                }
                b'+' => {
                    self.advance();
                    Token::Plus
                }
                b'?' => {
                    self.advance();
                    Token::Question
                }
                b':' => {
                    self.advance();
                    Token::Colon
                }
                b'!' => {
                    self.advance();
                    Token::Negate
                }
                b'@' => {
                    self.advance();
                    // Dotted capture names like @function.inside are common.
                    let name = self.read_while(|c| Self::is_ident_char(c) || c == b'.');
                    if name.is_empty() {
                        return Err(self.error("expected capture name after `@`", offset));
                    }
                    Token::Capture(name)
                }
                b'#' => {
                    self.advance();
                    let mut name = self.read_while(Self::is_ident_char);
                    if self.peek() == Some(b'?') || self.peek() == Some(b'!') {
                        name.push(self.advance().unwrap_or_default() as char);
                    }
                    if name.is_empty() {
                        return Err(self.error("expected predicate name after `#`", offset));
                    }
                    Token::Predicate(name)
                }
                b'"' => self.read_string()?,
                b'_' => {
                    let word = self.read_while(Self::is_ident_char);
                    if word == "_" {
                        Token::Wildcard
                    } else {
                        Token::Ident(word)
                    }
                }
                _ if ch.is_ascii_alphanumeric() => Token::Ident(self.read_while(Self::is_ident_char)),
                _ => {
                    return Err(self.error(format!("unexpected character `{}`", ch as char), offset));
                }
            };

            tokens.push(Spanned { token, offset });
        }

        Ok(tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(source: &str) -> Vec<Token> {
        Lexer::new(source)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|s| s.token)
            .collect()
    }

    #[test]
    fn basic_pattern() {
        assert_eq!(
            lex("(method_declaration name: (identifier) @name)"),
            vec![
                Token::LParen,
                Token::Ident("method_declaration".to_string()),
                Token::Ident("name".to_string()),
                Token::Colon,
                Token::LParen,
                Token::Ident("identifier".to_string()),
                Token::RParen,
                Token::Capture("name".to_string()),
                Token::RParen,
            ]
        );
    }

    #[test]
    fn quantifiers_and_anchor() {
        assert_eq!(
            lex("(block . (comment)* (call)+ (end)?)"),
            vec![
                Token::LParen,
                Token::Ident("block".to_string()),
                Token::Anchor,
                Token::LParen,
                Token::Ident("comment".to_string()),
                Token::RParen,
                Token::Star,
                Token::LParen,
                Token::Ident("call".to_string()),
                Token::RParen,
                Token::Plus,
                Token::LParen,
                Token::Ident("end".to_string()),
                Token::RParen,
                Token::Question,
                Token::RParen,
            ]
        );
    }

    #[test]
    fn wildcard_vs_underscore_ident() {
        assert_eq!(
            lex("(_) _ _foo"),
            vec![
                Token::LParen,
                Token::Wildcard,
                Token::RParen,
                Token::Wildcard,
                Token::Ident("_foo".to_string()),
            ]
        );
    }

    #[test]
    fn predicate_and_string() {
        assert_eq!(
            lex(r#"(#match? @name "^Test")"#),
            vec![
                Token::LParen,
                Token::Predicate("match?".to_string()),
                Token::Capture("name".to_string()),
                Token::Str("^Test".to_string()),
                Token::RParen,
            ]
        );
    }

    #[test]
    fn directive_token() {
        assert_eq!(
            lex("(#set! tag csharp-test-method)"),
            vec![
                Token::LParen,
                Token::Predicate("set!".to_string()),
                Token::Ident("tag".to_string()),
                Token::Ident("csharp-test-method".to_string()),
                Token::RParen,
            ]
        );
    }

    #[test]
    fn dotted_capture_name() {
        assert_eq!(
            lex("@function.inside"),
            vec![Token::Capture("function.inside".to_string())]
        );
    }

    #[test]
    fn comments_are_skipped() {
        assert_eq!(
            lex("; runnable tests\n(identifier) ; trailing\n"),
            vec![
                Token::LParen,
                Token::Ident("identifier".to_string()),
                Token::RParen,
            ]
        );
    }

    #[test]
    fn string_escapes() {
        assert_eq!(
            lex(r#""a\"b\\c\n""#),
            vec![Token::Str("a\"b\\c\n".to_string())]
        );
    }

    #[test]
    fn non_ascii_string_survives_intact() {
        assert_eq!(
            lex(r#""café" "λ=>""#),
            vec![
                Token::Str("café".to_string()),
                Token::Str("λ=>".to_string()),
            ]
        );
    }

    #[test]
    fn negated_field() {
        assert_eq!(
            lex("(call !receiver)"),
            vec![
                Token::LParen,
                Token::Ident("call".to_string()),
                Token::Negate,
                Token::Ident("receiver".to_string()),
                Token::RParen,
            ]
        );
    }

    #[test]
    fn unterminated_string_is_error() {
        let err = Lexer::new("\"abc").tokenize().unwrap_err();
        assert!(matches!(err.kind, CompileErrorKind::Syntax(_)));
        assert_eq!(err.offset, 0);
    }

    #[test]
    fn bare_at_is_error() {
        let err = Lexer::new("(foo) @").tokenize().unwrap_err();
        assert!(matches!(err.kind, CompileErrorKind::Syntax(_)));
        assert_eq!(err.offset, 6);
    }

    #[test]
    fn offsets_are_recorded() {
        let tokens = Lexer::new("(foo\n  bar)").tokenize().unwrap();
        assert_eq!(tokens[0].offset, 0);
        assert_eq!(tokens[1].offset, 1);
        assert_eq!(tokens[2].offset, 7);
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn tokenize_never_panics(input in ".{0,200}") {
                let _ = Lexer::new(&input).tokenize();
            }

            #[test]
            fn offsets_are_strictly_increasing(input in "[ ()\\[\\]*+?.:!@#a-z_\"\\\\-]{0,120}") {
                if let Ok(tokens) = Lexer::new(&input).tokenize() {
                    for pair in tokens.windows(2) {
                        prop_assert!(pair[0].offset < pair[1].offset,
                            "offsets not increasing: {} >= {}", pair[0].offset, pair[1].offset);
                    }
                }
            }
        }
    }
}
