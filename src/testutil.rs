//! Shared test fixtures: a small C#-flavoured grammar and a parsed source
//! tree exercising attributes, fields, comments, and anonymous tokens.

use std::ops::Range;
use std::sync::Arc;

use crate::grammar::Grammar;
use crate::tree::{SyntaxTree, TreeBuilder};

pub fn csharp_grammar() -> Arc<Grammar> {
    Arc::new(Grammar::new(
        "c_sharp",
        &[
            "compilation_unit",
            "using_directive",
            "namespace_declaration",
            "qualified_name",
            "declaration_list",
            "class_declaration",
            "method_declaration",
            "attribute_list",
            "attribute",
            "parameter_list",
            "predefined_type",
            "identifier",
            "comment",
            "block",
        ],
        &[
            "using", "namespace", "class", "public", "void", ";", "{", "}", "[", "]", "(", ")",
        ],
        &["name", "body", "returns", "parameters", "type"],
    ))
}

/// Finds needles left to right so repeated tokens land on the right
/// occurrence.
pub struct Scanner<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Scanner<'a> {
    pub fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    pub fn span(&mut self, needle: &str) -> Range<usize> {
        let start = self.src[self.pos..]
            .find(needle)
            .map(|i| i + self.pos)
            .unwrap_or_else(|| panic!("fixture is missing `{needle}`"));
        self.pos = start + needle.len();
        start..start + needle.len()
    }
}

const SOURCE: &str = "\
using Xunit;

namespace Calc.Tests {
  public class CalculatorTests {
    // one
    // two
    // three
    [Fact]
    public void AddsTwoNumbers() {
    }
    public void Helper() {
    }
  }
}
";

/// The fixture tree for `SOURCE`: one namespace, one class, three leading
/// comments, one `[Fact]` method and one plain method.
pub fn source_tree() -> SyntaxTree {
    let mut s = Scanner::new(SOURCE);
    let mut b = TreeBuilder::new(csharp_grammar(), SOURCE);

    b.open("compilation_unit", None).unwrap();

    b.open("using_directive", None).unwrap();
    b.token("using", None, s.span("using")).unwrap();
    b.token("identifier", None, s.span("Xunit")).unwrap();
    b.token(";", None, s.span(";")).unwrap();
    b.close().unwrap();

    b.open("namespace_declaration", None).unwrap();
    b.token("namespace", None, s.span("namespace")).unwrap();
    b.token("qualified_name", Some("name"), s.span("Calc.Tests"))
        .unwrap();
    b.open("declaration_list", Some("body")).unwrap();
    b.token("{", None, s.span("{")).unwrap();

    b.open("class_declaration", None).unwrap();
    b.token("public", None, s.span("public")).unwrap();
    b.token("class", None, s.span("class")).unwrap();
    b.token("identifier", Some("name"), s.span("CalculatorTests"))
        .unwrap();
    b.open("declaration_list", Some("body")).unwrap();
    b.token("{", None, s.span("{")).unwrap();

    b.token("comment", None, s.span("// one")).unwrap();
    b.token("comment", None, s.span("// two")).unwrap();
    b.token("comment", None, s.span("// three")).unwrap();

    b.open("method_declaration", None).unwrap();
    b.open("attribute_list", None).unwrap();
    b.token("[", None, s.span("[")).unwrap();
    b.open("attribute", None).unwrap();
    b.token("identifier", Some("name"), s.span("Fact")).unwrap();
    b.close().unwrap();
    b.token("]", None, s.span("]")).unwrap();
    b.close().unwrap();
    b.token("public", None, s.span("public")).unwrap();
    b.token("predefined_type", Some("returns"), s.span("void"))
        .unwrap();
    b.token("identifier", Some("name"), s.span("AddsTwoNumbers"))
        .unwrap();
    b.open("parameter_list", Some("parameters")).unwrap();
    b.token("(", None, s.span("(")).unwrap();
    b.token(")", None, s.span(")")).unwrap();
    b.close().unwrap();
    b.open("block", Some("body")).unwrap();
    b.token("{", None, s.span("{")).unwrap();
    b.token("}", None, s.span("}")).unwrap();
    b.close().unwrap();
    b.close().unwrap();

    b.open("method_declaration", None).unwrap();
    b.token("public", None, s.span("public")).unwrap();
    b.token("predefined_type", Some("returns"), s.span("void"))
        .unwrap();
    b.token("identifier", Some("name"), s.span("Helper")).unwrap();
    b.open("parameter_list", Some("parameters")).unwrap();
    b.token("(", None, s.span("(")).unwrap();
    b.token(")", None, s.span(")")).unwrap();
    b.close().unwrap();
    b.open("block", Some("body")).unwrap();
    b.token("{", None, s.span("{")).unwrap();
    b.token("}", None, s.span("}")).unwrap();
    b.close().unwrap();
    b.close().unwrap();

    b.token("}", None, s.span("}")).unwrap();
    b.close().unwrap(); // class body
    b.close().unwrap(); // class
    b.token("}", None, s.span("}")).unwrap();
    b.close().unwrap(); // namespace body
    b.close().unwrap(); // namespace
    b.close().unwrap(); // compilation_unit
    b.finish().unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixture_builds() {
        let tree = source_tree();
        assert_eq!(tree.root().kind(), "compilation_unit");
        assert_eq!(tree.root().child_count(), 2);
        assert_eq!(tree.root().byte_range().start, 0);
    }
}
