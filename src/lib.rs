pub mod cli;
pub mod error;
pub mod fs;
pub mod grammar;
pub mod query;
pub mod tree;

#[cfg(test)]
pub mod testutil;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use rayon::prelude::*;
use serde::Serialize;

use cli::Args;
use fs::discover_query_files;

pub use error::{CompileError, CompileErrorKind, PredicateError};
pub use grammar::Grammar;
pub use query::{Query, QueryCache, QueryCursor, QueryMatch};
pub use tree::{Node, SyntaxTree, TreeBuilder, TreeFile};

/// One match rendered for output.
#[derive(Debug, Serialize)]
pub struct MatchOutput {
    pub query: String,
    pub pattern: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    pub captures: Vec<CaptureOutput>,
}

#[derive(Debug, Serialize)]
pub struct CaptureOutput {
    pub name: String,
    pub start: usize,
    pub end: usize,
    pub text: String,
}

/// Run every pattern of `query` over `tree`, collecting matches for output
/// along with any predicate evaluation errors.
pub fn collect_matches(
    query_path: &Path,
    query: &Query,
    tree: &SyntaxTree,
) -> (Vec<MatchOutput>, Vec<PredicateError>) {
    let mut cursor = QueryCursor::new();
    let outputs = cursor
        .matches(query, tree.root())
        .map(|m| MatchOutput {
            query: query_path.display().to_string(),
            pattern: m.pattern_index(),
            tag: m.tag().map(str::to_string),
            captures: m
                .captures()
                .iter()
                .map(|&(cap, node)| CaptureOutput {
                    name: m.capture_name(cap).to_string(),
                    start: node.byte_range().start,
                    end: node.byte_range().end,
                    text: node.text().to_string(),
                })
                .collect(),
        })
        .collect();
    (outputs, cursor.errors().to_vec())
}

/// Run the tool. Returns the exit code: 0 = clean, 1 = errors found.
pub fn run(args: Args) -> Result<i32> {
    let grammar_json = std::fs::read_to_string(&args.grammar)
        .with_context(|| format!("failed to read {}", args.grammar.display()))?;
    let grammar_name = args.resolved_grammar_name();
    let grammar = Arc::new(
        Grammar::from_node_types(&grammar_name, &grammar_json)
            .with_context(|| format!("invalid node types in {}", args.grammar.display()))?,
    );

    if args.debug {
        eprintln!(
            "debug: grammar `{}` with {} kinds",
            grammar.name(),
            grammar.kind_count()
        );
    }

    let files = discover_query_files(&args.paths)?;
    if args.debug {
        eprintln!("debug: {} query files", files.len());
    }

    let cache = QueryCache::new();
    let compiled: Vec<(PathBuf, std::result::Result<Arc<Query>, String>)> = files
        .par_iter()
        .map(|path| {
            let result = std::fs::read_to_string(path)
                .map_err(|e| e.to_string())
                .and_then(|source| {
                    cache
                        .get_or_compile(&grammar, &source)
                        .map_err(|e| e.to_string())
                });
            (path.clone(), result)
        })
        .collect();

    let mut error_count = 0;
    let mut queries = Vec::new();
    for (path, result) in compiled {
        match result {
            Ok(query) => queries.push((path, query)),
            Err(message) => {
                eprintln!("{}:{message}", path.display());
                error_count += 1;
            }
        }
    }

    if let Some(tree_path) = &args.tree {
        let tree_json = std::fs::read_to_string(tree_path)
            .with_context(|| format!("failed to read {}", tree_path.display()))?;
        let tree_file: TreeFile = serde_json::from_str(&tree_json)
            .with_context(|| format!("invalid tree in {}", tree_path.display()))?;
        let tree = tree_file
            .build(Arc::clone(&grammar))
            .with_context(|| format!("tree in {} does not fit the grammar", tree_path.display()))?;

        let mut all_matches = Vec::new();
        for (path, query) in &queries {
            let (outputs, predicate_errors) = collect_matches(path, query, &tree);
            for err in &predicate_errors {
                eprintln!("{}: {err}", path.display());
                error_count += 1;
            }
            all_matches.extend(outputs);
        }

        match args.format.as_str() {
            "json" => println!("{}", serde_json::to_string_pretty(&all_matches)?),
            _ => print_text(&all_matches),
        }
    }

    Ok(if error_count > 0 { 1 } else { 0 })
}

fn print_text(matches: &[MatchOutput]) {
    for m in matches {
        match &m.tag {
            Some(tag) => println!("{}: pattern {} [{tag}]", m.query, m.pattern),
            None => println!("{}: pattern {}", m.query, m.pattern),
        }
        for c in &m.captures {
            println!("  @{} {}..{} {}", c.name, c.start, c.end, c.text);
        }
    }
}
