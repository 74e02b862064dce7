use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "treequery",
    version,
    about = "Validate syntax-tree query files and run them against parsed trees"
)]
pub struct Args {
    /// Query files or directories to search for .scm files
    #[arg(default_value = ".")]
    pub paths: Vec<PathBuf>,

    /// Path to the grammar's node-types.json
    #[arg(short, long, value_name = "FILE")]
    pub grammar: PathBuf,

    /// Grammar name used for cache keys and tree validation
    #[arg(long, value_name = "NAME")]
    pub grammar_name: Option<String>,

    /// JSON tree file to run the validated queries against
    #[arg(short, long, value_name = "FILE")]
    pub tree: Option<PathBuf>,

    /// Output format for matches
    #[arg(short, long, default_value = "text", value_parser = ["text", "json"])]
    pub format: String,

    /// Enable debug output
    #[arg(long)]
    pub debug: bool,
}

impl Args {
    /// The grammar name, defaulting to the grammar file's stem.
    pub fn resolved_grammar_name(&self) -> String {
        if let Some(name) = &self.grammar_name {
            return name.clone();
        }
        self.grammar
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "grammar".to_string())
    }
}
