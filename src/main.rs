use std::process;

use clap::Parser;

use treequery::cli::Args;

fn main() {
    let args = Args::parse();
    match treequery::run(args) {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {e:#}");
            process::exit(3);
        }
    }
}
