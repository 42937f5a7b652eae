pub mod completions;
pub mod config;
pub mod preview;
pub mod run;

use eyre::{Context, Result};
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

/// Open a JSON-lines source: the given file, or stdin
fn open_input(input: Option<&Path>) -> Result<Box<dyn BufRead + Send>> {
    match input {
        Some(path) => {
            let file = File::open(path).with_context(|| format!("Failed to open input: {}", path.display()))?;
            Ok(Box::new(BufReader::new(file)))
        }
        None => Ok(Box::new(BufReader::new(io::stdin()))),
    }
}
