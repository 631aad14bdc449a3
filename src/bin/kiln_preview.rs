//! kiln-preview: show a bounded preview of an XML document's structure
//!
//! Builds the same nested preview the import UI displays, without running a
//! full import pass. Never reads more than the token budget.
//!
//! Usage:
//!   # Pretty JSON to stdout
//!   kiln-preview data.xml
//!
//!   # Read from stdin, compact output, tighter budget
//!   cat feed.xml | kiln-preview --budget 200 --compact

// Use MiMalloc allocator for better performance
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use anyhow::{Context, Result};
use clap::Parser;
use kiln::{build_preview, XmlReader};
use std::fs::File;
use std::io::{stdin, BufRead, BufReader};

#[derive(Parser, Debug)]
#[command(name = "kiln-preview")]
#[command(about = "Preview the structure of an XML document", long_about = None)]
struct Args {
    /// Input file (use stdin if omitted)
    #[arg(value_name = "FILE")]
    input: Option<String>,

    /// Maximum number of tokens to read
    #[arg(long, default_value_t = 1000)]
    budget: usize,

    /// Compact output (no pretty-printing)
    #[arg(long)]
    compact: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    let reader: Box<dyn BufRead> = match &args.input {
        Some(path) => {
            let file = File::open(path).with_context(|| format!("Failed to open {}", path))?;
            Box::new(BufReader::new(file))
        }
        None => Box::new(BufReader::new(stdin())),
    };

    let mut tokens = XmlReader::new(reader);
    match build_preview(&mut tokens, args.budget) {
        Some(node) => {
            let output = if args.compact {
                serde_json::to_string(&node)?
            } else {
                serde_json::to_string_pretty(&node)?
            };
            println!("{}", output);
            Ok(())
        }
        None => {
            eprintln!("No preview available");
            std::process::exit(1);
        }
    }
}
