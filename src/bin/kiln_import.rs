//! kiln-import: flatten a hierarchical XML document into table rows
//!
//! Usage:
//!   # Read from file, write JSON-lines rows to stdout
//!   kiln-import data.xml
//!
//!   # Read from stdin
//!   cat feed.xml | kiln-import
//!
//!   # Pin the record boundary instead of inferring it
//!   kiln-import --record-tag item data.xml
//!
//!   # Write to a file
//!   kiln-import data.xml --output rows.jsonl

// Use MiMalloc allocator for better performance
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use anyhow::{Context, Result};
use clap::Parser;
use kiln::{import_xml, ImportConfig, ImportOutcome, JsonLinesWriter, TableSink};
use std::fs::File;
use std::io::{stdin, BufWriter, Write};

#[derive(Parser, Debug)]
#[command(name = "kiln-import")]
#[command(about = "Flatten hierarchical XML into table rows", long_about = None)]
struct Args {
    /// Input file (use stdin if omitted)
    #[arg(value_name = "FILE")]
    input: Option<String>,

    /// Element local name to use as the record boundary (inferred if omitted)
    #[arg(long)]
    record_tag: Option<String>,

    /// Separator for nested column names (default: ".")
    #[arg(long)]
    separator: Option<String>,

    /// Bytes of input buffered for record path detection (default: 64 KiB)
    #[arg(long)]
    detect_bytes: Option<usize>,

    /// Output file (stdout if omitted)
    #[arg(long, short = 'o')]
    output: Option<String>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    let mut config = ImportConfig::default();
    config.record_tag = args.record_tag;
    if let Some(separator) = args.separator {
        config.separator = separator;
    }
    if let Some(bytes) = args.detect_bytes {
        config.detection_buffer_size = bytes;
    }

    let outcome = match &args.input {
        Some(path) => {
            let file = File::open(path).with_context(|| format!("Failed to open {}", path))?;
            import_xml(file, &config)?
        }
        None => import_xml(stdin().lock(), &config)?,
    };

    for exception in &outcome.exceptions {
        eprintln!("⚠ {}", exception);
    }

    write_rows(&outcome, args.output.as_deref())?;

    eprintln!(
        "{} rows, {} columns, {} records dropped",
        outcome.row_count,
        outcome.table.columns.len(),
        outcome.exceptions.len()
    );

    Ok(())
}

fn write_rows(outcome: &ImportOutcome, output: Option<&str>) -> Result<()> {
    let writer: Box<dyn Write> = match output {
        Some(path) => {
            let file =
                File::create(path).with_context(|| format!("Failed to create {}", path))?;
            Box::new(BufWriter::new(file))
        }
        None => Box::new(std::io::stdout().lock()),
    };

    let mut sink = JsonLinesWriter::new(writer);
    outcome.table.write_to(&mut sink)?;
    sink.flush()?;
    Ok(())
}
