//! # Kiln - Hierarchical Document Import Toolkit
//!
//! A streaming importer that flattens hierarchical documents (XML) into a
//! tabular model: rows and named columns suitable for spreadsheet-style
//! editing. The record boundary and the column set are both discovered from
//! the stream itself, without materializing the document in memory.
//!
//! ## Modules
//!
//! - **tree**: the tokenizer abstraction, its XML implementation, record
//!   path detection, and bounded-budget preview building
//! - **import**: the column group tree, the import engine, and the
//!   finalized table
//!
//! ## Quick Start
//!
//! ```rust
//! use kiln::{import_xml, ImportConfig};
//!
//! # fn main() -> anyhow::Result<()> {
//! let xml = r#"<orders>
//!     <order id="1"><sku>a</sku></order>
//!     <order id="2"><sku>b</sku></order>
//! </orders>"#;
//!
//! let outcome = import_xml(xml.as_bytes(), &ImportConfig::default())?;
//!
//! // The repeating <order> element was inferred as the record boundary.
//! assert_eq!(outcome.row_count, 2);
//! assert!(outcome.exceptions.is_empty());
//! # Ok(())
//! # }
//! ```

use std::io::{BufRead, BufReader, Cursor, Read};

use tracing::debug;

pub mod errors;
pub mod import;
pub mod tree;

// Re-export commonly used types for convenience
pub use errors::{ImportError, ReaderError, RecordError};
pub use import::engine::{import_tree, ImportOutcome};
pub use import::table::{JsonLinesWriter, Table, TableColumn, TableSink};
pub use tree::detect::{detect_path_from_tag, detect_record_path, RecordPath};
pub use tree::preview::{build_preview, PreviewNode};
pub use tree::reader::TreeReader;
pub use tree::types::{ImportConfig, QName, Token};
pub use tree::xml::{can_import, XmlReader};

/// Main entry point: import an XML byte stream into a table.
///
/// A bounded prefix of the input is buffered and scanned to establish the
/// record path (honoring `config.record_tag` when set); the authoritative
/// pass then re-reads from the start over the buffered prefix chained with
/// the rest of the stream. Detection failure is pass-fatal and yields
/// [`ImportError::RecordPathNotFound`]; per-record failures are recovered
/// and reported on the outcome instead.
pub fn import_xml<R: Read>(
    mut input: R,
    config: &ImportConfig,
) -> Result<ImportOutcome, ImportError> {
    let mut prefix = vec![0u8; config.detection_buffer_size];
    let mut filled = 0;
    while filled < prefix.len() {
        let read = input.read(&mut prefix[filled..])?;
        if read == 0 {
            break;
        }
        filled += read;
    }
    prefix.truncate(filled);

    let record_path = {
        let mut detector = XmlReader::new(&prefix[..]);
        match &config.record_tag {
            Some(tag) => detect_path_from_tag(&mut detector, tag),
            None => detect_record_path(&mut detector),
        }
    }
    .ok_or(ImportError::RecordPathNotFound)?;

    debug!(path = ?record_path, "record path established");

    let mut reader = XmlReader::new(BufReader::new(Cursor::new(prefix).chain(input)));
    import_tree(&mut reader, &record_path, config)
}

/// Build a bounded preview of the first element of an XML document.
///
/// `None` means "no preview available", not an error.
pub fn preview_xml<R: BufRead>(input: R, config: &ImportConfig) -> Option<PreviewNode> {
    let mut reader = XmlReader::new(input);
    build_preview(&mut reader, config.preview_token_budget)
}
