use thiserror::Error;

/// Errors surfaced by a [`TreeReader`](crate::tree::reader::TreeReader)
/// while pulling tokens.
#[derive(Debug, Clone, Error)]
pub enum ReaderError {
    /// Malformed structural input. The reader does not attempt recovery;
    /// callers decide whether the pass survives.
    #[error("malformed input: {0}")]
    Syntax(String),

    /// `next()` was called on an exhausted stream.
    #[error("end of token stream")]
    EndOfStream,
}

/// Pass-level import failures.
#[derive(Debug, Error)]
pub enum ImportError {
    /// No record path could be established; the pass produces zero rows.
    #[error("no record path found")]
    RecordPathNotFound,

    #[error(transparent)]
    Reader(#[from] ReaderError),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// A per-record failure recovered during the authoritative pass.
///
/// The partial record is discarded and the pass continues; these accumulate
/// on the [`ImportOutcome`](crate::import::engine::ImportOutcome) so no
/// record is ever dropped without a trace.
#[derive(Debug, Clone, Error)]
#[error("record {record_index} dropped at row {row_base}: {source}")]
pub struct RecordError {
    /// Zero-based index of the record that failed.
    pub record_index: usize,
    /// Table row the record would have started at.
    pub row_base: usize,
    pub source: ReaderError,
}
