//! The tabular side: the column group tree, the import engine that fills
//! it, and the finalized table with its sinks.
//!
//! One import pass owns one [`columns::ColumnGroupTree`] and one tokenizer,
//! so independent documents can be imported concurrently by giving each
//! pass its own instances.

pub mod columns;
pub mod engine;
pub mod table;

pub use columns::{Column, ColumnGroup, ColumnGroupTree, ColumnId, GroupId};
pub use engine::{import_tree, ImportOutcome};
pub use table::{JsonLinesWriter, Table, TableColumn, TableSink};
