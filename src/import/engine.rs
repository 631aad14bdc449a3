//! The authoritative pass: seek record-path openings, descend each record
//! into the column group tree, flush one or more rows per record.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::errors::{ImportError, ReaderError, RecordError};
use crate::import::columns::{ColumnGroupTree, ColumnId, GroupId, ATTRIBUTE_PREFIX, TEXT_KEY};
use crate::import::table::Table;
use crate::tree::detect::RecordPath;
use crate::tree::reader::TreeReader;
use crate::tree::types::{ImportConfig, QName, Token};

/// Result of one import pass: the finalized table plus every per-record
/// failure that was recovered along the way.
#[derive(Debug)]
pub struct ImportOutcome {
    pub table: Table,
    pub row_count: usize,
    pub exceptions: Vec<RecordError>,
}

/// Import every record addressed by `record_path` from `reader` into a
/// fresh column group tree, then materialize the table.
pub fn import_tree(
    reader: &mut dyn TreeReader,
    record_path: &RecordPath,
    config: &ImportConfig,
) -> Result<ImportOutcome, ImportError> {
    if record_path.is_empty() {
        return Err(ImportError::RecordPathNotFound);
    }
    let mut importer = TreeImporter::new(record_path);
    importer.seek_level(reader, 0)?;
    Ok(importer.into_outcome(&config.separator))
}

/// Cells collected for one record before flushing; fan-out appends rows.
struct RecordBuffer {
    rows: Vec<Vec<(ColumnId, String)>>,
}

impl RecordBuffer {
    fn new() -> Self {
        RecordBuffer {
            rows: vec![Vec::new()],
        }
    }

    /// Write into a row, concatenating when the cell already has content
    /// (split text runs inside one element).
    fn write(&mut self, row: usize, column: ColumnId, value: String) {
        let cells = &mut self.rows[row];
        if let Some(entry) = cells.iter_mut().find(|(existing, _)| *existing == column) {
            entry.1.push_str(&value);
        } else {
            cells.push((column, value));
        }
    }

    /// Open one extra row for a repeated sibling, seeded with the ancestor
    /// context: the parent's own attribute and text cells plus everything
    /// owned by groups above it. Sibling leaves stay behind.
    fn fan_out(&mut self, base: usize, parent: GroupId, tree: &ColumnGroupTree) -> usize {
        let seeded: Vec<(ColumnId, String)> = self.rows[base]
            .iter()
            .filter(|(column, _)| {
                let owner = tree.column_group(*column);
                if owner == parent {
                    let key = tree.column_key(*column);
                    key == TEXT_KEY || key.starts_with(ATTRIBUTE_PREFIX)
                } else {
                    tree.is_ancestor_or_self(owner, parent)
                }
            })
            .cloned()
            .collect();
        self.rows.push(seeded);
        self.rows.len() - 1
    }
}

fn prefixed_attrs(attributes: &[(QName, String)]) -> Vec<(String, String)> {
    attributes
        .iter()
        .map(|(name, value)| {
            (
                format!("{}{}", ATTRIBUTE_PREFIX, name.composed()),
                value.clone(),
            )
        })
        .collect()
}

struct TreeImporter<'p> {
    path: &'p RecordPath,
    tree: ColumnGroupTree,
    record_group: GroupId,
    exceptions: Vec<RecordError>,
    row_base: usize,
    record_index: usize,
    /// Entities currently open within the record being processed; drives
    /// resynchronization after an aborted record.
    record_depth: usize,
}

impl<'p> TreeImporter<'p> {
    fn new(path: &'p RecordPath) -> Self {
        let mut tree = ColumnGroupTree::new();
        let mut group = ColumnGroupTree::ROOT;
        for segment in path {
            group = tree.get_or_create_group(group, segment);
        }
        tree.mark_record_group(group);
        TreeImporter {
            path,
            tree,
            record_group: group,
            exceptions: Vec::new(),
            row_base: 0,
            record_index: 0,
            record_depth: 0,
        }
    }

    fn into_outcome(self, separator: &str) -> ImportOutcome {
        let row_count = self.row_base;
        debug!(
            rows = row_count,
            exceptions = self.exceptions.len(),
            "import pass complete"
        );
        ImportOutcome {
            table: self.tree.finalize(row_count, separator),
            row_count,
            exceptions: self.exceptions,
        }
    }

    /// Pull one token, keeping the record-relative depth bookkeeping honest.
    fn pull<'r>(&mut self, reader: &'r mut dyn TreeReader) -> Result<&'r Token, ReaderError> {
        if !reader.has_next() {
            return Err(ReaderError::EndOfStream);
        }
        let token = reader.next()?;
        match token {
            Token::StartEntity { .. } => self.record_depth += 1,
            Token::EndEntity => self.record_depth = self.record_depth.saturating_sub(1),
            _ => {}
        }
        Ok(token)
    }

    /// Seeking: scan the entities at one nesting level for `path[depth]`,
    /// descending on a match and skipping unmatched subtrees whole.
    fn seek_level(
        &mut self,
        reader: &mut dyn TreeReader,
        depth: usize,
    ) -> Result<(), ImportError> {
        while reader.has_next() {
            match self.pull(reader) {
                Ok(Token::StartEntity { name, .. }) => {
                    let matched = name.composed() == self.path[depth];
                    if matched && depth + 1 == self.path.len() {
                        self.process_record(reader);
                    } else if matched {
                        self.seek_level(reader, depth + 1)?;
                    } else if let Err(err) = self.skip_subtree(reader) {
                        self.seek_failure(err)?;
                    }
                }
                // The enclosing element closed; hand control back up.
                Ok(Token::EndEntity) => return Ok(()),
                Ok(_) => {}
                Err(err) => self.seek_failure(err)?,
            }
        }
        Ok(())
    }

    /// A tokenizer failure outside any record is fatal only while nothing
    /// has been imported yet.
    fn seek_failure(&mut self, source: ReaderError) -> Result<(), ImportError> {
        if self.row_base == 0 && self.exceptions.is_empty() {
            return Err(source.into());
        }
        warn!(error = %source, "tokenizer failed between records");
        self.exceptions.push(RecordError {
            record_index: self.record_index,
            row_base: self.row_base,
            source,
        });
        Ok(())
    }

    /// InRecord + Flushing: the cursor sits on the record's start token.
    /// A reader failure aborts this record only; the buffered rows are
    /// discarded and the engine resynchronizes at the record's close.
    fn process_record(&mut self, reader: &mut dyn TreeReader) {
        self.record_depth = 1;
        let mut buffer = RecordBuffer::new();

        let attrs = match reader.current() {
            Token::StartEntity { attributes, .. } => prefixed_attrs(attributes),
            _ => Vec::new(),
        };
        for (key, value) in attrs {
            let column = self.tree.get_or_create_column(self.record_group, &key);
            buffer.write(0, column, value);
        }

        match self.descend_group(reader, self.record_group, &mut buffer, 0) {
            Ok(()) => self.flush(buffer),
            Err(source) => {
                warn!(
                    record = self.record_index,
                    error = %source,
                    "record aborted, resynchronizing"
                );
                self.exceptions.push(RecordError {
                    record_index: self.record_index,
                    row_base: self.row_base,
                    source,
                });
                self.resync(reader);
            }
        }
        self.record_index += 1;
    }

    /// Commit the buffered rows at the running row index.
    fn flush(&mut self, buffer: RecordBuffer) {
        let row_count = buffer.rows.len();
        for (offset, cells) in buffer.rows.into_iter().enumerate() {
            for (column, value) in cells {
                self.tree.write_cell(column, self.row_base + offset, value);
            }
        }
        self.row_base += row_count;
    }

    /// After an aborted record, consume tokens until the record frame
    /// closes or the tokenizer gives out.
    fn resync(&mut self, reader: &mut dyn TreeReader) {
        while self.record_depth > 0 && reader.has_next() {
            if self.pull(reader).is_err() {
                return;
            }
        }
    }

    fn descend_group(
        &mut self,
        reader: &mut dyn TreeReader,
        group: GroupId,
        buffer: &mut RecordBuffer,
        row: usize,
    ) -> Result<(), ReaderError> {
        let mut seen = HashMap::new();
        self.descend_body(reader, group, buffer, row, &mut seen)
    }

    /// Consume the body of an element bound to `group`, writing cells at
    /// `row`. Returns once the matching end token has been consumed.
    fn descend_body(
        &mut self,
        reader: &mut dyn TreeReader,
        group: GroupId,
        buffer: &mut RecordBuffer,
        row: usize,
        seen: &mut HashMap<String, usize>,
    ) -> Result<(), ReaderError> {
        loop {
            match self.pull(reader)? {
                Token::EndEntity => return Ok(()),
                Token::Value(piece) => {
                    let piece = piece.clone();
                    let column = self.tree.get_or_create_column(group, TEXT_KEY);
                    buffer.write(row, column, piece);
                }
                Token::StartEntity { name, attributes } => {
                    let child = name.composed();
                    let attrs = prefixed_attrs(attributes);
                    let count = seen.entry(child.clone()).or_insert(0);
                    *count += 1;
                    // A repeated direct sibling fans out into a fresh row;
                    // distinct siblings stay on their parent's row.
                    let target = if *count > 1 {
                        buffer.fan_out(row, group, &self.tree)
                    } else {
                        row
                    };
                    self.process_child(reader, group, &child, attrs, buffer, target)?;
                }
                Token::Ignorable => {}
            }
        }
    }

    /// One child element under `group`: scalar until proven otherwise.
    /// Attributes or nested elements promote it to a group; an element that
    /// closes with only text becomes a leaf column on the parent. The first
    /// occurrence of a name fixes its kind for the rest of the pass.
    fn process_child(
        &mut self,
        reader: &mut dyn TreeReader,
        parent: GroupId,
        name: &str,
        attrs: Vec<(String, String)>,
        buffer: &mut RecordBuffer,
        row: usize,
    ) -> Result<(), ReaderError> {
        let known_group = self.tree.is_group(parent, name);
        let known_scalar = self.tree.is_scalar(parent, name);

        if known_scalar && !attrs.is_empty() {
            warn!(
                field = name,
                "attributes on a field first seen as scalar; keeping it scalar"
            );
        }

        if known_group || (!known_scalar && !attrs.is_empty()) {
            let group = self.tree.get_or_create_group(parent, name);
            for (key, value) in attrs {
                let column = self.tree.get_or_create_column(group, &key);
                buffer.write(row, column, value);
            }
            return self.descend_group(reader, group, buffer, row);
        }

        // Scalar, or undecided: gather direct text and settle the kind at
        // the closing token.
        let mut text: Option<String> = None;
        loop {
            match self.pull(reader)? {
                Token::EndEntity => break,
                Token::Value(piece) => {
                    text.get_or_insert_with(String::new).push_str(piece);
                }
                Token::StartEntity {
                    name: child_name,
                    attributes,
                } => {
                    if known_scalar {
                        warn!(
                            field = name,
                            child = %child_name,
                            "nested structure under a field first seen as scalar; skipped"
                        );
                        self.skip_subtree(reader)?;
                    } else {
                        // Structured after all: promote to a group, moving
                        // gathered text into the group's own text column.
                        let grandchild = child_name.composed();
                        let grandchild_attrs = prefixed_attrs(attributes);
                        let group = self.tree.get_or_create_group(parent, name);
                        if let Some(gathered) = text.take() {
                            let column = self.tree.get_or_create_column(group, TEXT_KEY);
                            buffer.write(row, column, gathered);
                        }
                        let mut seen = HashMap::new();
                        seen.insert(grandchild.clone(), 1usize);
                        self.process_child(reader, group, &grandchild, grandchild_attrs, buffer, row)?;
                        return self.descend_body(reader, group, buffer, row, &mut seen);
                    }
                }
                Token::Ignorable => {}
            }
        }

        if let Some(gathered) = text {
            let column = self.tree.get_or_create_column(parent, name);
            buffer.write(row, column, gathered);
        }
        Ok(())
    }

    /// Consume tokens until the entity whose start was just pulled closes.
    fn skip_subtree(&mut self, reader: &mut dyn TreeReader) -> Result<(), ReaderError> {
        let mut open = 1usize;
        while open > 0 {
            match self.pull(reader)? {
                Token::StartEntity { .. } => open += 1,
                Token::EndEntity => open -= 1,
                _ => {}
            }
        }
        Ok(())
    }
}
