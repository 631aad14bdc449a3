//! The finalized table and the sinks that receive it.

use std::io::Write;

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::{Map, Value};

/// One finalized table column: a name plus row-aligned cells, blanks
/// explicit as `None`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableColumn {
    pub name: String,
    pub cells: Vec<Option<String>>,
}

/// The flat result of an import pass. Every column holds exactly one cell
/// per row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Table {
    pub columns: Vec<TableColumn>,
}

impl Table {
    pub fn row_count(&self) -> usize {
        self.columns.first().map_or(0, |column| column.cells.len())
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|column| column.name.clone()).collect()
    }

    /// Cells of one row in column order.
    pub fn row(&self, index: usize) -> Vec<Option<&str>> {
        self.columns
            .iter()
            .map(|column| column.cells[index].as_deref())
            .collect()
    }

    /// Push the whole table through a sink: columns first, then each row in
    /// order.
    pub fn write_to(&self, sink: &mut dyn TableSink) -> Result<()> {
        sink.create_columns(&self.column_names())?;
        for index in 0..self.row_count() {
            sink.append_row(&self.row(index))?;
        }
        Ok(())
    }
}

/// The external tabular collaborator receiving a finalized import.
pub trait TableSink {
    fn create_columns(&mut self, names: &[String]) -> Result<()>;

    fn append_row(&mut self, cells: &[Option<&str>]) -> Result<()>;

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Writes each row as one JSON object keyed by column name; blank cells
/// serialize as nulls.
pub struct JsonLinesWriter<W: Write> {
    writer: W,
    columns: Vec<String>,
}

impl<W: Write> JsonLinesWriter<W> {
    pub fn new(writer: W) -> Self {
        JsonLinesWriter {
            writer,
            columns: Vec::new(),
        }
    }
}

impl<W: Write> TableSink for JsonLinesWriter<W> {
    fn create_columns(&mut self, names: &[String]) -> Result<()> {
        self.columns = names.to_vec();
        Ok(())
    }

    fn append_row(&mut self, cells: &[Option<&str>]) -> Result<()> {
        let mut data = Map::new();
        for (name, cell) in self.columns.iter().zip(cells) {
            let value = match cell {
                Some(text) => Value::String((*text).to_string()),
                None => Value::Null,
            };
            data.insert(name.clone(), value);
        }
        let json = serde_json::to_string(&Value::Object(data))
            .context("Failed to serialize row")?;
        writeln!(self.writer, "{}", json).context("Failed to write row")?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush().context("Failed to flush writer")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        Table {
            columns: vec![
                TableColumn {
                    name: "sku".to_string(),
                    cells: vec![Some("a".to_string()), Some("b".to_string())],
                },
                TableColumn {
                    name: "@id".to_string(),
                    cells: vec![Some("1".to_string()), None],
                },
            ],
        }
    }

    #[test]
    fn rows_read_across_columns() {
        let table = sample();
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.row(0), vec![Some("a"), Some("1")]);
        assert_eq!(table.row(1), vec![Some("b"), None]);
    }

    #[test]
    fn json_lines_writer_emits_one_object_per_row() {
        let mut buffer = Vec::new();
        let mut sink = JsonLinesWriter::new(&mut buffer);
        sample().write_to(&mut sink).unwrap();
        sink.flush().unwrap();

        let output = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["sku"], "a");
        assert_eq!(first["@id"], "1");

        let second: Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second["@id"], Value::Null);
    }
}
