//! The column group tree: the evolving schema discovered during a pass.
//!
//! Groups mirror the document's nesting and accumulate leaf columns as new
//! paths are seen. The tree grows monotonically during one import pass and
//! is finalized exactly once into concrete table columns.

use indexmap::IndexMap;

use crate::import::table::{Table, TableColumn};

pub type GroupId = usize;
pub type ColumnId = usize;

/// Leaf key for an element's own text content.
pub const TEXT_KEY: &str = "";

/// Prefix keeping attribute leaves from colliding with child element names
/// or the element's own text.
pub const ATTRIBUTE_PREFIX: &str = "@";

/// One node of the schema tree, identified by a qualified name relative to
/// its parent.
#[derive(Debug)]
pub struct ColumnGroup {
    /// Composed qualified name; `None` only for the synthetic root.
    pub name: Option<String>,
    pub parent: Option<GroupId>,
    /// Child groups in first-seen order.
    subgroups: IndexMap<String, GroupId>,
    /// Leaf columns in first-seen order, keyed by leaf key
    /// ([`TEXT_KEY`], `@attr`, or a scalar child's name).
    columns: IndexMap<String, ColumnId>,
    /// Whether this group is the chosen record boundary.
    pub on_record_path: bool,
}

/// A leaf column: cells aligned by row index, `None` marking an explicit
/// blank. The owning group is kept as an index, never a back-pointer.
#[derive(Debug)]
pub struct Column {
    pub group: GroupId,
    pub key: String,
    cells: Vec<Option<String>>,
}

/// Arena of groups and columns grown during one import pass.
///
/// Nodes are addressed by index; identity comparisons in the operations
/// below are index comparisons.
#[derive(Debug)]
pub struct ColumnGroupTree {
    groups: Vec<ColumnGroup>,
    columns: Vec<Column>,
}

impl ColumnGroupTree {
    pub const ROOT: GroupId = 0;

    pub fn new() -> Self {
        ColumnGroupTree {
            groups: vec![ColumnGroup {
                name: None,
                parent: None,
                subgroups: IndexMap::new(),
                columns: IndexMap::new(),
                on_record_path: false,
            }],
            columns: Vec::new(),
        }
    }

    pub fn group(&self, id: GroupId) -> &ColumnGroup {
        &self.groups[id]
    }

    /// Idempotent: returns the existing child when one was already created
    /// this pass.
    pub fn get_or_create_group(&mut self, parent: GroupId, name: &str) -> GroupId {
        if let Some(&existing) = self.groups[parent].subgroups.get(name) {
            return existing;
        }
        let id = self.groups.len();
        self.groups.push(ColumnGroup {
            name: Some(name.to_string()),
            parent: Some(parent),
            subgroups: IndexMap::new(),
            columns: IndexMap::new(),
            on_record_path: false,
        });
        self.groups[parent].subgroups.insert(name.to_string(), id);
        id
    }

    pub fn mark_record_group(&mut self, id: GroupId) {
        self.groups[id].on_record_path = true;
    }

    /// The column under `group` for `key`, created on first use. Creation
    /// order across the whole tree is the final table column order.
    pub fn get_or_create_column(&mut self, group: GroupId, key: &str) -> ColumnId {
        if let Some(&existing) = self.groups[group].columns.get(key) {
            return existing;
        }
        let id = self.columns.len();
        self.columns.push(Column {
            group,
            key: key.to_string(),
            cells: Vec::new(),
        });
        self.groups[group].columns.insert(key.to_string(), id);
        id
    }

    /// Write a cell, padding any skipped rows with blanks so columns never
    /// go ragged.
    pub fn write_cell(&mut self, column: ColumnId, row: usize, value: String) {
        let cells = &mut self.columns[column].cells;
        if cells.len() <= row {
            cells.resize(row + 1, None);
        }
        cells[row] = Some(value);
    }

    /// Convenience combining column creation and the cell write.
    pub fn set_value(&mut self, group: GroupId, key: &str, row: usize, value: String) {
        let column = self.get_or_create_column(group, key);
        self.write_cell(column, row, value);
    }

    /// Whether `name` is registered as a scalar leaf under `group`.
    pub fn is_scalar(&self, group: GroupId, name: &str) -> bool {
        self.groups[group].columns.contains_key(name)
    }

    /// Whether `name` is registered as a child group under `group`.
    pub fn is_group(&self, group: GroupId, name: &str) -> bool {
        self.groups[group].subgroups.contains_key(name)
    }

    pub fn column_group(&self, column: ColumnId) -> GroupId {
        self.columns[column].group
    }

    pub fn column_key(&self, column: ColumnId) -> &str {
        &self.columns[column].key
    }

    /// Whether `candidate` is `group` itself or one of its ancestors.
    pub fn is_ancestor_or_self(&self, candidate: GroupId, group: GroupId) -> bool {
        let mut cursor = Some(group);
        while let Some(id) = cursor {
            if id == candidate {
                return true;
            }
            cursor = self.groups[id].parent;
        }
        false
    }

    /// Materialize the table: one column per leaf, in global first-discovery
    /// order, every column padded to exactly `row_count` cells.
    pub fn finalize(self, row_count: usize, separator: &str) -> Table {
        let names: Vec<String> = (0..self.columns.len())
            .map(|column| self.column_name(column, separator))
            .collect();
        let mut columns = Vec::with_capacity(self.columns.len());
        for (column, name) in self.columns.into_iter().zip(names) {
            let mut cells = column.cells;
            cells.resize(row_count, None);
            columns.push(TableColumn { name, cells });
        }
        Table { columns }
    }

    /// Name a leaf by the path from the record group (exclusive) down to
    /// the leaf, disambiguating same-named leaves under different parents.
    fn column_name(&self, column: ColumnId, separator: &str) -> String {
        let column = &self.columns[column];
        let mut segments: Vec<&str> = Vec::new();
        if !column.key.is_empty() {
            segments.push(&column.key);
        }
        let mut cursor = Some(column.group);
        while let Some(id) = cursor {
            let group = &self.groups[id];
            if group.on_record_path {
                break;
            }
            if let Some(name) = &group.name {
                segments.push(name);
            }
            cursor = group.parent;
        }
        if segments.is_empty() {
            // Text directly on the record element: name it after the element.
            return self.groups[column.group].name.clone().unwrap_or_default();
        }
        segments.reverse();
        segments.join(separator)
    }
}

impl Default for ColumnGroupTree {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_or_create_group_is_idempotent() {
        let mut tree = ColumnGroupTree::new();
        let first = tree.get_or_create_group(ColumnGroupTree::ROOT, "item");
        let second = tree.get_or_create_group(ColumnGroupTree::ROOT, "item");
        assert_eq!(first, second);

        let other = tree.get_or_create_group(ColumnGroupTree::ROOT, "other");
        assert_ne!(first, other);
    }

    #[test]
    fn write_cell_pads_skipped_rows() {
        let mut tree = ColumnGroupTree::new();
        let item = tree.get_or_create_group(ColumnGroupTree::ROOT, "item");
        tree.mark_record_group(item);
        tree.set_value(item, "sku", 2, "late".to_string());

        let table = tree.finalize(4, ".");
        assert_eq!(
            table.columns[0].cells,
            vec![None, None, Some("late".to_string()), None]
        );
    }

    #[test]
    fn columns_keep_global_discovery_order() {
        let mut tree = ColumnGroupTree::new();
        let item = tree.get_or_create_group(ColumnGroupTree::ROOT, "item");
        tree.mark_record_group(item);
        let ship = tree.get_or_create_group(item, "ship");

        tree.set_value(item, "@id", 0, "1".to_string());
        tree.set_value(ship, "port", 0, "a".to_string());
        // Discovered after the ship column despite sitting on the shallower
        // group: order is discovery order, not depth order.
        tree.set_value(item, "note", 0, "n".to_string());

        let table = tree.finalize(1, ".");
        let names: Vec<&str> = table.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["@id", "ship.port", "note"]);
    }

    #[test]
    fn names_derive_from_the_record_group_down() {
        let mut tree = ColumnGroupTree::new();
        let root = tree.get_or_create_group(ColumnGroupTree::ROOT, "root");
        let item = tree.get_or_create_group(root, "item");
        tree.mark_record_group(item);
        let ship = tree.get_or_create_group(item, "ship");

        tree.set_value(item, TEXT_KEY, 0, "t".to_string());
        tree.set_value(ship, TEXT_KEY, 0, "s".to_string());
        tree.set_value(ship, "@kind", 0, "k".to_string());

        let table = tree.finalize(1, ".");
        let names: Vec<&str> = table.columns.iter().map(|c| c.name.as_str()).collect();
        // Ancestors above the record group never appear in names.
        assert_eq!(names, vec!["item", "ship", "ship.@kind"]);
    }

    #[test]
    fn every_column_has_row_count_cells() {
        let mut tree = ColumnGroupTree::new();
        let item = tree.get_or_create_group(ColumnGroupTree::ROOT, "item");
        tree.mark_record_group(item);
        tree.set_value(item, "a", 0, "x".to_string());
        tree.set_value(item, "b", 4, "y".to_string());

        let table = tree.finalize(5, ".");
        for column in &table.columns {
            assert_eq!(column.cells.len(), 5);
        }
    }
}
