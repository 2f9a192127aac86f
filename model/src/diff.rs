//! The diff record produced by comparing two schemas

use serde::{Deserialize, Serialize};

use crate::schema::{Column, EnumType, Index, Table};

/// Per-column modification with a human-readable change list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModifiedColumn {
    pub name: String,
    pub old_type: String,
    pub new_type: String,
    /// Textual change descriptions, e.g. "type changed from X to Y".
    pub changes: Vec<String>,
}

/// Changes to a table that exists in both schemas.
///
/// Dropped columns carry the full column objects, not just the names: a
/// reverse diff needs the type and constraints to re-create them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDiff {
    pub table: String,
    pub new_columns: Vec<Column>,
    pub dropped_columns: Vec<Column>,
    pub modified_columns: Vec<ModifiedColumn>,
}

impl TableDiff {
    /// Whether the table diff records no changes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.new_columns.is_empty()
            && self.dropped_columns.is_empty()
            && self.modified_columns.is_empty()
    }
}

/// The ordered edit list between a current and a desired schema.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaDiff {
    pub new_tables: Vec<Table>,
    pub dropped_tables: Vec<String>,
    pub modified_tables: Vec<TableDiff>,
    pub new_indexes: Vec<Index>,
    pub dropped_indexes: Vec<Index>,
    pub new_enums: Vec<EnumType>,
    pub dropped_enums: Vec<String>,
}

impl SchemaDiff {
    /// Whether the diff records no changes in any category.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.new_tables.is_empty()
            && self.dropped_tables.is_empty()
            && self.modified_tables.is_empty()
            && self.new_indexes.is_empty()
            && self.dropped_indexes.is_empty()
            && self.new_enums.is_empty()
            && self.dropped_enums.is_empty()
    }

    /// Total number of recorded edits, used for log summaries.
    #[must_use]
    pub fn change_count(&self) -> usize {
        self.new_tables.len()
            + self.dropped_tables.len()
            + self
                .modified_tables
                .iter()
                .map(|t| t.new_columns.len() + t.dropped_columns.len() + t.modified_columns.len())
                .sum::<usize>()
            + self.new_indexes.len()
            + self.dropped_indexes.len()
            + self.new_enums.len()
            + self.dropped_enums.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_diff_reports_empty() {
        let diff = SchemaDiff::default();
        assert!(diff.is_empty());
        assert_eq!(diff.change_count(), 0);
    }

    #[test]
    fn change_count_sums_nested_column_edits() {
        let diff = SchemaDiff {
            modified_tables: vec![TableDiff {
                table: "users".to_string(),
                new_columns: vec![Column::new("a", "TEXT")],
                dropped_columns: vec![Column::new("b", "TEXT")],
                modified_columns: vec![ModifiedColumn::default()],
            }],
            ..SchemaDiff::default()
        };
        assert!(!diff.is_empty());
        assert_eq!(diff.change_count(), 3);
    }
}
