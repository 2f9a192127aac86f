//! Model invariant validation
//!
//! Run before diffing: a schema whose foreign keys point at tables that do
//! not exist, or that declares duplicate names, must never reach the
//! renderer.

use std::collections::HashSet;

use thiserror::Error;

use crate::schema::Schema;

/// Violation of a model invariant. Fatal pre-execution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Two tables share a name (case-insensitively).
    #[error("duplicate table name {name:?}")]
    DuplicateTable { name: String },

    /// Two columns of one table share a name (case-insensitively).
    #[error("duplicate column {column:?} in table {table:?}")]
    DuplicateColumn { table: String, column: String },

    /// A foreign key references a table absent from the schema.
    #[error("table {table:?} column {column:?} references non-existent table {references:?}")]
    UnknownForeignKeyTable {
        table: String,
        column: String,
        references: String,
    },
}

impl Schema {
    /// Check the schema invariants: unique table names, unique column names
    /// per table, and every foreign key target present in this schema.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] encountered.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut table_names = HashSet::new();
        for table in &self.tables {
            if !table_names.insert(table.name.to_ascii_lowercase()) {
                return Err(ValidationError::DuplicateTable {
                    name: table.name.clone(),
                });
            }

            let mut column_names = HashSet::new();
            for column in &table.columns {
                if !column_names.insert(column.name.to_ascii_lowercase()) {
                    return Err(ValidationError::DuplicateColumn {
                        table: table.name.clone(),
                        column: column.name.clone(),
                    });
                }
            }
        }

        for table in &self.tables {
            for column in &table.columns {
                if column.has_foreign_key()
                    && !table_names.contains(&column.foreign_key_table.to_ascii_lowercase())
                {
                    return Err(ValidationError::UnknownForeignKeyTable {
                        table: table.name.clone(),
                        column: column.name.clone(),
                        references: column.foreign_key_table.clone(),
                    });
                }
            }
        }

        Ok(())
    }
}
