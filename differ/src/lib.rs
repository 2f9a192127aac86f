//! Structural schema diff engine
//!
//! Compares a current (introspected) schema against a desired (declared)
//! schema and produces the ordered edit list the migration generator
//! renders. Both sides are validated first: a foreign key to an unknown
//! table or duplicate names never reach the renderer.

pub mod columns;
pub mod topo;

use std::collections::HashMap;

use thiserror::Error;
use tracing::debug;

use model::{Index, Schema, SchemaDiff, TableDiff, ValidationError};

pub use columns::compare_columns;
pub use topo::sort_by_dependencies;

/// Pre-execution failure while comparing or ordering schemas.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiffError {
    /// A model invariant was violated.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A foreign key references a table outside the schema being sorted.
    #[error("table {table:?} references non-existent table {references:?}")]
    UnknownReference { table: String, references: String },

    /// The FK graph is cyclic; CREATE order cannot satisfy it.
    #[error("circular foreign-key dependency among [{}]", tables.join(" "))]
    CircularDependency { tables: Vec<String> },
}

/// Compare `current` against `desired` and produce the edit list.
///
/// `standalone_indexes` are desired `CREATE INDEX` statements that were not
/// attached to a table at parse time; they are merged into the desired
/// tables here, deduplicated by index name.
///
/// # Errors
///
/// Returns [`DiffError::Validation`] when either schema violates a model
/// invariant.
pub fn diff_schemas(
    current: &Schema,
    desired: &Schema,
    standalone_indexes: &[Index],
) -> Result<SchemaDiff, DiffError> {
    let desired = merge_standalone_indexes(desired, standalone_indexes);
    current.validate()?;
    desired.validate()?;

    let current_tables = current.tables_by_name();
    let desired_tables = desired.tables_by_name();

    let mut diff = SchemaDiff::default();

    for table in &desired.tables {
        match current_tables.get(table.name.as_str()) {
            None => diff.new_tables.push(table.clone()),
            Some(current_table) => {
                let table_diff = diff_table(current_table, table);
                if !table_diff.is_empty() {
                    diff.modified_tables.push(table_diff);
                }
                diff_indexes(current_table, table, &mut diff);
            }
        }
    }

    for table in &current.tables {
        if !desired_tables.contains_key(table.name.as_str()) {
            diff.dropped_tables.push(table.name.clone());
        }
    }

    diff_enums(current, &desired, &mut diff);

    debug!(changes = diff.change_count(), "schema diff computed");
    Ok(diff)
}

/// Attach standalone desired indexes to their tables, deduplicating by
/// index name. Indexes on tables absent from the desired schema are
/// dropped along with the table itself, so they are skipped here.
fn merge_standalone_indexes(desired: &Schema, standalone: &[Index]) -> Schema {
    let mut merged = desired.clone();
    for index in standalone {
        let Some(table) = merged.tables.iter_mut().find(|t| t.name == index.table) else {
            debug!(index = %index.name, table = %index.table, "standalone index targets an undeclared table");
            continue;
        };
        if !table.indexes.iter().any(|i| i.name == index.name) {
            table.indexes.push(index.clone());
        }
    }
    merged
}

/// Column-level diff for a table that exists on both sides. Dropped columns
/// carry the full column objects so a reverse diff can re-create them.
fn diff_table(current: &model::Table, desired: &model::Table) -> TableDiff {
    let current_columns = current.columns_by_name();
    let desired_columns = desired.columns_by_name();

    let mut table_diff = TableDiff {
        table: desired.name.clone(),
        ..TableDiff::default()
    };

    for column in &desired.columns {
        match current_columns.get(column.name.as_str()) {
            None => table_diff.new_columns.push(column.clone()),
            Some(current_column) => {
                if let Some(modified) = compare_columns(current_column, column) {
                    table_diff.modified_columns.push(modified);
                }
            }
        }
    }

    for column in &current.columns {
        if !desired_columns.contains_key(column.name.as_str()) {
            table_diff.dropped_columns.push(column.clone());
        }
    }

    table_diff
}

/// Index diff for a table present on both sides, keyed by index name. An
/// index whose column list or uniqueness changed is dropped and re-added.
fn diff_indexes(current: &model::Table, desired: &model::Table, diff: &mut SchemaDiff) {
    let current_indexes: HashMap<&str, &Index> =
        current.indexes.iter().map(|i| (i.name.as_str(), i)).collect();
    let desired_indexes: HashMap<&str, &Index> =
        desired.indexes.iter().map(|i| (i.name.as_str(), i)).collect();

    for index in &desired.indexes {
        match current_indexes.get(index.name.as_str()) {
            None => diff.new_indexes.push(index.clone()),
            Some(current_index) => {
                if !indexes_equal(current_index, index) {
                    diff.dropped_indexes.push((*current_index).clone());
                    diff.new_indexes.push(index.clone());
                }
            }
        }
    }

    for index in &current.indexes {
        if !desired_indexes.contains_key(index.name.as_str()) {
            diff.dropped_indexes.push(index.clone());
        }
    }
}

/// Index equality: name, ordered column list, uniqueness.
fn indexes_equal(a: &Index, b: &Index) -> bool {
    a.name == b.name && a.columns == b.columns && a.unique == b.unique
}

/// Enum diff by name. A changed value set is modeled as drop + add; the
/// engine does not emit `ALTER TYPE ADD VALUE`.
fn diff_enums(current: &Schema, desired: &Schema, diff: &mut SchemaDiff) {
    let current_enums: HashMap<&str, &model::EnumType> =
        current.enums.iter().map(|e| (e.name.as_str(), e)).collect();
    let desired_enums: HashMap<&str, &model::EnumType> =
        desired.enums.iter().map(|e| (e.name.as_str(), e)).collect();

    for enum_type in &desired.enums {
        match current_enums.get(enum_type.name.as_str()) {
            None => diff.new_enums.push(enum_type.clone()),
            Some(current_enum) => {
                if current_enum.values != enum_type.values {
                    diff.dropped_enums.push(enum_type.name.clone());
                    diff.new_enums.push(enum_type.clone());
                }
            }
        }
    }

    for enum_type in &current.enums {
        if !desired_enums.contains_key(enum_type.name.as_str()) {
            diff.dropped_enums.push(enum_type.name.clone());
        }
    }
}
