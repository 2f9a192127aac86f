//! Reverse sync: regenerate declarative source from a live database
//!
//! Introspects the connected database and renders it back as declarative
//! DDL: enum types first, tables in FK-topological order, then each
//! table's secondary indexes. The result parses back into the same model,
//! which is what keeps `pull` and `migrate` symmetric.

use std::fmt::Write as _;
use std::path::Path;

use tracing::info;

use adapter::SchemaAdapter;

use crate::MigrateError;

/// Render the connected database's schema as declarative DDL.
///
/// # Errors
///
/// Introspection failures and un-orderable FK graphs surface as errors;
/// nothing is written.
pub async fn pull_schema(adapter: &dyn SchemaAdapter) -> Result<String, MigrateError> {
    let tables = adapter.get_current_schema().await?;
    let enums = adapter.get_current_enums().await?;
    let sorted = differ::sort_by_dependencies(&tables)?;

    let mut out = String::new();
    for enum_type in &enums {
        let statement = adapter.generate_create_enum_sql(enum_type);
        if !statement.is_empty() {
            let _ = writeln!(out, "{statement};\n");
        }
    }
    for table in &sorted {
        let _ = writeln!(out, "{};\n", adapter.generate_create_table_sql(table));
        for index in &table.indexes {
            let _ = writeln!(out, "{};", adapter.generate_add_index_sql(index));
        }
        if !table.indexes.is_empty() {
            out.push('\n');
        }
    }

    info!(
        tables = sorted.len(),
        enums = enums.len(),
        "schema pulled from database"
    );
    Ok(out)
}

/// [`pull_schema`] written to a file.
///
/// # Errors
///
/// As [`pull_schema`], plus [`MigrateError::Io`] when the file cannot be
/// written.
pub async fn pull_schema_to_file(
    adapter: &dyn SchemaAdapter,
    path: impl AsRef<Path>,
) -> Result<(), MigrateError> {
    let path = path.as_ref();
    let schema = pull_schema(adapter).await?;
    std::fs::write(path, schema).map_err(|source| MigrateError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(())
}
