//! SQLite schema introspection
//!
//! The PRAGMA family (`table_info`, `index_list`, `index_info`,
//! `foreign_key_list`) takes no placeholders; every table name is
//! substituted textually and therefore MUST pass the identifier check
//! first. Per-table PRAGMA batches fan out concurrently on a bounded
//! worker group capped at the pool size; the first error fails the whole
//! batch.

use std::collections::HashMap;

use futures::stream::{self, StreamExt, TryStreamExt};
use once_cell::sync::Lazy;
use regex::Regex;
use sqlx::{Row, SqlitePool};

use model::{Column, Index, OnDeleteAction, MIGRATIONS_TABLE};

use crate::render::uppercase_outside_quotes;
use crate::AdapterError;

static IDENTIFIER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap());

/// Reject any name that cannot be substituted into a PRAGMA safely.
pub(crate) fn validate_identifier(name: &str) -> Result<(), AdapterError> {
    if IDENTIFIER_RE.is_match(name) {
        Ok(())
    } else {
        Err(AdapterError::InvalidIdentifier {
            name: name.to_string(),
        })
    }
}

fn introspection_err(object: impl Into<String>) -> impl FnOnce(sqlx::Error) -> AdapterError {
    let object = object.into();
    move |source| AdapterError::Introspection { object, source }
}

/// All user tables, internal SQLite tables and the ledger excluded.
pub(crate) async fn list_table_names(pool: &SqlitePool) -> Result<Vec<String>, AdapterError> {
    let rows = sqlx::query(
        r"
        SELECT name FROM sqlite_master
        WHERE type = 'table' AND name NOT LIKE 'sqlite_%' AND name <> ?
        ORDER BY name
        ",
    )
    .bind(MIGRATIONS_TABLE)
    .fetch_all(pool)
    .await
    .map_err(introspection_err("table list"))?;

    Ok(rows
        .into_iter()
        .map(|row| row.get::<String, _>("name").to_lowercase())
        .collect())
}

/// Concurrent per-table column introspection.
pub(crate) async fn tables_columns(
    pool: &SqlitePool,
    names: &[String],
    fanout: usize,
) -> Result<HashMap<String, Vec<Column>>, AdapterError> {
    let results: Vec<(String, Vec<Column>)> = stream::iter(names.iter().cloned().map(|name| {
        let pool = pool.clone();
        async move {
            let columns = table_columns(&pool, &name).await?;
            Ok::<_, AdapterError>((name, columns))
        }
    }))
    .buffer_unordered(fanout.max(1))
    .try_collect()
    .await?;

    Ok(results.into_iter().collect())
}

/// Concurrent per-table index introspection.
pub(crate) async fn tables_indexes(
    pool: &SqlitePool,
    names: &[String],
    fanout: usize,
) -> Result<HashMap<String, Vec<Index>>, AdapterError> {
    let results: Vec<(String, Vec<Index>)> = stream::iter(names.iter().cloned().map(|name| {
        let pool = pool.clone();
        async move {
            let indexes = table_indexes(&pool, &name).await?;
            Ok::<_, AdapterError>((name, indexes))
        }
    }))
    .buffer_unordered(fanout.max(1))
    .try_collect()
    .await?;

    Ok(results.into_iter().collect())
}

/// One table's columns: `PRAGMA table_info` for the basics, then
/// `foreign_key_list` and the single-column UNIQUE derivation overlaid.
async fn table_columns(pool: &SqlitePool, table: &str) -> Result<Vec<Column>, AdapterError> {
    validate_identifier(table)?;

    let rows = sqlx::query(&format!(r#"PRAGMA table_info("{table}")"#))
        .fetch_all(pool)
        .await
        .map_err(introspection_err(format!("columns of {table}")))?;

    let mut columns = Vec::with_capacity(rows.len());
    for row in rows {
        let tpe = uppercase_outside_quotes(row.get::<String, _>("type").trim());
        let mut column = Column::new(row.get::<String, _>("name").to_lowercase(), tpe);
        let not_null = row.get::<i64, _>("notnull") != 0;
        let pk = row.get::<i64, _>("pk") != 0;
        column.nullable = !not_null && !pk;
        column.is_primary = pk;
        let default = row
            .get::<Option<String>, _>("dflt_value")
            .unwrap_or_default();
        column.default = if default.starts_with('\'') {
            default
        } else {
            // Bare defaults canonicalize to upper case, same as the parser.
            uppercase_outside_quotes(&default)
        };
        // A rowid-aliasing INTEGER PRIMARY KEY auto-assigns; treat it as
        // the auto-increment form.
        if pk && column.tpe == "INTEGER" {
            column.is_auto_increment = true;
        }
        columns.push(column);
    }

    apply_foreign_keys(pool, table, &mut columns).await?;
    apply_unique_flags(pool, table, &mut columns).await?;
    Ok(columns)
}

async fn apply_foreign_keys(
    pool: &SqlitePool,
    table: &str,
    columns: &mut [Column],
) -> Result<(), AdapterError> {
    let rows = sqlx::query(&format!(r#"PRAGMA foreign_key_list("{table}")"#))
        .fetch_all(pool)
        .await
        .map_err(introspection_err(format!("foreign keys of {table}")))?;

    for row in rows {
        let from: String = row.get::<String, _>("from").to_lowercase();
        let Some(column) = columns.iter_mut().find(|c| c.name == from) else {
            continue;
        };
        column.foreign_key_table = row.get::<String, _>("table").to_lowercase();
        // A NULL target column means the reference points at the parent's
        // primary key.
        column.foreign_key_column = row
            .get::<Option<String>, _>("to")
            .map_or_else(|| "id".to_string(), |c| c.to_lowercase());
        column.on_delete_action = row
            .get::<String, _>("on_delete")
            .parse()
            .unwrap_or(OnDeleteAction::None);
        if column.on_delete_action == OnDeleteAction::NoAction {
            // NO ACTION is the backend default; keep the clause absent so
            // it round-trips against DDL that never spelled it.
            column.on_delete_action = OnDeleteAction::None;
        }
    }
    Ok(())
}

/// Mark columns covered by a single-column UNIQUE constraint, derived from
/// `index_list` origin `u` in one pass per table.
async fn apply_unique_flags(
    pool: &SqlitePool,
    table: &str,
    columns: &mut [Column],
) -> Result<(), AdapterError> {
    let index_rows = sqlx::query(&format!(r#"PRAGMA index_list("{table}")"#))
        .fetch_all(pool)
        .await
        .map_err(introspection_err(format!("indexes of {table}")))?;

    for row in index_rows {
        let origin: String = row.get("origin");
        let unique = row.get::<i64, _>("unique") != 0;
        if origin != "u" || !unique {
            continue;
        }
        let index_name: String = row.get("name");
        let members = index_columns(pool, table, &index_name).await?;
        if let [only] = members.as_slice() {
            if let Some(column) = columns.iter_mut().find(|c| &c.name == only) {
                column.is_unique = true;
            }
        }
    }
    Ok(())
}

/// One table's secondary indexes: `index_list` origin `c` entries (those
/// created by `CREATE INDEX`), each expanded through `index_info`.
async fn table_indexes(pool: &SqlitePool, table: &str) -> Result<Vec<Index>, AdapterError> {
    validate_identifier(table)?;

    let rows = sqlx::query(&format!(r#"PRAGMA index_list("{table}")"#))
        .fetch_all(pool)
        .await
        .map_err(introspection_err(format!("indexes of {table}")))?;

    let mut indexes = Vec::new();
    for row in rows {
        let origin: String = row.get("origin");
        let name: String = row.get::<String, _>("name").to_lowercase();
        if origin != "c" || name.starts_with("sqlite_autoindex") {
            continue;
        }
        let columns = index_columns(pool, table, &name).await?;
        indexes.push(Index {
            name,
            table: table.to_string(),
            columns,
            unique: row.get::<i64, _>("unique") != 0,
        });
    }
    Ok(indexes)
}

async fn index_columns(
    pool: &SqlitePool,
    table: &str,
    index: &str,
) -> Result<Vec<String>, AdapterError> {
    validate_identifier(index)?;

    let mut rows = sqlx::query(&format!(r#"PRAGMA index_info("{index}")"#))
        .fetch_all(pool)
        .await
        .map_err(introspection_err(format!("index {index} of {table}")))?;

    rows.sort_by_key(|row| row.get::<i64, _>("seqno"));
    Ok(rows
        .into_iter()
        .filter_map(|row| row.get::<Option<String>, _>("name"))
        .map(|name| name.to_lowercase())
        .collect())
}
