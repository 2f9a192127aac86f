//! MySQL schema introspection
//!
//! Everything comes from `information_schema`, batched with `IN (?, …)`
//! placeholder lists so one round trip covers all requested tables.
//! `column_type` is preferred over `data_type`: it carries the exact
//! spelling including display widths and `enum(...)` value lists.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;
use sqlx::{MySqlPool, Row};

use model::{Column, Index, OnDeleteAction, MIGRATIONS_TABLE};

use crate::render::uppercase_outside_quotes;
use crate::AdapterError;

/// Integer display widths, e.g. `int(11)`, which MySQL 8 still reports for
/// tables created by older servers.
static DISPLAY_WIDTH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(TINYINT|SMALLINT|MEDIUMINT|INT|INTEGER|BIGINT)\(\d+\)$").unwrap());

fn introspection_err(object: impl Into<String>) -> impl FnOnce(sqlx::Error) -> AdapterError {
    let object = object.into();
    move |source| AdapterError::Introspection { object, source }
}

fn in_list(len: usize) -> String {
    vec!["?"; len].join(", ")
}

/// All user tables, ledger excluded, ordered by name.
pub(crate) async fn list_table_names(pool: &MySqlPool) -> Result<Vec<String>, AdapterError> {
    let rows = sqlx::query(
        r"
        SELECT table_name AS tbl
        FROM information_schema.tables
        WHERE table_schema = DATABASE()
          AND table_type = 'BASE TABLE'
          AND table_name <> ?
        ORDER BY table_name
        ",
    )
    .bind(MIGRATIONS_TABLE)
    .fetch_all(pool)
    .await
    .map_err(introspection_err("table list"))?;

    Ok(rows
        .into_iter()
        .map(|row| row.get::<String, _>("tbl").to_lowercase())
        .collect())
}

/// Batched column introspection for `names`.
pub(crate) async fn tables_columns(
    pool: &MySqlPool,
    names: &[String],
) -> Result<HashMap<String, Vec<Column>>, AdapterError> {
    let mut columns: HashMap<String, Vec<Column>> =
        names.iter().map(|n| (n.clone(), Vec::new())).collect();
    if names.is_empty() {
        return Ok(columns);
    }

    let sql = format!(
        r"
        SELECT table_name AS tbl, column_name AS col, column_type AS col_type,
               is_nullable AS nullable, column_default AS dflt,
               column_key AS col_key, extra AS extra
        FROM information_schema.columns
        WHERE table_schema = DATABASE() AND table_name IN ({})
        ORDER BY table_name, ordinal_position
        ",
        in_list(names.len())
    );
    let mut query = sqlx::query(&sql);
    for name in names {
        query = query.bind(name);
    }
    let rows = query
        .fetch_all(pool)
        .await
        .map_err(introspection_err(format!("columns of {}", names.join(", "))))?;

    for row in rows {
        let table: String = row.get::<String, _>("tbl").to_lowercase();
        let col_type = normalize_type(&row.get::<String, _>("col_type"));
        let mut column = Column::new(row.get::<String, _>("col").to_lowercase(), col_type);
        column.nullable = row.get::<String, _>("nullable") == "YES";
        column.default = normalize_default(&column.tpe, row.get::<Option<String>, _>("dflt"));

        match row.get::<String, _>("col_key").as_str() {
            "PRI" => {
                column.is_primary = true;
                column.nullable = false;
            }
            "UNI" => column.is_unique = true,
            _ => {}
        }
        if row
            .get::<String, _>("extra")
            .to_ascii_lowercase()
            .contains("auto_increment")
        {
            column.is_auto_increment = true;
            column.default = String::new();
        }

        if let Some(entry) = columns.get_mut(&table) {
            entry.push(column);
        }
    }

    apply_foreign_keys(pool, names, &mut columns).await?;
    Ok(columns)
}

/// Overlay foreign keys from `key_column_usage` joined with
/// `referential_constraints` (which carries the delete rule).
async fn apply_foreign_keys(
    pool: &MySqlPool,
    names: &[String],
    columns: &mut HashMap<String, Vec<Column>>,
) -> Result<(), AdapterError> {
    let sql = format!(
        r"
        SELECT k.table_name AS tbl, k.column_name AS col,
               k.referenced_table_name AS ref_tbl, k.referenced_column_name AS ref_col,
               r.delete_rule AS delete_rule
        FROM information_schema.key_column_usage k
        JOIN information_schema.referential_constraints r
          ON r.constraint_schema = k.constraint_schema
         AND r.constraint_name = k.constraint_name
        WHERE k.table_schema = DATABASE()
          AND k.table_name IN ({})
          AND k.referenced_table_name IS NOT NULL
        ",
        in_list(names.len())
    );
    let mut query = sqlx::query(&sql);
    for name in names {
        query = query.bind(name);
    }
    let rows = query
        .fetch_all(pool)
        .await
        .map_err(introspection_err(format!(
            "foreign keys of {}",
            names.join(", ")
        )))?;

    for row in rows {
        let table: String = row.get::<String, _>("tbl").to_lowercase();
        let column_name: String = row.get::<String, _>("col").to_lowercase();
        let Some(column) = columns
            .get_mut(&table)
            .and_then(|cols| cols.iter_mut().find(|c| c.name == column_name))
        else {
            continue;
        };

        column.foreign_key_table = row.get::<String, _>("ref_tbl").to_lowercase();
        column.foreign_key_column = row.get::<String, _>("ref_col").to_lowercase();
        column.on_delete_action = delete_rule(&row.get::<String, _>("delete_rule"));
    }

    Ok(())
}

/// Batched index introspection from `information_schema.statistics`,
/// excluding the PRIMARY index and indexes backing UNIQUE constraints.
pub(crate) async fn tables_indexes(
    pool: &MySqlPool,
    names: &[String],
) -> Result<HashMap<String, Vec<Index>>, AdapterError> {
    let mut indexes: HashMap<String, Vec<Index>> =
        names.iter().map(|n| (n.clone(), Vec::new())).collect();
    if names.is_empty() {
        return Ok(indexes);
    }

    let sql = format!(
        r"
        SELECT s.table_name AS tbl, s.index_name AS idx,
               s.non_unique AS non_unique, s.column_name AS col
        FROM information_schema.statistics s
        LEFT JOIN information_schema.table_constraints tc
          ON tc.table_schema = s.table_schema
         AND tc.table_name = s.table_name
         AND tc.constraint_name = s.index_name
         AND tc.constraint_type = 'UNIQUE'
        WHERE s.table_schema = DATABASE()
          AND s.table_name IN ({})
          AND s.index_name <> 'PRIMARY'
          AND tc.constraint_name IS NULL
        ORDER BY s.table_name, s.index_name, s.seq_in_index
        ",
        in_list(names.len())
    );
    let mut query = sqlx::query(&sql);
    for name in names {
        query = query.bind(name);
    }
    let rows = query
        .fetch_all(pool)
        .await
        .map_err(introspection_err(format!("indexes of {}", names.join(", "))))?;

    for row in rows {
        let table: String = row.get::<String, _>("tbl").to_lowercase();
        let index_name: String = row.get::<String, _>("idx").to_lowercase();
        let column: String = row.get::<String, _>("col").to_lowercase();
        let unique = row.get::<i64, _>("non_unique") == 0;

        let Some(entry) = indexes.get_mut(&table) else {
            continue;
        };
        // Rows arrive ordered by seq_in_index, so appending preserves the
        // column order of composite indexes.
        match entry.iter_mut().find(|i| i.name == index_name) {
            Some(index) => index.columns.push(column),
            None => entry.push(Index {
                name: index_name,
                table: table.clone(),
                columns: vec![column],
                unique,
            }),
        }
    }

    Ok(indexes)
}

/// Canonical spelling from `column_type`: keyword upper-cased with enum
/// values untouched, integer display widths dropped (except the
/// boolean-by-convention `TINYINT(1)`).
fn normalize_type(column_type: &str) -> String {
    let upper = uppercase_outside_quotes(column_type.trim());
    if upper == "TINYINT(1)" {
        return upper;
    }
    if DISPLAY_WIDTH_RE.is_match(&upper) {
        let base = upper.split('(').next().unwrap_or(upper.as_str()).to_string();
        return if base == "INTEGER" { "INT".to_string() } else { base };
    }
    if upper == "INTEGER" {
        return "INT".to_string();
    }
    upper
}

/// Re-quote textual defaults (MySQL reports them bare), keep
/// CURRENT_TIMESTAMP spellings, and pass numeric defaults through.
fn normalize_default(column_type: &str, raw: Option<String>) -> String {
    let Some(raw) = raw else {
        return String::new();
    };
    if raw.eq_ignore_ascii_case("null") {
        return String::new();
    }
    let upper = raw.to_ascii_uppercase();
    if upper.starts_with("CURRENT_TIMESTAMP") || upper.starts_with("NOW()") {
        return upper;
    }
    if is_textual(column_type) && !raw.starts_with('\'') {
        return format!("'{}'", raw.replace('\'', "''"));
    }
    if raw.starts_with('\'') {
        raw
    } else {
        // Bare defaults canonicalize to upper case, same as the parser.
        uppercase_outside_quotes(&raw)
    }
}

fn is_textual(column_type: &str) -> bool {
    let upper = column_type.to_ascii_uppercase();
    ["CHAR", "VARCHAR", "TEXT", "ENUM", "SET", "DATE", "TIME", "YEAR", "JSON"]
        .iter()
        .any(|prefix| upper.starts_with(prefix))
}

fn delete_rule(rule: &str) -> OnDeleteAction {
    match rule.to_ascii_uppercase().as_str() {
        "CASCADE" => OnDeleteAction::Cascade,
        "SET NULL" => OnDeleteAction::SetNull,
        "RESTRICT" => OnDeleteAction::Restrict,
        "SET DEFAULT" => OnDeleteAction::SetDefault,
        // NO ACTION is the backend default; keep the clause absent.
        _ => OnDeleteAction::None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enum_types_keep_value_spelling() {
        assert_eq!(normalize_type("enum('on','off')"), "ENUM('on','off')");
    }

    #[test]
    fn display_widths_are_dropped_except_bool() {
        assert_eq!(normalize_type("int(11)"), "INT");
        assert_eq!(normalize_type("bigint(20)"), "BIGINT");
        assert_eq!(normalize_type("tinyint(1)"), "TINYINT(1)");
        assert_eq!(normalize_type("varchar(255)"), "VARCHAR(255)");
    }

    #[test]
    fn textual_defaults_are_requoted() {
        assert_eq!(normalize_default("enum('on','off')", Some("on".to_string())), "'on'");
        assert_eq!(normalize_default("varchar(32)", Some("it's".to_string())), "'it''s'");
        assert_eq!(normalize_default("int", Some("42".to_string())), "42");
        assert_eq!(
            normalize_default("timestamp", Some("CURRENT_TIMESTAMP".to_string())),
            "CURRENT_TIMESTAMP"
        );
        assert_eq!(normalize_default("tinyint(1)", Some("true".to_string())), "TRUE");
        assert_eq!(normalize_default("varchar(32)", None), "");
    }

    #[test]
    fn delete_rules_map() {
        assert_eq!(delete_rule("CASCADE"), OnDeleteAction::Cascade);
        assert_eq!(delete_rule("SET NULL"), OnDeleteAction::SetNull);
        assert_eq!(delete_rule("NO ACTION"), OnDeleteAction::None);
    }
}
