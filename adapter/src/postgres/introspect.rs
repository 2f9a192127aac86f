//! PostgreSQL schema introspection
//!
//! Two-query strategy per batch: one scan of `information_schema.columns`
//! for the basic attributes, then one pass over `pg_constraint` joined
//! through `UNNEST(conkey) WITH ORDINALITY` to classify columns as
//! PRIMARY / UNIQUE / FOREIGN KEY with the matching referenced column.
//! Secondary indexes come from `pg_indexes` with constraint-backing
//! indexes filtered out. The schema namespace tolerates both
//! `current_schema()` and `public` to accommodate branch schemas.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;
use sqlx::{PgPool, Row};

use model::{Column, EnumType, Index, OnDeleteAction, MIGRATIONS_TABLE};

use crate::AdapterError;

/// Column list at the tail of a `pg_indexes.indexdef`.
static INDEXDEF_COLUMNS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\(([^()]*)\)\s*$").unwrap());

fn introspection_err(object: impl Into<String>) -> impl FnOnce(sqlx::Error) -> AdapterError {
    let object = object.into();
    move |source| AdapterError::Introspection { object, source }
}

/// All user tables, ledger excluded, ordered by name.
pub(crate) async fn list_table_names(pool: &PgPool) -> Result<Vec<String>, AdapterError> {
    let rows = sqlx::query(
        r"
        SELECT table_name
        FROM information_schema.tables
        WHERE table_schema IN (current_schema(), 'public')
          AND table_type = 'BASE TABLE'
          AND table_name <> $1
        ORDER BY table_name
        ",
    )
    .bind(MIGRATIONS_TABLE)
    .fetch_all(pool)
    .await
    .map_err(introspection_err("table list"))?;

    Ok(rows
        .into_iter()
        .map(|row| row.get::<String, _>("table_name").to_lowercase())
        .collect())
}

/// Batched column introspection for `names`.
pub(crate) async fn tables_columns(
    pool: &PgPool,
    names: &[String],
) -> Result<HashMap<String, Vec<Column>>, AdapterError> {
    let mut columns: HashMap<String, Vec<Column>> =
        names.iter().map(|n| (n.clone(), Vec::new())).collect();
    if names.is_empty() {
        return Ok(columns);
    }

    let rows = sqlx::query(
        r"
        SELECT table_name, column_name, data_type, udt_name, is_nullable, column_default,
               character_maximum_length, numeric_precision, numeric_scale
        FROM information_schema.columns
        WHERE table_schema IN (current_schema(), 'public')
          AND table_name = ANY($1)
        ORDER BY table_name, ordinal_position
        ",
    )
    .bind(names)
    .fetch_all(pool)
    .await
    .map_err(introspection_err(format!("columns of {}", names.join(", "))))?;

    for row in rows {
        let table: String = row.get::<String, _>("table_name").to_lowercase();
        let mut column = Column::new(
            row.get::<String, _>("column_name").to_lowercase(),
            normalize_type(
                &row.get::<String, _>("data_type"),
                &row.get::<String, _>("udt_name"),
                row.get::<Option<i32>, _>("character_maximum_length"),
                row.get::<Option<i32>, _>("numeric_precision"),
                row.get::<Option<i32>, _>("numeric_scale"),
            ),
        );
        column.nullable = row.get::<String, _>("is_nullable") == "YES";
        let (default, auto_increment) =
            normalize_default(row.get::<Option<String>, _>("column_default"));
        column.default = default;
        column.is_auto_increment = auto_increment;

        if let Some(entry) = columns.get_mut(&table) {
            entry.push(column);
        }
    }

    apply_constraints(pool, names, &mut columns).await?;
    Ok(columns)
}

/// Overlay PRIMARY / UNIQUE / FOREIGN KEY classification onto the columns.
async fn apply_constraints(
    pool: &PgPool,
    names: &[String],
    columns: &mut HashMap<String, Vec<Column>>,
) -> Result<(), AdapterError> {
    let rows = sqlx::query(
        r"
        SELECT rel.relname AS table_name,
               att.attname AS column_name,
               con.contype::text AS constraint_type,
               cardinality(con.conkey) AS span,
               con.confdeltype::text AS delete_action,
               frel.relname AS foreign_table_name,
               fatt.attname AS foreign_column_name
        FROM pg_constraint con
        JOIN pg_class rel ON rel.oid = con.conrelid
        JOIN pg_namespace nsp ON nsp.oid = rel.relnamespace
        JOIN LATERAL UNNEST(con.conkey) WITH ORDINALITY AS ck(attnum, ord) ON TRUE
        JOIN pg_attribute att ON att.attrelid = con.conrelid AND att.attnum = ck.attnum
        LEFT JOIN pg_class frel ON frel.oid = con.confrelid
        LEFT JOIN LATERAL UNNEST(con.confkey) WITH ORDINALITY AS cfk(attnum, ord)
               ON cfk.ord = ck.ord
        LEFT JOIN pg_attribute fatt ON fatt.attrelid = con.confrelid AND fatt.attnum = cfk.attnum
        WHERE nsp.nspname IN (current_schema(), 'public')
          AND rel.relname = ANY($1)
          AND con.contype IN ('p', 'u', 'f')
        ",
    )
    .bind(names)
    .fetch_all(pool)
    .await
    .map_err(introspection_err(format!(
        "constraints of {}",
        names.join(", ")
    )))?;

    for row in rows {
        let table: String = row.get::<String, _>("table_name").to_lowercase();
        let column_name: String = row.get::<String, _>("column_name").to_lowercase();
        let Some(column) = columns
            .get_mut(&table)
            .and_then(|cols| cols.iter_mut().find(|c| c.name == column_name))
        else {
            continue;
        };

        match row.get::<String, _>("constraint_type").as_str() {
            "p" => {
                column.is_primary = true;
                column.nullable = false;
            }
            "u" => {
                // Only a single-column constraint maps onto the column flag.
                if row.get::<i32, _>("span") == 1 {
                    column.is_unique = true;
                }
            }
            "f" => {
                if let Some(foreign_table) = row.get::<Option<String>, _>("foreign_table_name") {
                    column.foreign_key_table = foreign_table.to_lowercase();
                    column.foreign_key_column = row
                        .get::<Option<String>, _>("foreign_column_name")
                        .map(|c| c.to_lowercase())
                        .unwrap_or_default();
                    column.on_delete_action =
                        delete_action(&row.get::<String, _>("delete_action"));
                }
            }
            _ => {}
        }
    }

    Ok(())
}

/// Batched secondary-index introspection, excluding indexes that back a
/// constraint.
pub(crate) async fn tables_indexes(
    pool: &PgPool,
    names: &[String],
) -> Result<HashMap<String, Vec<Index>>, AdapterError> {
    let mut indexes: HashMap<String, Vec<Index>> =
        names.iter().map(|n| (n.clone(), Vec::new())).collect();
    if names.is_empty() {
        return Ok(indexes);
    }

    let rows = sqlx::query(
        r"
        SELECT i.tablename, i.indexname, i.indexdef
        FROM pg_indexes i
        LEFT JOIN pg_constraint con ON con.conname = i.indexname
        WHERE i.schemaname IN (current_schema(), 'public')
          AND i.tablename = ANY($1)
          AND con.oid IS NULL
        ORDER BY i.tablename, i.indexname
        ",
    )
    .bind(names)
    .fetch_all(pool)
    .await
    .map_err(introspection_err(format!("indexes of {}", names.join(", "))))?;

    for row in rows {
        let table: String = row.get::<String, _>("tablename").to_lowercase();
        let indexdef: String = row.get("indexdef");
        let index = Index {
            name: row.get::<String, _>("indexname").to_lowercase(),
            table: table.clone(),
            columns: indexdef_columns(&indexdef),
            unique: indexdef.trim_start().to_uppercase().starts_with("CREATE UNIQUE"),
        };
        if let Some(entry) = indexes.get_mut(&table) {
            entry.push(index);
        }
    }

    Ok(indexes)
}

/// Enum types with their values in declared order.
pub(crate) async fn enum_types(pool: &PgPool) -> Result<Vec<EnumType>, AdapterError> {
    let rows = sqlx::query(
        r"
        SELECT t.typname AS name, e.enumlabel AS value
        FROM pg_type t
        JOIN pg_enum e ON e.enumtypid = t.oid
        JOIN pg_namespace n ON n.oid = t.typnamespace
        WHERE n.nspname IN (current_schema(), 'public')
        ORDER BY t.typname, e.enumsortorder
        ",
    )
    .fetch_all(pool)
    .await
    .map_err(introspection_err("enum types"))?;

    let mut enums: Vec<EnumType> = Vec::new();
    for row in rows {
        let name: String = row.get::<String, _>("name").to_lowercase();
        let value: String = row.get("value");
        match enums.last_mut() {
            Some(last) if last.name == name => last.values.push(value),
            _ => enums.push(EnumType {
                name,
                values: vec![value],
            }),
        }
    }
    Ok(enums)
}

/// Canonical upper-case spelling from the information_schema attributes.
fn normalize_type(
    data_type: &str,
    udt_name: &str,
    char_len: Option<i32>,
    precision: Option<i32>,
    scale: Option<i32>,
) -> String {
    match data_type {
        "character varying" => {
            char_len.map_or_else(|| "VARCHAR".to_string(), |n| format!("VARCHAR({n})"))
        }
        "character" => char_len.map_or_else(|| "CHAR".to_string(), |n| format!("CHAR({n})")),
        "timestamp with time zone" => "TIMESTAMP WITH TIME ZONE".to_string(),
        "timestamp without time zone" => "TIMESTAMP".to_string(),
        "time with time zone" => "TIME WITH TIME ZONE".to_string(),
        "time without time zone" => "TIME".to_string(),
        "numeric" => match (precision, scale) {
            (Some(p), Some(s)) => format!("NUMERIC({p},{s})"),
            (Some(p), None) => format!("NUMERIC({p})"),
            _ => "NUMERIC".to_string(),
        },
        "ARRAY" => format!("{}[]", udt_name.trim_start_matches('_').to_uppercase()),
        // Enum and domain columns report USER-DEFINED; the udt carries the
        // type name.
        "USER-DEFINED" => udt_name.to_uppercase(),
        other => other.to_uppercase(),
    }
}

/// Trailing `::type` casts on `pg_attrdef`-derived defaults.
static CAST_SUFFIX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"::[A-Za-z_][A-Za-z0-9_ "\[\]]*$"#).unwrap());

/// Normalize a column default: sequence defaults collapse into the
/// auto-increment flag, cast suffixes are stripped, and bare function
/// spellings are upper-cased so they compare against parsed DDL.
fn normalize_default(raw: Option<String>) -> (String, bool) {
    let Some(raw) = raw else {
        return (String::new(), false);
    };
    if raw.to_ascii_lowercase().starts_with("nextval(") {
        return (String::new(), true);
    }

    let stripped = CAST_SUFFIX_RE.replace(&raw, "").trim().to_string();
    if stripped.starts_with('\'') {
        (stripped, false)
    } else {
        (crate::render::uppercase_outside_quotes(&stripped), false)
    }
}

fn delete_action(code: &str) -> OnDeleteAction {
    match code {
        "c" => OnDeleteAction::Cascade,
        "n" => OnDeleteAction::SetNull,
        "r" => OnDeleteAction::Restrict,
        "d" => OnDeleteAction::SetDefault,
        // "a" is NO ACTION, the backend default; the model keeps the clause
        // absent so it round-trips against DDL that never spelled it.
        _ => OnDeleteAction::None,
    }
}

/// Column names out of an `indexdef` tail like `(lower(email), tenant_id)`.
fn indexdef_columns(indexdef: &str) -> Vec<String> {
    INDEXDEF_COLUMNS_RE
        .captures(indexdef)
        .map(|caps| {
            caps[1]
                .split(',')
                .map(|c| c.trim().trim_matches('"').to_lowercase())
                .filter(|c| !c.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_common_types() {
        assert_eq!(
            normalize_type("character varying", "varchar", Some(255), None, None),
            "VARCHAR(255)"
        );
        assert_eq!(
            normalize_type("timestamp with time zone", "timestamptz", None, None, None),
            "TIMESTAMP WITH TIME ZONE"
        );
        assert_eq!(
            normalize_type("numeric", "numeric", None, Some(10), Some(2)),
            "NUMERIC(10,2)"
        );
        assert_eq!(
            normalize_type("USER-DEFINED", "user_role", None, None, None),
            "USER_ROLE"
        );
        assert_eq!(normalize_type("integer", "int4", None, None, None), "INTEGER");
    }

    #[test]
    fn sequence_defaults_become_auto_increment() {
        let (default, auto) =
            normalize_default(Some("nextval('users_id_seq'::regclass)".to_string()));
        assert!(default.is_empty());
        assert!(auto);
    }

    #[test]
    fn cast_suffixes_are_stripped() {
        let (default, auto) = normalize_default(Some("'member'::user_role".to_string()));
        assert_eq!(default, "'member'");
        assert!(!auto);

        let (default, _) = normalize_default(Some("now()".to_string()));
        assert_eq!(default, "NOW()");
    }

    #[test]
    fn indexdef_columns_are_extracted() {
        assert_eq!(
            indexdef_columns(
                "CREATE INDEX idx_posts_user ON public.posts USING btree (user_id, created_at)"
            ),
            vec!["user_id", "created_at"]
        );
        assert_eq!(
            indexdef_columns("CREATE UNIQUE INDEX idx ON t USING btree (\"Email\")"),
            vec!["email"]
        );
    }

    #[test]
    fn delete_action_codes_map() {
        assert_eq!(delete_action("c"), OnDeleteAction::Cascade);
        assert_eq!(delete_action("n"), OnDeleteAction::SetNull);
        assert_eq!(delete_action("a"), OnDeleteAction::None);
    }
}
