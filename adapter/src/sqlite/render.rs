//! SQLite DDL rendering
//!
//! SQLite's type system is permissive; most spellings pass through. The
//! exceptions are constructs it has no syntax for (enum value lists, time
//! zones) and the auto-increment form, which must be spelled
//! `INTEGER PRIMARY KEY AUTOINCREMENT`.

use std::fmt::Write as _;

use model::{Column, Index, Table};

use crate::render::{escape_ident, SqlRenderer};
use crate::Dialect;

/// Renderer for the SQLite dialect. Identifiers are double-quoted.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteRenderer;

impl SqliteRenderer {
    fn column_definition(&self, column: &Column) -> String {
        let mut sql = format!(
            "{} {}",
            self.quote_ident(&column.name),
            self.format_column_type(column)
        );
        if column.is_primary {
            sql.push_str(" PRIMARY KEY");
            if column.is_auto_increment {
                sql.push_str(" AUTOINCREMENT");
            }
        } else if column.is_unique {
            sql.push_str(" UNIQUE");
        }
        if !column.nullable && !column.is_primary {
            sql.push_str(" NOT NULL");
        }
        if !column.default.is_empty() {
            let _ = write!(sql, " DEFAULT {}", column.default);
        }
        if column.has_foreign_key() {
            let _ = write!(
                sql,
                " REFERENCES {}({})",
                self.quote_ident(&column.foreign_key_table),
                self.quote_ident(&column.foreign_key_column)
            );
            if !column.on_delete_action.as_str().is_empty() {
                let _ = write!(sql, " ON DELETE {}", column.on_delete_action);
            }
        }
        sql
    }
}

impl SqlRenderer for SqliteRenderer {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    fn quote_ident(&self, ident: &str) -> String {
        format!("\"{}\"", escape_ident(ident, '"'))
    }

    fn map_column_type(&self, raw: &str) -> String {
        let upper = crate::render::uppercase_outside_quotes(raw.trim());
        match upper.as_str() {
            "INT" => "INTEGER".to_string(),
            "TIMESTAMPTZ" | "TIMESTAMP WITH TIME ZONE" | "TIMESTAMP WITHOUT TIME ZONE" => {
                "TIMESTAMP".to_string()
            }
            "DOUBLE PRECISION" | "DOUBLE" => "REAL".to_string(),
            _ if upper.starts_with("ENUM(") => "TEXT".to_string(),
            _ if upper.starts_with("CHARACTER VARYING") => {
                upper.replace("CHARACTER VARYING", "VARCHAR")
            }
            _ => upper,
        }
    }

    fn generate_create_table_sql(&self, table: &Table) -> String {
        let columns: Vec<String> = table
            .columns
            .iter()
            .map(|c| format!("  {}", self.column_definition(c)))
            .collect();
        format!(
            "CREATE TABLE {} (\n{}\n)",
            self.quote_ident(&table.name),
            columns.join(",\n")
        )
    }

    fn generate_add_column_sql(&self, table: &str, column: &Column) -> String {
        format!(
            "ALTER TABLE {} ADD COLUMN {}",
            self.quote_ident(table),
            self.column_definition(column)
        )
    }

    /// Requires SQLite >= 3.35.
    fn generate_drop_column_sql(&self, table: &str, column: &str) -> String {
        format!(
            "ALTER TABLE {} DROP COLUMN {}",
            self.quote_ident(table),
            self.quote_ident(column)
        )
    }

    fn generate_add_index_sql(&self, index: &Index) -> String {
        let unique = if index.unique { "UNIQUE " } else { "" };
        let columns: Vec<String> = index.columns.iter().map(|c| self.quote_ident(c)).collect();
        format!(
            "CREATE {unique}INDEX IF NOT EXISTS {} ON {} ({})",
            self.quote_ident(&index.name),
            self.quote_ident(&index.table),
            columns.join(", ")
        )
    }

    fn generate_drop_index_sql(&self, index: &Index) -> String {
        format!("DROP INDEX IF EXISTS {}", self.quote_ident(&index.name))
    }

    fn generate_drop_table_sql(&self, table: &str) -> String {
        format!("DROP TABLE IF EXISTS {}", self.quote_ident(table))
    }
}
