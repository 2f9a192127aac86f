//! MySQL DDL rendering
//!
//! Cross-dialect type coercion happens here: schemas authored with
//! PostgreSQL spellings render to their MySQL equivalents
//! (`TIMESTAMPTZ` → `TIMESTAMP`, `BOOLEAN` → `TINYINT(1)`, auto-increment
//! integers → `INT … AUTO_INCREMENT`).

use std::fmt::Write as _;

use model::{Column, Index, Table};

use crate::render::{escape_ident, SqlRenderer};
use crate::Dialect;

/// Renderer for the MySQL dialect. Identifiers are backtick-quoted.
#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlRenderer;

impl MySqlRenderer {
    fn column_definition(&self, column: &Column) -> String {
        let mut sql = format!(
            "{} {}",
            self.quote_ident(&column.name),
            self.format_column_type(column)
        );
        if column.is_auto_increment {
            sql.push_str(" AUTO_INCREMENT");
        }
        if column.is_primary {
            sql.push_str(" PRIMARY KEY");
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

impl SqlRenderer for MySqlRenderer {
    fn dialect(&self) -> Dialect {
        Dialect::MySql
    }

    fn quote_ident(&self, ident: &str) -> String {
        format!("`{}`", escape_ident(ident, '`'))
    }

    fn map_column_type(&self, raw: &str) -> String {
        let upper = crate::render::uppercase_outside_quotes(raw.trim());
        match upper.as_str() {
            "INTEGER" => "INT".to_string(),
            "BOOLEAN" | "BOOL" => "TINYINT(1)".to_string(),
            "TIMESTAMPTZ" | "TIMESTAMP WITH TIME ZONE" => "TIMESTAMP".to_string(),
            "TIMESTAMP WITHOUT TIME ZONE" => "TIMESTAMP".to_string(),
            "DOUBLE PRECISION" => "DOUBLE".to_string(),
            "NUMERIC" => "DECIMAL".to_string(),
            _ if upper.starts_with("NUMERIC(") => upper.replace("NUMERIC(", "DECIMAL("),
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
            "CREATE {unique}INDEX {} ON {} ({})",
            self.quote_ident(&index.name),
            self.quote_ident(&index.table),
            columns.join(", ")
        )
    }

    fn generate_drop_index_sql(&self, index: &Index) -> String {
        format!(
            "DROP INDEX {} ON {}",
            self.quote_ident(&index.name),
            self.quote_ident(&index.table)
        )
    }

    fn generate_drop_table_sql(&self, table: &str) -> String {
        format!("DROP TABLE IF EXISTS {}", self.quote_ident(table))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auto_increment_integer_renders_mysql_style() {
        let mut id = Column::new("id", "INTEGER");
        id.is_primary = true;
        id.nullable = false;
        id.is_auto_increment = true;
        assert_eq!(
            MySqlRenderer.column_definition(&id),
            "`id` INT AUTO_INCREMENT PRIMARY KEY"
        );
    }

    #[test]
    fn coerces_postgres_spellings() {
        let r = MySqlRenderer;
        assert_eq!(r.map_column_type("BOOLEAN"), "TINYINT(1)");
        assert_eq!(r.map_column_type("TIMESTAMPTZ"), "TIMESTAMP");
        assert_eq!(r.map_column_type("TIMESTAMP WITH TIME ZONE"), "TIMESTAMP");
        assert_eq!(r.map_column_type("NUMERIC(10,2)"), "DECIMAL(10,2)");
        assert_eq!(r.map_column_type("ENUM('on','off')"), "ENUM('on','off')");
    }

    #[test]
    fn drop_index_is_table_qualified() {
        let index = Index {
            name: "idx_users_email".to_string(),
            table: "users".to_string(),
            columns: vec!["email".to_string()],
            unique: false,
        };
        assert_eq!(
            MySqlRenderer.generate_drop_index_sql(&index),
            "DROP INDEX `idx_users_email` ON `users`"
        );
    }

    #[test]
    fn enum_column_type_survives_rendering() {
        let mut status = Column::new("status", "ENUM('on','off')");
        status.default = "'on'".to_string();
        assert_eq!(
            MySqlRenderer.column_definition(&status),
            "`status` ENUM('on','off') DEFAULT 'on'"
        );
    }
}
