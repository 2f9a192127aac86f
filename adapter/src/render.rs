//! Dialect-aware DDL rendering
//!
//! One renderer per dialect, usable without a live connection: the
//! migration generator and the reverse-sync path render through this trait,
//! and each adapter implements it by delegating to its dialect's renderer.
//! Statements come back without a trailing semicolon; the script assembler
//! terminates them.

use model::{Column, EnumType, Index, Table};

use crate::mysql::MySqlRenderer;
use crate::postgres::PostgresRenderer;
use crate::sqlite::SqliteRenderer;
use crate::Dialect;

/// DDL rendering for one SQL dialect.
pub trait SqlRenderer: Send + Sync {
    /// The dialect this renderer speaks.
    fn dialect(&self) -> Dialect;

    /// Quote an identifier per the dialect's convention.
    fn quote_ident(&self, ident: &str) -> String;

    /// Coerce a raw type spelling (possibly written for another dialect)
    /// into this dialect's spelling.
    fn map_column_type(&self, raw: &str) -> String;

    /// The type portion of a column definition.
    fn format_column_type(&self, column: &Column) -> String {
        self.map_column_type(&column.tpe)
    }

    /// Full `CREATE TABLE` statement.
    fn generate_create_table_sql(&self, table: &Table) -> String;

    /// `ALTER TABLE … ADD COLUMN` statement.
    fn generate_add_column_sql(&self, table: &str, column: &Column) -> String;

    /// `ALTER TABLE … DROP COLUMN` statement.
    fn generate_drop_column_sql(&self, table: &str, column: &str) -> String;

    /// `CREATE [UNIQUE] INDEX` statement.
    fn generate_add_index_sql(&self, index: &Index) -> String;

    /// `DROP INDEX` statement (table-qualified where the dialect needs it).
    fn generate_drop_index_sql(&self, index: &Index) -> String;

    /// `DROP TABLE` statement.
    fn generate_drop_table_sql(&self, table: &str) -> String;

    /// `CREATE TYPE … AS ENUM` statement. Empty for dialects without
    /// standalone enum types; the script assembler skips empty statements.
    fn generate_create_enum_sql(&self, enum_type: &EnumType) -> String {
        let _ = enum_type;
        String::new()
    }

    /// `DROP TYPE` statement. Empty for dialects without standalone enum
    /// types.
    fn generate_drop_enum_sql(&self, name: &str) -> String {
        let _ = name;
        String::new()
    }
}

static POSTGRES: PostgresRenderer = PostgresRenderer;
static MYSQL: MySqlRenderer = MySqlRenderer;
static SQLITE: SqliteRenderer = SqliteRenderer;

/// Offline renderer for a dialect, for callers without a connection.
#[must_use]
pub fn renderer_for(dialect: Dialect) -> &'static dyn SqlRenderer {
    match dialect {
        Dialect::Postgres => &POSTGRES,
        Dialect::MySql => &MYSQL,
        Dialect::Sqlite => &SQLITE,
    }
}

/// Implement [`SqlRenderer`] for an adapter by forwarding every method to
/// its dialect's renderer, so a connected adapter can be used wherever a
/// renderer is expected.
macro_rules! delegate_sql_renderer {
    ($adapter:ty => $renderer:expr) => {
        impl $crate::render::SqlRenderer for $adapter {
            fn dialect(&self) -> $crate::Dialect {
                $crate::render::SqlRenderer::dialect(&$renderer)
            }
            fn quote_ident(&self, ident: &str) -> String {
                $renderer.quote_ident(ident)
            }
            fn map_column_type(&self, raw: &str) -> String {
                $renderer.map_column_type(raw)
            }
            fn format_column_type(&self, column: &model::Column) -> String {
                $renderer.format_column_type(column)
            }
            fn generate_create_table_sql(&self, table: &model::Table) -> String {
                $renderer.generate_create_table_sql(table)
            }
            fn generate_add_column_sql(&self, table: &str, column: &model::Column) -> String {
                $renderer.generate_add_column_sql(table, column)
            }
            fn generate_drop_column_sql(&self, table: &str, column: &str) -> String {
                $renderer.generate_drop_column_sql(table, column)
            }
            fn generate_add_index_sql(&self, index: &model::Index) -> String {
                $renderer.generate_add_index_sql(index)
            }
            fn generate_drop_index_sql(&self, index: &model::Index) -> String {
                $renderer.generate_drop_index_sql(index)
            }
            fn generate_drop_table_sql(&self, table: &str) -> String {
                $renderer.generate_drop_table_sql(table)
            }
            fn generate_create_enum_sql(&self, enum_type: &model::EnumType) -> String {
                $renderer.generate_create_enum_sql(enum_type)
            }
            fn generate_drop_enum_sql(&self, name: &str) -> String {
                $renderer.generate_drop_enum_sql(name)
            }
        }
    };
}
pub(crate) use delegate_sql_renderer;

/// Double embedded quote characters inside an identifier.
pub(crate) fn escape_ident(ident: &str, quote: char) -> String {
    let doubled = format!("{quote}{quote}");
    ident.replace(quote, &doubled)
}

/// Escape a string for inclusion in a single-quoted SQL literal.
pub(crate) fn escape_string(value: &str) -> String {
    value.replace('\'', "''")
}

/// Shared type/default-spelling canonicalization; the parser applies the
/// same transformation on its side, which is what keeps parsed and
/// introspected models comparable.
pub use parser::text::uppercase_outside_quotes;
