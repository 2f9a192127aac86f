//! Forward-script generation
//!
//! Renders a schema diff into one migration script. Statement order is
//! load-bearing: drops come before adds so renames expressed as drop+add
//! never collide, enums precede the tables that use them, new tables are
//! created in FK-topological order, and column adds precede column drops
//! inside a table so data survives an add+drop rename.

use std::collections::HashSet;
use std::fmt::Write as _;

use adapter::SqlRenderer;
use differ::{sort_by_dependencies, DiffError};
use model::{Schema, SchemaDiff, Table};
use tracing::debug;

/// Render the forward script for a diff. Every statement is terminated
/// with `;` and a trailing newline, which keeps the splitter's work
/// trivial.
///
/// # Errors
///
/// Returns a [`DiffError`] when the new tables cannot be ordered (unknown
/// FK target or a circular dependency).
pub fn render_script<R: SqlRenderer + ?Sized>(
    diff: &SchemaDiff,
    renderer: &R,
) -> Result<String, DiffError> {
    let mut script = String::new();
    let mut push = |statement: String| {
        if !statement.is_empty() {
            let _ = writeln!(script, "{statement};");
        }
    };

    for name in &diff.dropped_enums {
        push(renderer.generate_drop_enum_sql(name));
    }
    for name in &diff.dropped_tables {
        push(renderer.generate_drop_table_sql(name));
    }
    for enum_type in &diff.new_enums {
        push(renderer.generate_create_enum_sql(enum_type));
    }

    for name in creation_order(&diff.new_tables)? {
        let Some(table) = diff.new_tables.iter().find(|t| t.name == name) else {
            continue;
        };
        push(renderer.generate_create_table_sql(table));
        for index in &table.indexes {
            push(renderer.generate_add_index_sql(index));
        }
    }

    for table_diff in &diff.modified_tables {
        for column in &table_diff.new_columns {
            push(renderer.generate_add_column_sql(&table_diff.table, column));
        }
        for column in &table_diff.dropped_columns {
            push(renderer.generate_drop_column_sql(&table_diff.table, &column.name));
        }
    }

    for index in &diff.dropped_indexes {
        push(renderer.generate_drop_index_sql(index));
    }
    for index in &diff.new_indexes {
        push(renderer.generate_add_index_sql(index));
    }

    debug!(
        dialect = %renderer.dialect(),
        bytes = script.len(),
        "forward script rendered"
    );
    Ok(script)
}

/// Creation order for the new tables. Only dependencies among the new
/// tables constrain the order: a foreign key into a table that already
/// exists in the database is satisfied regardless, so it is masked out
/// before the sort. Cycles among the new tables still fail.
fn creation_order(new_tables: &[Table]) -> Result<Vec<String>, DiffError> {
    let new_names: HashSet<&str> = new_tables.iter().map(|t| t.name.as_str()).collect();

    let mut orderable = new_tables.to_vec();
    for table in &mut orderable {
        for column in &mut table.columns {
            if column.has_foreign_key() && !new_names.contains(column.foreign_key_table.as_str()) {
                column.foreign_key_table.clear();
                column.foreign_key_column.clear();
            }
        }
    }

    Ok(sort_by_dependencies(&orderable)?
        .into_iter()
        .map(|t| t.name)
        .collect())
}

/// Coerce a desired schema's column types into the connected dialect's
/// spellings, so the diff compares like with like: parsed DDL is
/// backend-neutral while introspection reports dialect-native types.
pub fn coerce_schema_types<R: SqlRenderer + ?Sized>(schema: &mut Schema, renderer: &R) {
    for table in &mut schema.tables {
        for column in &mut table.columns {
            column.tpe = renderer.map_column_type(&column.tpe);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adapter::{renderer_for, Dialect};
    use model::{Column, EnumType, Index, Table, TableDiff};

    fn table(name: &str, fk: Option<(&str, &str)>) -> Table {
        let mut t = Table::new(name);
        let mut id = Column::new("id", "INTEGER");
        id.is_primary = true;
        id.nullable = false;
        t.columns.push(id);
        if let Some((ref_table, ref_col)) = fk {
            let mut col = Column::new(format!("{ref_table}_id"), "INTEGER");
            col.foreign_key_table = ref_table.to_string();
            col.foreign_key_column = ref_col.to_string();
            t.columns.push(col);
        }
        t
    }

    #[test]
    fn new_tables_render_in_dependency_order() {
        // posts listed first, but users must be created first.
        let diff = SchemaDiff {
            new_tables: vec![table("posts", Some(("users", "id"))), table("users", None)],
            ..SchemaDiff::default()
        };
        let script = render_script(&diff, renderer_for(Dialect::Postgres)).unwrap();
        let users_at = script.find("CREATE TABLE \"users\"").unwrap();
        let posts_at = script.find("CREATE TABLE \"posts\"").unwrap();
        assert!(users_at < posts_at);
    }

    #[test]
    fn circular_dependency_fails_before_rendering() {
        let diff = SchemaDiff {
            new_tables: vec![table("a", Some(("b", "id"))), table("b", Some(("a", "id")))],
            ..SchemaDiff::default()
        };
        let err = render_script(&diff, renderer_for(Dialect::Postgres)).unwrap_err();
        assert!(err
            .to_string()
            .contains("circular foreign-key dependency among [a b]"));
    }

    #[test]
    fn drops_precede_adds() {
        let diff = SchemaDiff {
            dropped_tables: vec!["old_stuff".to_string()],
            dropped_enums: vec!["old_mood".to_string()],
            new_enums: vec![EnumType {
                name: "mood".to_string(),
                values: vec!["ok".to_string()],
            }],
            new_tables: vec![table("users", None)],
            ..SchemaDiff::default()
        };
        let script = render_script(&diff, renderer_for(Dialect::Postgres)).unwrap();
        let drop_enum = script.find("DROP TYPE IF EXISTS \"old_mood\";").unwrap();
        let drop_table = script.find("DROP TABLE IF EXISTS \"old_stuff\" CASCADE;").unwrap();
        let create_enum = script.find("CREATE TYPE \"mood\"").unwrap();
        let create_table = script.find("CREATE TABLE \"users\"").unwrap();
        assert!(drop_enum < drop_table);
        assert!(drop_table < create_enum);
        assert!(create_enum < create_table);
    }

    #[test]
    fn column_adds_precede_drops_and_index_drops_precede_adds() {
        let diff = SchemaDiff {
            modified_tables: vec![TableDiff {
                table: "users".to_string(),
                new_columns: vec![Column::new("full_name", "TEXT")],
                dropped_columns: vec![Column::new("name", "TEXT")],
                modified_columns: vec![],
            }],
            dropped_indexes: vec![Index {
                name: "idx_users_name".to_string(),
                table: "users".to_string(),
                columns: vec!["name".to_string()],
                unique: false,
            }],
            new_indexes: vec![Index {
                name: "idx_users_full_name".to_string(),
                table: "users".to_string(),
                columns: vec!["full_name".to_string()],
                unique: false,
            }],
            ..SchemaDiff::default()
        };
        let script = render_script(&diff, renderer_for(Dialect::Postgres)).unwrap();
        let add_col = script.find("ADD COLUMN IF NOT EXISTS \"full_name\"").unwrap();
        let drop_col = script.find("DROP COLUMN IF EXISTS \"name\"").unwrap();
        let drop_idx = script.find("DROP INDEX IF EXISTS \"idx_users_name\"").unwrap();
        let add_idx = script.find("CREATE INDEX IF NOT EXISTS \"idx_users_full_name\"").unwrap();
        assert!(add_col < drop_col);
        assert!(drop_col < drop_idx);
        assert!(drop_idx < add_idx);
    }

    #[test]
    fn statements_end_with_semicolon_and_newline() {
        let diff = SchemaDiff {
            new_tables: vec![table("users", None)],
            ..SchemaDiff::default()
        };
        let script = render_script(&diff, renderer_for(Dialect::Sqlite)).unwrap();
        assert!(script.ends_with(";\n"));
        assert_eq!(parser::split_statements(&script).len(), 1);
    }

    #[test]
    fn mysql_script_has_no_enum_statements() {
        let diff = SchemaDiff {
            new_enums: vec![EnumType {
                name: "mood".to_string(),
                values: vec!["ok".to_string()],
            }],
            dropped_enums: vec!["old".to_string()],
            ..SchemaDiff::default()
        };
        let script = render_script(&diff, renderer_for(Dialect::MySql)).unwrap();
        assert!(script.is_empty());
    }

    #[test]
    fn coercion_maps_types_into_dialect() {
        let mut schema = Schema::new(vec![table("users", None)], Vec::new());
        schema.tables[0].columns.push(Column::new("active", "BOOLEAN"));
        coerce_schema_types(&mut schema, renderer_for(Dialect::MySql));
        assert_eq!(schema.tables[0].columns[1].tpe, "TINYINT(1)");
        assert_eq!(schema.tables[0].columns[0].tpe, "INT");
    }
}
