//! Offline end-to-end scenarios: declarative DDL through the parser, the
//! differ, and the dialect renderers, with no database involved.

use adapter::{renderer_for, Dialect};
use differ::diff_schemas;
use indoc::indoc;
use migrate::{coerce_schema_types, render_script};
use model::{Column, Schema, Table};
use parser::parse_sql;

fn plan_against(current: &Schema, sql: &str, dialect: Dialect) -> Result<String, String> {
    let renderer = renderer_for(dialect);
    let parsed = parse_sql(sql, "<test>").map_err(|e| e.to_string())?;
    let mut desired = parsed.to_schema();
    coerce_schema_types(&mut desired, renderer);
    let diff = diff_schemas(current, &desired, &parsed.standalone_indexes)
        .map_err(|e| e.to_string())?;
    render_script(&diff, renderer).map_err(|e| e.to_string())
}

#[test]
fn empty_database_to_first_table() {
    let script = plan_against(
        &Schema::default(),
        "CREATE TABLE users (id SERIAL PRIMARY KEY, email VARCHAR(255) UNIQUE NOT NULL);",
        Dialect::Postgres,
    )
    .unwrap();

    assert!(script.contains("CREATE TABLE \"users\" ("));
    assert!(script.contains("\"id\" INTEGER PRIMARY KEY"));
    assert!(script.contains("\"email\" VARCHAR(255) UNIQUE NOT NULL"));
}

#[test]
fn adding_one_column_yields_exactly_one_statement() {
    let mut users = Table::new("users");
    let mut id = Column::new("id", "INTEGER");
    id.is_primary = true;
    id.nullable = false;
    users.columns = vec![id, Column::new("name", "TEXT")];
    let current = Schema::new(vec![users], Vec::new());

    let script = plan_against(
        &current,
        indoc! {r"
            CREATE TABLE users (
                id SERIAL PRIMARY KEY,
                name TEXT,
                created_at TIMESTAMP DEFAULT NOW()
            );
        "},
        Dialect::Postgres,
    )
    .unwrap();

    assert_eq!(
        script,
        "ALTER TABLE \"users\" ADD COLUMN IF NOT EXISTS \"created_at\" TIMESTAMP DEFAULT NOW();\n"
    );
}

#[test]
fn declaration_order_does_not_defeat_fk_ordering() {
    // posts is declared first but references users.
    let script = plan_against(
        &Schema::default(),
        indoc! {r"
            CREATE TABLE posts (
                id SERIAL PRIMARY KEY,
                user_id INTEGER REFERENCES users(id)
            );
            CREATE TABLE users (id SERIAL PRIMARY KEY);
        "},
        Dialect::Postgres,
    )
    .unwrap();

    let users_at = script.find("CREATE TABLE \"users\"").unwrap();
    let posts_at = script.find("CREATE TABLE \"posts\"").unwrap();
    assert!(users_at < posts_at);
}

#[test]
fn new_table_may_reference_an_existing_table() {
    let mut users = Table::new("users");
    let mut id = Column::new("id", "INTEGER");
    id.is_primary = true;
    id.nullable = false;
    users.columns.push(id);
    let current = Schema::new(vec![users], Vec::new());

    let script = plan_against(
        &current,
        indoc! {r"
            CREATE TABLE users (id SERIAL PRIMARY KEY);
            CREATE TABLE posts (
                id SERIAL PRIMARY KEY,
                user_id INTEGER REFERENCES users(id)
            );
        "},
        Dialect::Postgres,
    )
    .unwrap();

    // Only posts is new; its reference to the existing users table renders
    // intact.
    assert!(!script.contains("CREATE TABLE \"users\""));
    assert!(script.contains("CREATE TABLE \"posts\""));
    assert!(script.contains("REFERENCES \"users\"(\"id\")"));
}

#[test]
fn mutual_references_are_rejected_with_both_names() {
    let err = plan_against(
        &Schema::default(),
        indoc! {r"
            CREATE TABLE a (id SERIAL PRIMARY KEY, b_id INTEGER REFERENCES b(id));
            CREATE TABLE b (id SERIAL PRIMARY KEY, a_id INTEGER REFERENCES a(id));
        "},
        Dialect::Postgres,
    )
    .unwrap_err();

    assert!(err.contains("circular foreign-key dependency among [a b]"));
}

#[test]
fn foreign_key_to_undeclared_table_is_rejected_before_rendering() {
    let err = plan_against(
        &Schema::default(),
        "CREATE TABLE posts (id SERIAL PRIMARY KEY, user_id INTEGER REFERENCES users(id));",
        Dialect::Postgres,
    )
    .unwrap_err();

    assert!(err.contains("non-existent table"));
    assert!(err.contains("users"));
}

#[test]
fn mysql_enum_column_renders_with_value_list() {
    let script = plan_against(
        &Schema::default(),
        "CREATE TABLE t (status ENUM('on','off') DEFAULT 'on');",
        Dialect::MySql,
    )
    .unwrap();

    assert!(script.contains("`status` ENUM('on','off') DEFAULT 'on'"));
}

#[test]
fn identical_schemas_produce_an_empty_script() {
    let sql = indoc! {r"
        CREATE TABLE users (
            id SERIAL PRIMARY KEY,
            email VARCHAR(255) UNIQUE NOT NULL
        );
    "};
    let renderer = renderer_for(Dialect::Postgres);
    let parsed = parse_sql(sql, "<test>").unwrap();
    let mut desired = parsed.to_schema();
    coerce_schema_types(&mut desired, renderer);

    let diff = diff_schemas(&desired.clone(), &desired, &[]).unwrap();
    assert!(diff.is_empty());
}

#[test]
fn round_trip_through_sqlite_rendering_is_lossless() {
    let sql = indoc! {r"
        CREATE TYPE ignored AS ENUM ('a');
        CREATE TABLE users (
            id SERIAL PRIMARY KEY,
            email VARCHAR(255) UNIQUE NOT NULL,
            bio TEXT,
            joined_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
        );
        CREATE TABLE posts (
            id SERIAL PRIMARY KEY,
            user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            title VARCHAR(500) NOT NULL
        );
        CREATE INDEX idx_posts_user ON posts (user_id);
    "};
    let renderer = renderer_for(Dialect::Sqlite);
    let parsed = parse_sql(sql, "<test>").unwrap();
    let mut desired = parsed.to_schema();
    desired.enums.clear(); // SQLite has no enum types.
    coerce_schema_types(&mut desired, renderer);

    let diff = diff_schemas(&Schema::default(), &desired, &parsed.standalone_indexes).unwrap();
    let script = render_script(&diff, renderer).unwrap();

    let reparsed = parse_sql(&script, "<rendered>").unwrap();
    let mut round_tripped = reparsed.to_schema();
    coerce_schema_types(&mut round_tripped, renderer);

    // Re-diffing the round-tripped model against the original must be a
    // no-op in every category.
    let second = diff_schemas(&round_tripped, &desired, &[]).unwrap();
    assert!(
        second.is_empty(),
        "round-trip changed the model: {second:?}"
    );
}

#[test]
fn splitter_is_stable_over_generated_scripts() {
    let script = plan_against(
        &Schema::default(),
        indoc! {r"
            CREATE TABLE logs (
                id SERIAL PRIMARY KEY,
                message TEXT DEFAULT 'semi;colon',
                at TIMESTAMP
            );
            CREATE INDEX idx_logs_at ON logs (at);
        "},
        Dialect::Postgres,
    )
    .unwrap();

    let statements = parser::split_statements(&script);
    assert_eq!(statements.len(), 2);
    let rejoined = statements.join(";\n");
    assert_eq!(parser::split_statements(&rejoined), statements);
}
