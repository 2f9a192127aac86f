//! End-to-end parser coverage over realistic declarative schemas.

use indoc::indoc;
use model::OnDeleteAction;
use parser::{parse_sql, parse_sql_dir};

#[test]
fn parses_a_full_schema() {
    let sql = indoc! {r"
        -- user accounts
        CREATE TYPE user_role AS ENUM ('admin', 'member', 'guest');

        CREATE TABLE users (
            id SERIAL PRIMARY KEY,
            email VARCHAR(255) UNIQUE NOT NULL,
            role user_role DEFAULT 'member',
            created_at TIMESTAMP WITH TIME ZONE DEFAULT NOW()
        );

        /* posts reference their author */
        CREATE TABLE posts (
            id SERIAL PRIMARY KEY,
            user_id INTEGER NOT NULL,
            title VARCHAR(500) NOT NULL,
            body TEXT,
            FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
        );

        CREATE INDEX idx_posts_user ON posts (user_id);
        CREATE UNIQUE INDEX idx_users_email ON users (email);
    "};

    let parsed = parse_sql(sql, "<inline>").unwrap();

    assert_eq!(parsed.enums.len(), 1);
    assert_eq!(parsed.enums[0].name, "user_role");
    assert_eq!(parsed.enums[0].values, vec!["admin", "member", "guest"]);

    assert_eq!(parsed.tables.len(), 2);
    let users = &parsed.tables[0];
    assert_eq!(users.name, "users");
    assert_eq!(users.columns.len(), 4);
    let id = users.column("id").unwrap();
    assert!(id.is_primary && id.is_auto_increment);
    assert_eq!(id.tpe, "INTEGER");
    let created = users.column("created_at").unwrap();
    assert_eq!(created.tpe, "TIMESTAMP WITH TIME ZONE");
    assert_eq!(created.default, "NOW()");

    let posts = &parsed.tables[1];
    let user_id = posts.column("user_id").unwrap();
    assert_eq!(user_id.foreign_key_table, "users");
    assert_eq!(user_id.on_delete_action, OnDeleteAction::Cascade);

    // Standalone indexes attached to their tables.
    assert!(parsed.standalone_indexes.is_empty());
    assert_eq!(posts.indexes.len(), 1);
    assert_eq!(posts.indexes[0].columns, vec!["user_id"]);
    assert_eq!(users.indexes.len(), 1);
    assert!(users.indexes[0].unique);

    assert!(parsed.to_schema().validate().is_ok());
}

#[test]
fn unknown_statements_are_skipped() {
    let sql = indoc! {r"
        CREATE TABLE t (id INTEGER PRIMARY KEY);
        CREATE VIEW v AS SELECT * FROM t;
        CREATE TRIGGER trg AFTER INSERT ON t BEGIN SELECT 1; END;
    "};
    let parsed = parse_sql(sql, "<inline>").unwrap();
    assert_eq!(parsed.tables.len(), 1);
}

#[test]
fn directory_parse_merges_tables_in_lexical_order() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("01_users.sql"),
        "CREATE TABLE users (id SERIAL PRIMARY KEY, email TEXT NOT NULL);\n",
    )
    .unwrap();
    std::fs::write(
        dir.path().join("02_extra.sql"),
        indoc! {r"
            -- adds a column; an identical re-declaration is tolerated
            CREATE TABLE users (
                email TEXT NOT NULL,
                last_seen TIMESTAMP
            );
            CREATE INDEX idx_users_last_seen ON users (last_seen);
        "},
    )
    .unwrap();

    let parsed = parse_sql_dir(dir.path()).unwrap();
    assert_eq!(parsed.tables.len(), 1);
    let users = &parsed.tables[0];
    assert_eq!(
        users.columns.iter().map(|c| c.name.as_str()).collect::<Vec<_>>(),
        vec!["id", "email", "last_seen"]
    );
    assert_eq!(users.column("email").unwrap().tpe, "TEXT");
    assert_eq!(users.indexes.len(), 1);
}

#[test]
fn conflicting_column_redefinition_is_a_parse_error() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("01_users.sql"),
        "CREATE TABLE users (id SERIAL PRIMARY KEY, email TEXT NOT NULL);\n",
    )
    .unwrap();
    std::fs::write(
        dir.path().join("02_conflict.sql"),
        "CREATE TABLE users (email VARCHAR(64));\n",
    )
    .unwrap();

    let err = parse_sql_dir(dir.path()).unwrap_err();
    assert!(matches!(
        err,
        parser::ParseError::ColumnRedefined { ref table, ref column, .. }
            if table == "users" && column == "email"
    ));
    assert!(err.to_string().contains("redefines column"));
}

#[test]
fn index_declared_before_its_table_still_attaches() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("00_indexes.sql"),
        "CREATE INDEX idx_logs_at ON logs (at);\n",
    )
    .unwrap();
    std::fs::write(
        dir.path().join("10_logs.sql"),
        "CREATE TABLE logs (id SERIAL PRIMARY KEY, at TIMESTAMP);\n",
    )
    .unwrap();

    let parsed = parse_sql_dir(dir.path()).unwrap();
    assert!(parsed.standalone_indexes.is_empty());
    assert_eq!(parsed.tables[0].indexes.len(), 1);
}
