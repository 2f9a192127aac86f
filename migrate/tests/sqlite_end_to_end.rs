//! End-to-end coverage against a real file-backed SQLite database:
//! apply, ledger semantics, rollback, drift detection, and reverse sync.

use adapter::{AdapterError, PoolConfig, SchemaAdapter, SqliteAdapter};
use indoc::indoc;
use migrate::{
    migration_status, pull_schema, write_migration_file, MigrateError, Migrator,
};
use parser::parse_sql;
use tempfile::TempDir;

const SCHEMA_SQL: &str = indoc! {r"
    CREATE TABLE users (
        id INTEGER PRIMARY KEY,
        email VARCHAR(255) UNIQUE NOT NULL,
        status TEXT DEFAULT 'new',
        joined_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
    );
    CREATE TABLE posts (
        id INTEGER PRIMARY KEY,
        user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        title VARCHAR(500) NOT NULL
    );
    CREATE INDEX idx_posts_user ON posts (user_id);
"};

async fn adapter_in(dir: &TempDir) -> SqliteAdapter {
    let url = format!("sqlite://{}", dir.path().join("app.db").display());
    SqliteAdapter::connect(&url, &PoolConfig::default())
        .await
        .expect("open sqlite database")
}

fn seed_migration(dir: &TempDir) -> std::path::PathBuf {
    let migrations = dir.path().join("migrations");
    let parsed = parse_sql(SCHEMA_SQL, "<test>").unwrap();
    let renderer = adapter::renderer_for(adapter::Dialect::Sqlite);
    let diff = differ::diff_schemas(
        &model::Schema::default(),
        &parsed.to_schema(),
        &parsed.standalone_indexes,
    )
    .unwrap();
    let script = migrate::render_script(&diff, renderer).unwrap();
    write_migration_file(&migrations, "20240101000000_init", &script).unwrap();
    migrations
}

#[tokio::test]
async fn apply_then_introspect_matches_declared_schema() {
    let dir = TempDir::new().unwrap();
    let adapter = adapter_in(&dir).await;
    let migrations = seed_migration(&dir);

    let migrator = Migrator::new(&adapter);
    let report = migrator.apply_pending(&migrations).await.unwrap();
    assert_eq!(report.applied, vec!["20240101000000_init"]);

    // The ledger row finished.
    let applied = adapter.get_applied_migrations().await.unwrap();
    assert!(applied.contains_key("20240101000000_init"));

    // Introspection reproduces the declared model: planning again is a
    // no-op.
    let parsed = parse_sql(SCHEMA_SQL, "<test>").unwrap();
    let script = migrator.plan(&parsed).await.unwrap();
    assert_eq!(script, "", "expected an empty plan, got:\n{script}");

    // A second run has nothing to apply.
    let report = migrator.apply_pending(&migrations).await.unwrap();
    assert!(report.applied.is_empty());
}

#[tokio::test]
async fn introspection_detail_round_trips() {
    let dir = TempDir::new().unwrap();
    let adapter = adapter_in(&dir).await;
    let migrations = seed_migration(&dir);
    Migrator::new(&adapter).apply_pending(&migrations).await.unwrap();

    let tables = adapter.get_current_schema().await.unwrap();
    let names: Vec<&str> = tables.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["posts", "users"]);

    let users = tables.iter().find(|t| t.name == "users").unwrap();
    let email = users.column("email").unwrap();
    assert_eq!(email.tpe, "VARCHAR(255)");
    assert!(email.is_unique);
    assert!(!email.nullable);
    let status = users.column("status").unwrap();
    assert_eq!(status.default, "'new'");
    let id = users.column("id").unwrap();
    assert!(id.is_primary && id.is_auto_increment);

    let posts = tables.iter().find(|t| t.name == "posts").unwrap();
    let user_id = posts.column("user_id").unwrap();
    assert_eq!(user_id.foreign_key_table, "users");
    assert_eq!(user_id.foreign_key_column, "id");
    assert_eq!(user_id.on_delete_action, model::OnDeleteAction::Cascade);

    assert_eq!(posts.indexes.len(), 1);
    assert_eq!(posts.indexes[0].name, "idx_posts_user");
    assert_eq!(posts.indexes[0].columns, vec!["user_id"]);

    // The unique constraint's backing index stays out of the model.
    assert!(users.indexes.is_empty());
}

#[tokio::test]
async fn failed_statement_rolls_back_ledger_and_ddl() {
    let dir = TempDir::new().unwrap();
    let adapter = adapter_in(&dir).await;
    Migrator::new(&adapter).prepare_ledger().await.unwrap();

    let script = "CREATE TABLE good (id INTEGER PRIMARY KEY);\nCREATE BROKEN SYNTAX;\n";
    let err = adapter
        .execute_and_record_migration("20240101000000_bad", "bad", "0", script)
        .await
        .unwrap_err();
    assert!(matches!(err, AdapterError::Execution { .. }));

    // Nothing survived the rollback: no table, no ledger row.
    let tables = adapter.get_current_schema().await.unwrap();
    assert!(tables.is_empty());
    assert!(adapter.get_applied_migrations().await.unwrap().is_empty());
}

#[tokio::test]
async fn duplicate_migration_id_loses_the_race() {
    let dir = TempDir::new().unwrap();
    let adapter = adapter_in(&dir).await;
    Migrator::new(&adapter).prepare_ledger().await.unwrap();

    let script = "CREATE TABLE once (id INTEGER PRIMARY KEY);\n";
    adapter
        .execute_and_record_migration("20240101000000_once", "once", "0", script)
        .await
        .unwrap();

    let err = adapter
        .execute_and_record_migration("20240101000000_once", "once", "0", script)
        .await
        .unwrap_err();
    assert!(matches!(err, AdapterError::ConcurrentMigration { .. }));
}

#[tokio::test]
async fn edited_applied_script_is_checksum_drift() {
    let dir = TempDir::new().unwrap();
    let adapter = adapter_in(&dir).await;
    let migrations = seed_migration(&dir);

    let migrator = Migrator::new(&adapter);
    migrator.apply_pending(&migrations).await.unwrap();

    // Edit the applied script on disk.
    let path = migrations.join("20240101000000_init.sql");
    let mut script = std::fs::read_to_string(&path).unwrap();
    script.push_str("-- sneaky edit\n");
    std::fs::write(&path, script).unwrap();

    let err = migrator.apply_pending(&migrations).await.unwrap_err();
    assert!(matches!(err, MigrateError::ChecksumDrift { .. }));

    let status = migration_status(&adapter, &migrations).await.unwrap();
    assert_eq!(status.drifted, vec!["20240101000000_init"]);
    assert!(!status.is_clean());
}

#[tokio::test]
async fn malicious_table_name_never_reaches_a_pragma() {
    let dir = TempDir::new().unwrap();
    let adapter = adapter_in(&dir).await;

    let err = adapter
        .get_table_columns("users; DROP TABLE x--")
        .await
        .unwrap_err();
    assert!(matches!(err, AdapterError::InvalidIdentifier { .. }));
}

#[tokio::test]
async fn record_without_executing_marks_the_migration_applied() {
    let dir = TempDir::new().unwrap();
    let adapter = adapter_in(&dir).await;
    let migrations = seed_migration(&dir);

    let migrator = Migrator::new(&adapter);
    migrator.prepare_ledger().await.unwrap();

    let files = migrate::list_migration_files(&migrations).unwrap();
    migrator.mark_applied(&files[0]).await.unwrap();

    // The runner now considers it applied and executes nothing.
    let report = migrator.apply_pending(&migrations).await.unwrap();
    assert!(report.applied.is_empty());
    assert!(adapter.get_current_schema().await.unwrap().is_empty());
}

#[tokio::test]
async fn pull_regenerates_declarative_source() {
    let dir = TempDir::new().unwrap();
    let adapter = adapter_in(&dir).await;
    let migrations = seed_migration(&dir);
    Migrator::new(&adapter).apply_pending(&migrations).await.unwrap();

    let pulled = pull_schema(&adapter).await.unwrap();
    assert!(pulled.contains("CREATE TABLE \"users\""));
    assert!(pulled.contains("CREATE TABLE \"posts\""));
    assert!(pulled.contains("CREATE INDEX IF NOT EXISTS \"idx_posts_user\""));
    assert!(!pulled.contains("_strata_migrations"));

    // users precedes posts (FK order), and the text parses back cleanly.
    let users_at = pulled.find("CREATE TABLE \"users\"").unwrap();
    let posts_at = pulled.find("CREATE TABLE \"posts\"").unwrap();
    assert!(users_at < posts_at);
    let reparsed = parse_sql(&pulled, "<pulled>").unwrap();
    assert_eq!(reparsed.tables.len(), 2);
}

#[tokio::test]
async fn lowercase_bare_defaults_stay_idempotent() {
    let dir = TempDir::new().unwrap();
    let adapter = adapter_in(&dir).await;
    let migrations = dir.path().join("migrations");

    let sql = indoc! {r"
        CREATE TABLE flags (
            id INTEGER PRIMARY KEY,
            enabled BOOLEAN DEFAULT true,
            seen_at TIMESTAMP DEFAULT current_timestamp
        );
    "};
    let parsed = parse_sql(sql, "<test>").unwrap();

    let migrator = Migrator::new(&adapter);
    migrator.prepare_ledger().await.unwrap();
    let file = migrator
        .plan_into_file(&parsed, &migrations, "flags")
        .await
        .unwrap()
        .expect("initial migration");
    // Bare defaults canonicalize to upper case before rendering.
    assert!(file.script.contains("DEFAULT TRUE"));
    assert!(file.script.contains("DEFAULT CURRENT_TIMESTAMP"));

    migrator.apply_pending(&migrations).await.unwrap();

    // Introspection reads the same canonical spelling back, so planning
    // against the synced database is a no-op.
    let plan = migrator.plan(&parsed).await.unwrap();
    assert_eq!(plan, "", "expected an empty plan, got:\n{plan}");
}

#[tokio::test]
async fn plan_into_file_writes_once_then_goes_quiet() {
    let dir = TempDir::new().unwrap();
    let adapter = adapter_in(&dir).await;
    let migrations = dir.path().join("migrations");

    let migrator = Migrator::new(&adapter);
    migrator.prepare_ledger().await.unwrap();

    let parsed = parse_sql(SCHEMA_SQL, "<test>").unwrap();
    let file = migrator
        .plan_into_file(&parsed, &migrations, "initial schema")
        .await
        .unwrap()
        .expect("a first migration to be planned");
    assert!(file.id.ends_with("_initial_schema"));
    assert!(file.path.exists());

    let report = migrator.apply_pending(&migrations).await.unwrap();
    assert_eq!(report.applied, vec![file.id.clone()]);

    // The database now matches the declared schema; nothing more to plan.
    let again = migrator
        .plan_into_file(&parsed, &migrations, "noop")
        .await
        .unwrap();
    assert!(again.is_none());
}

#[tokio::test]
async fn status_reports_pending_then_clean() {
    let dir = TempDir::new().unwrap();
    let adapter = adapter_in(&dir).await;
    let migrations = seed_migration(&dir);

    let migrator = Migrator::new(&adapter);
    migrator.prepare_ledger().await.unwrap();

    let status = migration_status(&adapter, &migrations).await.unwrap();
    assert_eq!(status.pending, vec!["20240101000000_init"]);
    assert_eq!(status.applied, 0);

    migrator.apply_pending(&migrations).await.unwrap();

    let status = migration_status(&adapter, &migrations).await.unwrap();
    assert!(status.is_clean());
    assert_eq!(status.applied, 1);
    assert!(status.last_applied_at.is_some());
}
