//! Backend adapters for the Strata migration engine
//!
//! One adapter per dialect (PostgreSQL, MySQL, SQLite), each owning its
//! connection pool and implementing the same capability set: ledger
//! management, schema introspection into the canonical model, and dialect
//! DDL rendering. The implementations differ radically in their
//! introspection queries, which is why this is a trait rather than a
//! tagged enum: per-dialect code keeps its own queries and driver types.

pub mod error;
pub mod mysql;
pub mod pool;
pub mod postgres;
pub mod render;
pub mod retry;
pub mod sqlite;
pub mod url;

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use model::{Column, EnumType, Index, Table};

pub use error::AdapterError;
pub use mysql::MySqlAdapter;
pub use pool::PoolConfig;
pub use postgres::PostgresAdapter;
pub use render::{renderer_for, SqlRenderer};
pub use retry::{with_retry, RetryConfig};
pub use sqlite::SqliteAdapter;

/// The SQL dialects the engine speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dialect {
    Postgres,
    MySql,
    Sqlite,
}

impl Dialect {
    /// Lowercase name, matching the connection URL scheme family.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Postgres => "postgres",
            Self::MySql => "mysql",
            Self::Sqlite => "sqlite",
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The capability set every backend implements.
///
/// Introspection returns the canonical model with names lowercased and the
/// migration ledger filtered out. Rendering comes from the [`SqlRenderer`]
/// supertrait, so a connected adapter can be handed directly to the
/// migration generator.
#[async_trait]
pub trait SchemaAdapter: SqlRenderer {
    /// Check the connection is usable.
    async fn ping(&self) -> Result<(), AdapterError>;

    /// Close the pool, waiting for connections to return.
    async fn close(&self);

    /// Create the migration ledger table if it does not exist. Idempotent.
    async fn create_migrations_table(&self) -> Result<(), AdapterError>;

    /// Add ledger columns introduced after the table shipped (`logs`), so
    /// an old ledger keeps working under a newer engine. Idempotent.
    async fn ensure_migration_table_compatibility(&self) -> Result<(), AdapterError>;

    /// Delete ledger rows that started more than an hour ago and never
    /// finished. Returns the number of rows removed.
    async fn cleanup_broken_migration_records(&self) -> Result<u64, AdapterError>;

    /// Applied migrations: id to finish time, ordered by start time. Only
    /// rows with a non-NULL `finished_at` count as applied.
    async fn get_applied_migrations(
        &self,
    ) -> Result<BTreeMap<String, DateTime<Utc>>, AdapterError>;

    /// Recorded checksums of applied migrations, for drift detection.
    async fn get_applied_checksums(&self) -> Result<HashMap<String, String>, AdapterError>;

    /// Insert a finished ledger row without executing anything, for
    /// migrations whose DDL was applied out-of-band.
    async fn record_migration(
        &self,
        id: &str,
        name: &str,
        checksum: &str,
    ) -> Result<(), AdapterError>;

    /// Apply a forward script inside one transaction: insert the started
    /// ledger row, execute each split statement, set `finished_at`, and
    /// commit. A statement failure rolls back everything including the
    /// ledger row. Returns the number of statements executed.
    async fn execute_and_record_migration(
        &self,
        id: &str,
        name: &str,
        checksum: &str,
        script: &str,
    ) -> Result<u64, AdapterError>;

    /// Introspect the full schema: every user table with columns and
    /// secondary indexes, ledger excluded, ordered by table name.
    async fn get_current_schema(&self) -> Result<Vec<Table>, AdapterError>;

    /// Introspect enum types. Non-PostgreSQL backends return an empty
    /// list.
    async fn get_current_enums(&self) -> Result<Vec<EnumType>, AdapterError>;

    /// Batched column introspection: one round trip for all requested
    /// tables.
    async fn get_all_tables_columns(
        &self,
        names: &[String],
    ) -> Result<HashMap<String, Vec<Column>>, AdapterError>;

    /// Batched index introspection, excluding constraint-backing indexes.
    async fn get_all_tables_indexes(
        &self,
        names: &[String],
    ) -> Result<HashMap<String, Vec<Index>>, AdapterError>;

    /// Single-table column introspection; delegates to the batch form.
    async fn get_table_columns(&self, name: &str) -> Result<Vec<Column>, AdapterError> {
        let mut map = self.get_all_tables_columns(&[name.to_string()]).await?;
        Ok(map.remove(name).unwrap_or_default())
    }

    /// Single-table index introspection; delegates to the batch form.
    async fn get_table_indexes(&self, name: &str) -> Result<Vec<Index>, AdapterError> {
        let mut map = self.get_all_tables_indexes(&[name.to_string()]).await?;
        Ok(map.remove(name).unwrap_or_default())
    }
}

/// Open an adapter for the backend the URL names.
///
/// # Errors
///
/// [`AdapterError::UnsupportedScheme`] for an unknown scheme,
/// [`AdapterError::Connection`] when the backend cannot be reached.
pub async fn connect(
    database_url: &str,
    config: &PoolConfig,
) -> Result<Box<dyn SchemaAdapter>, AdapterError> {
    match url::dialect_of(database_url) {
        Some(Dialect::Postgres) => Ok(Box::new(
            PostgresAdapter::connect(database_url, config).await?,
        )),
        Some(Dialect::MySql) => Ok(Box::new(MySqlAdapter::connect(database_url, config).await?)),
        Some(Dialect::Sqlite) => Ok(Box::new(
            SqliteAdapter::connect(database_url, config).await?,
        )),
        None => Err(AdapterError::UnsupportedScheme {
            url: database_url.to_string(),
        }),
    }
}

/// [`connect`] wrapped in the exponential-backoff retry policy.
///
/// # Errors
///
/// Returns the last connection error when the attempt budget is exhausted.
pub async fn connect_with_retry(
    database_url: &str,
    config: &PoolConfig,
    retry: &RetryConfig,
) -> Result<Box<dyn SchemaAdapter>, AdapterError> {
    with_retry(retry, "connect", || connect(database_url, config)).await
}
