//! PostgreSQL adapter

mod introspect;
mod render;

pub use render::PostgresRenderer;

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use tracing::{debug, info};

use model::{Column, EnumType, Index, Table, ABANDONED_AFTER_SECS, MIGRATIONS_TABLE};

use crate::render::delegate_sql_renderer;
use crate::{AdapterError, Dialect, PoolConfig, SchemaAdapter};

/// Adapter for PostgreSQL, backed by a pooled connection.
pub struct PostgresAdapter {
    pool: PgPool,
}

impl PostgresAdapter {
    /// Open a pooled connection with explicit sizing.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::Connection`] when the server cannot be
    /// reached.
    pub async fn connect(database_url: &str, config: &PoolConfig) -> Result<Self, AdapterError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.acquire_timeout())
            .max_lifetime(config.max_lifetime())
            .idle_timeout(config.idle_timeout())
            .connect(database_url)
            .await
            .map_err(|source| AdapterError::Connection {
                dialect: Dialect::Postgres,
                source,
            })?;

        info!("connected to PostgreSQL");
        Ok(Self { pool })
    }

    /// The underlying pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn ledger_err(source: sqlx::Error) -> AdapterError {
        AdapterError::Ledger { source }
    }
}

delegate_sql_renderer!(PostgresAdapter => PostgresRenderer);

#[async_trait]
impl SchemaAdapter for PostgresAdapter {
    async fn ping(&self) -> Result<(), AdapterError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|source| AdapterError::Connection {
                dialect: Dialect::Postgres,
                source,
            })?;
        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
    }

    async fn create_migrations_table(&self) -> Result<(), AdapterError> {
        let sql = format!(
            r#"
            CREATE TABLE IF NOT EXISTS "{MIGRATIONS_TABLE}" (
                id                  VARCHAR(255) PRIMARY KEY,
                checksum            VARCHAR(64) NOT NULL,
                finished_at         TIMESTAMPTZ,
                migration_name      VARCHAR(255) NOT NULL,
                logs                TEXT,
                rolled_back_at      TIMESTAMPTZ,
                started_at          TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                applied_steps_count INTEGER NOT NULL DEFAULT 0
            )
            "#
        );
        sqlx::query(&sql)
            .execute(&self.pool)
            .await
            .map_err(Self::ledger_err)?;
        Ok(())
    }

    async fn ensure_migration_table_compatibility(&self) -> Result<(), AdapterError> {
        let sql = format!(r#"ALTER TABLE "{MIGRATIONS_TABLE}" ADD COLUMN IF NOT EXISTS logs TEXT"#);
        sqlx::query(&sql)
            .execute(&self.pool)
            .await
            .map_err(Self::ledger_err)?;
        Ok(())
    }

    async fn cleanup_broken_migration_records(&self) -> Result<u64, AdapterError> {
        let sql = format!(
            r#"DELETE FROM "{MIGRATIONS_TABLE}" WHERE finished_at IS NULL AND started_at < NOW() - INTERVAL '{ABANDONED_AFTER_SECS} seconds'"#
        );
        let result = sqlx::query(&sql)
            .execute(&self.pool)
            .await
            .map_err(Self::ledger_err)?;
        if result.rows_affected() > 0 {
            info!(
                removed = result.rows_affected(),
                "removed abandoned migration records"
            );
        }
        Ok(result.rows_affected())
    }

    async fn get_applied_migrations(
        &self,
    ) -> Result<BTreeMap<String, DateTime<Utc>>, AdapterError> {
        let sql = format!(
            r#"SELECT id, finished_at FROM "{MIGRATIONS_TABLE}" WHERE finished_at IS NOT NULL ORDER BY started_at ASC"#
        );
        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(Self::ledger_err)?;
        Ok(rows
            .into_iter()
            .map(|row| (row.get("id"), row.get("finished_at")))
            .collect())
    }

    async fn get_applied_checksums(&self) -> Result<HashMap<String, String>, AdapterError> {
        let sql = format!(
            r#"SELECT id, checksum FROM "{MIGRATIONS_TABLE}" WHERE finished_at IS NOT NULL"#
        );
        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(Self::ledger_err)?;
        Ok(rows
            .into_iter()
            .map(|row| (row.get("id"), row.get("checksum")))
            .collect())
    }

    async fn record_migration(
        &self,
        id: &str,
        name: &str,
        checksum: &str,
    ) -> Result<(), AdapterError> {
        let sql = format!(
            r#"
            INSERT INTO "{MIGRATIONS_TABLE}" (id, migration_name, checksum, started_at, finished_at)
            VALUES ($1, $2, $3, NOW(), NOW())
            "#
        );
        sqlx::query(&sql)
            .bind(id)
            .bind(name)
            .bind(checksum)
            .execute(&self.pool)
            .await
            .map_err(|e| AdapterError::from_ledger_insert(id, e))?;
        Ok(())
    }

    async fn execute_and_record_migration(
        &self,
        id: &str,
        name: &str,
        checksum: &str,
        script: &str,
    ) -> Result<u64, AdapterError> {
        let statements = parser::split_statements(script);

        let mut tx = self.pool.begin().await.map_err(Self::ledger_err)?;

        let insert = format!(
            r#"INSERT INTO "{MIGRATIONS_TABLE}" (id, migration_name, checksum, started_at) VALUES ($1, $2, $3, NOW())"#
        );
        sqlx::query(&insert)
            .bind(id)
            .bind(name)
            .bind(checksum)
            .execute(&mut *tx)
            .await
            .map_err(|e| AdapterError::from_ledger_insert(id, e))?;

        let mut steps: u64 = 0;
        for statement in &statements {
            debug!(migration = id, statement = statement.as_str(), "executing");
            sqlx::query(statement)
                .execute(&mut *tx)
                .await
                .map_err(|source| AdapterError::Execution {
                    statement: statement.clone(),
                    source,
                })?;
            steps += 1;
        }

        let finish = format!(
            r#"UPDATE "{MIGRATIONS_TABLE}" SET finished_at = NOW(), applied_steps_count = $2 WHERE id = $1"#
        );
        sqlx::query(&finish)
            .bind(id)
            .bind(i32::try_from(steps).unwrap_or(i32::MAX))
            .execute(&mut *tx)
            .await
            .map_err(Self::ledger_err)?;

        tx.commit().await.map_err(|source| AdapterError::Execution {
            statement: "COMMIT".to_string(),
            source,
        })?;

        info!(migration = id, steps, "migration applied");
        Ok(steps)
    }

    async fn get_current_schema(&self) -> Result<Vec<Table>, AdapterError> {
        let names = introspect::list_table_names(&self.pool).await?;
        let mut columns = self.get_all_tables_columns(&names).await?;
        let mut indexes = self.get_all_tables_indexes(&names).await?;
        Ok(names
            .into_iter()
            .map(|name| Table {
                columns: columns.remove(&name).unwrap_or_default(),
                indexes: indexes.remove(&name).unwrap_or_default(),
                name,
            })
            .collect())
    }

    async fn get_current_enums(&self) -> Result<Vec<EnumType>, AdapterError> {
        introspect::enum_types(&self.pool).await
    }

    async fn get_all_tables_columns(
        &self,
        names: &[String],
    ) -> Result<HashMap<String, Vec<Column>>, AdapterError> {
        introspect::tables_columns(&self.pool, names).await
    }

    async fn get_all_tables_indexes(
        &self,
        names: &[String],
    ) -> Result<HashMap<String, Vec<Index>>, AdapterError> {
        introspect::tables_indexes(&self.pool, names).await
    }
}
