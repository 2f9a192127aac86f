//! The migration ledger row
//!
//! The ledger is the only durable state the engine owns. One row per
//! migration; a migration counts as applied iff `finished_at` is set. Rows
//! that never finished and are older than [`ABANDONED_AFTER_SECS`] are
//! treated as abandoned and garbage-collected.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Reserved name of the ledger table. Filtered out of every introspection
/// result so it never shows up in a schema diff.
pub const MIGRATIONS_TABLE: &str = "_strata_migrations";

/// Age after which a started-but-unfinished ledger row is considered
/// abandoned (a crashed migrator) and eligible for cleanup.
pub const ABANDONED_AFTER_SECS: i64 = 3600;

/// One row of the migration ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationRecord {
    /// Monotonic identifier, typically `YYYYMMDDHHMMSS_name`.
    pub id: String,
    pub migration_name: String,
    /// SHA-256 of the forward-script bytes, lowercase hex.
    pub checksum: String,
    pub started_at: DateTime<Utc>,
    /// Set on commit; NULL means the migration never completed.
    pub finished_at: Option<DateTime<Utc>>,
    pub applied_steps_count: i32,
    pub logs: Option<String>,
    pub rolled_back_at: Option<DateTime<Utc>>,
}

impl MigrationRecord {
    /// Whether the ledger row represents a successfully applied migration.
    #[must_use]
    pub fn is_applied(&self) -> bool {
        self.finished_at.is_some()
    }
}
