//! Migration status summary

use std::path::Path;

use chrono::{DateTime, Utc};

use adapter::SchemaAdapter;

use crate::checksum::checksum;
use crate::files::list_migration_files;
use crate::MigrateError;

/// Where a migration directory stands relative to the ledger.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationStatus {
    /// Number of applied migrations.
    pub applied: usize,
    /// Ids on disk that have not been applied, in apply order.
    pub pending: Vec<String>,
    /// Applied ids whose scripts are no longer on disk.
    pub missing_from_disk: Vec<String>,
    /// Applied ids whose on-disk scripts no longer match the recorded
    /// checksum.
    pub drifted: Vec<String>,
    /// Finish time of the most recently applied migration.
    pub last_applied_at: Option<DateTime<Utc>>,
}

impl MigrationStatus {
    /// Whether the database is fully caught up with the directory.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.pending.is_empty() && self.drifted.is_empty()
    }
}

/// Summarize the state of `dir` against the connected database's ledger.
///
/// # Errors
///
/// Returns file and adapter errors; unlike the apply path, drift is
/// reported in the summary rather than raised.
pub async fn migration_status(
    adapter: &dyn SchemaAdapter,
    dir: impl AsRef<Path>,
) -> Result<MigrationStatus, MigrateError> {
    let files = list_migration_files(dir)?;
    let applied = adapter.get_applied_migrations().await?;
    let recorded = adapter.get_applied_checksums().await?;

    let mut status = MigrationStatus {
        applied: applied.len(),
        last_applied_at: applied.values().max().copied(),
        ..MigrationStatus::default()
    };

    for file in &files {
        if !applied.contains_key(&file.id) {
            status.pending.push(file.id.clone());
        } else if recorded
            .get(&file.id)
            .is_some_and(|sum| *sum != checksum(&file.script))
        {
            status.drifted.push(file.id.clone());
        }
    }
    for id in applied.keys() {
        if !files.iter().any(|f| &f.id == id) {
            status.missing_from_disk.push(id.clone());
        }
    }

    Ok(status)
}
