//! The migration driver loop
//!
//! Orchestrates one `migrate` command: prepare the ledger, detect checksum
//! drift, apply pending scripts in id order, and report what happened.
//! Concurrency control needs no lock table: the ledger insert of the
//! started row is the advisory lock, and the loser of a race gets a
//! uniqueness violation and aborts.

use std::collections::HashMap;
use std::path::Path;

use tracing::{info, warn};

use adapter::SchemaAdapter;
use model::Schema;
use parser::ParsedSchema;

use crate::checksum::checksum;
use crate::files::{list_migration_files, new_migration_id, write_migration_file, MigrationFile};
use crate::planner::{coerce_schema_types, render_script};
use crate::MigrateError;

/// Outcome of one apply run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyReport {
    /// Ids applied by this run, in order.
    pub applied: Vec<String>,
    /// Applied ids whose scripts are no longer on disk. Reported, not
    /// fatal: old migrations may have been archived.
    pub missing_from_disk: Vec<String>,
}

/// Driver for one backend connection.
pub struct Migrator<'a> {
    adapter: &'a dyn SchemaAdapter,
}

impl<'a> Migrator<'a> {
    /// Wrap a connected adapter.
    #[must_use]
    pub fn new(adapter: &'a dyn SchemaAdapter) -> Self {
        Self { adapter }
    }

    /// Idempotent ledger setup: create the table, add late-introduced
    /// columns, and garbage-collect abandoned rows.
    ///
    /// # Errors
    ///
    /// Returns the underlying adapter error.
    pub async fn prepare_ledger(&self) -> Result<(), MigrateError> {
        self.adapter.create_migrations_table().await?;
        self.adapter.ensure_migration_table_compatibility().await?;
        self.adapter.cleanup_broken_migration_records().await?;
        Ok(())
    }

    /// Apply every pending migration under `dir`, in id order.
    ///
    /// Checksum drift halts the command before anything is applied: an
    /// applied migration whose on-disk script changed requires human
    /// intervention, and applying more work on top would bury the
    /// evidence.
    ///
    /// # Errors
    ///
    /// [`MigrateError::ChecksumDrift`] on drift, otherwise the first
    /// adapter error. A mid-script failure rolls back that migration
    /// entirely, ledger row included.
    pub async fn apply_pending(&self, dir: impl AsRef<Path>) -> Result<ApplyReport, MigrateError> {
        self.prepare_ledger().await?;

        let files = list_migration_files(dir)?;
        let applied = self.adapter.get_applied_migrations().await?;
        let recorded = self.adapter.get_applied_checksums().await?;

        if let Some((id, recorded_sum, actual)) = find_drift(&files, &recorded) {
            return Err(MigrateError::ChecksumDrift {
                id,
                recorded: recorded_sum,
                actual,
            });
        }

        let missing = missing_from_disk(&applied, &files);
        for id in &missing {
            warn!(migration = id.as_str(), "applied migration is no longer on disk");
        }

        let mut report = ApplyReport {
            missing_from_disk: missing,
            ..ApplyReport::default()
        };

        for file in &files {
            if applied.contains_key(&file.id) {
                continue;
            }
            info!(migration = file.id.as_str(), "applying");
            self.adapter
                .execute_and_record_migration(
                    &file.id,
                    &file.name,
                    &checksum(&file.script),
                    &file.script,
                )
                .await?;
            report.applied.push(file.id.clone());
        }

        if report.applied.is_empty() {
            info!("no pending migrations");
        } else {
            info!(count = report.applied.len(), "migrations applied");
        }
        Ok(report)
    }

    /// Record a migration as applied without executing it, for DDL that
    /// was run out-of-band.
    ///
    /// # Errors
    ///
    /// Returns the underlying adapter error; a uniqueness violation means
    /// the id is already recorded.
    pub async fn mark_applied(&self, file: &MigrationFile) -> Result<(), MigrateError> {
        self.adapter
            .record_migration(&file.id, &file.name, &checksum(&file.script))
            .await?;
        Ok(())
    }

    /// Compute the forward script that advances the connected database to
    /// the desired schema. Empty when there is nothing to do.
    ///
    /// # Errors
    ///
    /// Validation errors (unknown FK target, duplicate names, circular
    /// dependencies) and adapter errors surface here, before any script is
    /// written.
    pub async fn plan(&self, desired: &ParsedSchema) -> Result<String, MigrateError> {
        let current = Schema::new(
            self.adapter.get_current_schema().await?,
            self.adapter.get_current_enums().await?,
        );

        let mut desired_schema = desired.to_schema();
        coerce_schema_types(&mut desired_schema, self.adapter);

        let diff = differ::diff_schemas(&current, &desired_schema, &desired.standalone_indexes)?;
        if diff.is_empty() {
            return Ok(String::new());
        }
        Ok(render_script(&diff, self.adapter)?)
    }

    /// Plan against `desired` and, when there is anything to do, write the
    /// script as a new migration file under `dir`. Returns `None` when the
    /// database already matches the declared schema.
    ///
    /// # Errors
    ///
    /// As [`Migrator::plan`], plus [`MigrateError::Io`] when the file
    /// cannot be written.
    pub async fn plan_into_file(
        &self,
        desired: &ParsedSchema,
        dir: impl AsRef<Path>,
        name: &str,
    ) -> Result<Option<MigrationFile>, MigrateError> {
        let script = self.plan(desired).await?;
        if script.is_empty() {
            return Ok(None);
        }

        let id = new_migration_id(name);
        let path = write_migration_file(dir, &id, &script)?;
        info!(migration = id.as_str(), path = %path.display(), "migration written");
        Ok(Some(MigrationFile {
            name: crate::files::slug(name),
            id,
            path,
            script,
        }))
    }
}

/// First applied migration whose on-disk bytes hash differently than the
/// ledger recorded.
fn find_drift(
    files: &[MigrationFile],
    recorded: &HashMap<String, String>,
) -> Option<(String, String, String)> {
    for file in files {
        if let Some(recorded_sum) = recorded.get(&file.id) {
            let actual = checksum(&file.script);
            if *recorded_sum != actual {
                return Some((file.id.clone(), recorded_sum.clone(), actual));
            }
        }
    }
    None
}

/// Applied ids with no corresponding file on disk.
fn missing_from_disk(
    applied: &std::collections::BTreeMap<String, chrono::DateTime<chrono::Utc>>,
    files: &[MigrationFile],
) -> Vec<String> {
    applied
        .keys()
        .filter(|id| !files.iter().any(|f| &f.id == *id))
        .cloned()
        .collect()
}
