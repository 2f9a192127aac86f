//! Migration executor and ledger orchestration for Strata
//!
//! Ties the pipeline together: declarative files through the parser, live
//! schema through an adapter, the structural diff, the dialect renderer,
//! and the transactional ledger. The flow of a forward migration:
//!
//! 1. parse declarative DDL into the desired model,
//! 2. introspect the database into the current model,
//! 3. diff the two and render the edit list as a forward script,
//! 4. apply pending scripts in id order, each inside one transaction that
//!    also writes its ledger row.

pub mod checksum;
pub mod error;
pub mod files;
pub mod planner;
pub mod pull;
pub mod runner;
pub mod status;

pub use checksum::checksum;
pub use error::MigrateError;
pub use files::{list_migration_files, new_migration_id, write_migration_file, MigrationFile};
pub use planner::{coerce_schema_types, render_script};
pub use pull::{pull_schema, pull_schema_to_file};
pub use runner::{ApplyReport, Migrator};
pub use status::{migration_status, MigrationStatus};
