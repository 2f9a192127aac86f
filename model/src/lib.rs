//! Canonical schema model for the Strata migration engine
//!
//! This crate holds the in-memory representation of a database schema shared
//! by the DDL parser, the backend introspectors, the diff engine, and the
//! DDL renderers. Models are transient: constructed per command, compared,
//! rendered, and discarded. The durable state of the engine lives in the
//! migration ledger, represented here by [`MigrationRecord`].

pub mod diff;
pub mod record;
pub mod schema;
pub mod validate;

pub use diff::{ModifiedColumn, SchemaDiff, TableDiff};
pub use record::{MigrationRecord, ABANDONED_AFTER_SECS, MIGRATIONS_TABLE};
pub use schema::{Column, EnumType, Index, OnDeleteAction, Schema, Table};
pub use validate::ValidationError;
