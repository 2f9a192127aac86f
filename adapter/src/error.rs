//! Adapter error taxonomy
//!
//! Every failure carries the context a caller needs to act: the probed
//! object for introspection failures, the offending statement text for
//! execution failures. Partial results are never returned alongside an
//! error.

use thiserror::Error;

use crate::Dialect;

/// Failure inside a backend adapter.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// The connection URL does not name a supported backend.
    #[error("unsupported connection URL scheme in {url:?} (expected postgres://, mysql://, or sqlite://)")]
    UnsupportedScheme { url: String },

    /// Opening or pinging the database failed. Retried per the caller's
    /// retry policy.
    #[error("failed to connect to {dialect} database")]
    Connection {
        dialect: Dialect,
        #[source]
        source: sqlx::Error,
    },

    /// A system-catalog query failed, wrapped with the object it was
    /// probing.
    #[error("introspection failed for {object:?}")]
    Introspection {
        object: String,
        #[source]
        source: sqlx::Error,
    },

    /// A migration DDL statement (or the surrounding commit) failed; the
    /// whole migration was rolled back.
    #[error("migration statement failed: {statement}")]
    Execution {
        statement: String,
        #[source]
        source: sqlx::Error,
    },

    /// The ledger insert lost the race against another migrator.
    #[error("another migration process is active: ledger already holds a row for {id:?}")]
    ConcurrentMigration { id: String },

    /// A query against the migration ledger failed.
    #[error("migration ledger query failed")]
    Ledger {
        #[source]
        source: sqlx::Error,
    },

    /// A table name failed the identifier check that guards textual PRAGMA
    /// substitution.
    #[error("invalid table identifier {name:?}")]
    InvalidIdentifier { name: String },
}

impl AdapterError {
    /// Whether the underlying database error is a uniqueness violation.
    pub(crate) fn unique_violation(err: &sqlx::Error) -> bool {
        matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
    }

    /// Classify a ledger-insert failure: a unique violation means another
    /// migrator holds the id; anything else is a plain ledger error.
    pub(crate) fn from_ledger_insert(id: &str, err: sqlx::Error) -> Self {
        if Self::unique_violation(&err) {
            Self::ConcurrentMigration { id: id.to_string() }
        } else {
            Self::Ledger { source: err }
        }
    }

    /// Whether a fresh attempt could plausibly succeed, used by the
    /// connect retry policy.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Connection { source, .. } => matches!(
                source,
                sqlx::Error::Io(_) | sqlx::Error::Tls(_) | sqlx::Error::PoolTimedOut
            ),
            _ => false,
        }
    }
}
