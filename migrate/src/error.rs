//! Top-level migration errors

use std::path::PathBuf;

use thiserror::Error;

/// Failure anywhere in the migration pipeline.
#[derive(Debug, Error)]
pub enum MigrateError {
    /// Declarative DDL could not be parsed.
    #[error(transparent)]
    Parse(#[from] parser::ParseError),

    /// Schema validation or diffing failed.
    #[error(transparent)]
    Diff(#[from] differ::DiffError),

    /// A backend operation failed.
    #[error(transparent)]
    Adapter(#[from] adapter::AdapterError),

    /// An applied migration's on-disk script no longer hashes to the value
    /// the ledger recorded. The script was edited after being applied;
    /// human intervention required.
    #[error("checksum drift for applied migration {id:?}: ledger recorded {recorded}, disk has {actual}")]
    ChecksumDrift {
        id: String,
        recorded: String,
        actual: String,
    },

    /// A migration file or directory could not be read or written.
    #[error("failed to access migration path {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
