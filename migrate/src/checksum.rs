//! Migration script checksums
//!
//! SHA-256 over the raw script bytes, rendered as lowercase hex. The value
//! is recorded in the ledger when a migration is applied and compared on
//! every later run to detect edits to already-applied scripts.

use sha2::{Digest, Sha256};

/// Lowercase-hex SHA-256 of the script bytes.
#[must_use]
pub fn checksum(script: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(script.as_bytes());
    format!("{:x}", hasher.finalize())
}
