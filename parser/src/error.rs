//! Parse errors

use std::path::PathBuf;

use thiserror::Error;

/// Maximum statement excerpt length carried in an error.
const EXCERPT_LEN: usize = 120;

/// Fatal DDL parse failure, carrying the originating file (or `<inline>`)
/// and an excerpt of the offending statement.
#[derive(Debug, Error)]
pub enum ParseError {
    /// A `CREATE TABLE` statement without a recognizable name.
    #[error("malformed CREATE TABLE in {origin}: missing table name: {excerpt:?}")]
    MissingTableName { origin: String, excerpt: String },

    /// A `CREATE TABLE` statement whose body parenthesis never closes.
    #[error("malformed CREATE TABLE in {origin}: unbalanced parentheses: {excerpt:?}")]
    UnbalancedParens { origin: String, excerpt: String },

    /// A column definition that could not be parsed.
    #[error("malformed column definition in {origin}, table {table:?}: {excerpt:?}")]
    MalformedColumn {
        origin: String,
        table: String,
        excerpt: String,
    },

    /// A later file redefines a column that an earlier file already declared
    /// with a different definition.
    #[error("table {table:?} redefines column {column:?} in {origin}")]
    ColumnRedefined {
        origin: String,
        table: String,
        column: String,
    },

    /// Schema file or directory could not be read.
    #[error("failed to read schema source {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Shorten a statement for inclusion in an error message.
#[must_use]
pub(crate) fn excerpt(statement: &str) -> String {
    let trimmed = statement.trim();
    if trimmed.len() <= EXCERPT_LEN {
        trimmed.to_string()
    } else {
        let mut end = EXCERPT_LEN;
        while !trimmed.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}…", &trimmed[..end])
    }
}
