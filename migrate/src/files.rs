//! Migration file management
//!
//! A migration lives in one `.sql` file named `<id>.sql`, where the id is
//! `YYYYMMDDHHMMSS_slug`. Lexical order of the ids is the strict apply
//! order, so the timestamp prefix makes new migrations sort last.

use std::path::{Path, PathBuf};

use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::MigrateError;

static NON_WORD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\W+").unwrap());

/// One migration script on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationFile {
    /// File stem, e.g. `20240101120000_create_users`.
    pub id: String,
    /// Human part of the id, after the timestamp prefix.
    pub name: String,
    pub path: PathBuf,
    /// Forward script contents.
    pub script: String,
}

/// Mint a migration id: timestamp prefix plus a slug of the name.
#[must_use]
pub fn new_migration_id(name: &str) -> String {
    format!("{}_{}", Utc::now().format("%Y%m%d%H%M%S"), slug(name))
}

/// Collapse a free-form name into an identifier-safe slug.
#[must_use]
pub fn slug(name: &str) -> String {
    NON_WORD_RE
        .replace_all(name, "_")
        .to_lowercase()
        .trim_matches('_')
        .to_string()
}

/// List the migration files of a directory in id order. A missing
/// directory is an empty migration set, not an error.
///
/// # Errors
///
/// Returns [`MigrateError::Io`] when the directory or a file inside it
/// cannot be read.
pub fn list_migration_files(dir: impl AsRef<Path>) -> Result<Vec<MigrationFile>, MigrateError> {
    let dir = dir.as_ref();
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let entries = std::fs::read_dir(dir).map_err(|source| MigrateError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| MigrateError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if !path.is_file() || !path.extension().is_some_and(|ext| ext == "sql") {
            continue;
        }
        let Some(id) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        let script = std::fs::read_to_string(&path).map_err(|source| MigrateError::Io {
            path: path.clone(),
            source,
        })?;
        files.push(MigrationFile {
            id: id.to_string(),
            name: migration_name(id),
            path,
            script,
        });
    }

    files.sort_by(|a, b| a.id.cmp(&b.id));
    Ok(files)
}

/// Write a forward script as `<dir>/<id>.sql`, creating the directory if
/// needed.
///
/// # Errors
///
/// Returns [`MigrateError::Io`] when the directory or file cannot be
/// written.
pub fn write_migration_file(
    dir: impl AsRef<Path>,
    id: &str,
    script: &str,
) -> Result<PathBuf, MigrateError> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir).map_err(|source| MigrateError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    let path = dir.join(format!("{id}.sql"));
    std::fs::write(&path, script).map_err(|source| MigrateError::Io {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}

/// The human part of an id: everything after the timestamp prefix, or the
/// whole id when there is no prefix.
fn migration_name(id: &str) -> String {
    id.split_once('_')
        .filter(|(prefix, _)| prefix.len() == 14 && prefix.chars().all(|c| c.is_ascii_digit()))
        .map_or_else(|| id.to_string(), |(_, rest)| rest.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migration_id_has_timestamp_prefix_and_slug() {
        let id = new_migration_id("Add users table!");
        let (prefix, rest) = id.split_once('_').unwrap();
        assert_eq!(prefix.len(), 14);
        assert!(prefix.chars().all(|c| c.is_ascii_digit()));
        assert_eq!(rest, "add_users_table");
    }

    #[test]
    fn slug_flattens_punctuation() {
        assert_eq!(slug("Hello, World"), "hello_world");
        assert_eq!(slug("add index (users.email)"), "add_index_users_email");
    }

    #[test]
    fn lists_files_in_id_order() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("20240201000000_second.sql"), "SELECT 2;").unwrap();
        std::fs::write(dir.path().join("20240101000000_first.sql"), "SELECT 1;").unwrap();
        std::fs::write(dir.path().join("README.md"), "not a migration").unwrap();

        let files = list_migration_files(dir.path()).unwrap();
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].id, "20240101000000_first");
        assert_eq!(files[0].name, "first");
        assert_eq!(files[1].id, "20240201000000_second");
        assert_eq!(files[1].script, "SELECT 2;");
    }

    #[test]
    fn missing_directory_is_empty_set() {
        assert!(list_migration_files("/nonexistent/migrations").unwrap().is_empty());
    }

    #[test]
    fn write_then_list_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path =
            write_migration_file(dir.path(), "20240101000000_init", "CREATE TABLE t (x INT);")
                .unwrap();
        assert!(path.ends_with("20240101000000_init.sql"));

        let files = list_migration_files(dir.path()).unwrap();
        assert_eq!(files[0].script, "CREATE TABLE t (x INT);");
    }
}
