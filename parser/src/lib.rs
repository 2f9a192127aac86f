//! Backend-neutral SQL DDL parser
//!
//! Parses declarative `.sql` files into the canonical schema model. The
//! parser understands `CREATE TABLE [IF NOT EXISTS]`,
//! `CREATE [UNIQUE] INDEX [IF NOT EXISTS]`, and `CREATE TYPE … AS ENUM`;
//! everything else is skipped silently so that trigger or view definitions
//! in a schema directory do not break the engine.
//!
//! When the input is a directory, files are parsed in lexical order and
//! tables defined across multiple files merge by name: later files may add
//! columns, an identical duplicate column definition resolves to the first
//! one seen, and a conflicting redefinition is a parse error.

pub mod error;
pub mod splitter;
pub mod statements;
pub mod table;
pub mod text;

use std::path::Path;

use tracing::debug;
use walkdir::WalkDir;

use model::{EnumType, Index, Schema, Table};

pub use error::ParseError;
pub use splitter::split_statements;

use statements::{classify, Statement};
use table::parse_create_table;

/// Result of parsing one or more declarative DDL sources.
#[derive(Debug, Clone, Default)]
pub struct ParsedSchema {
    /// Tables in declaration order, with attached indexes.
    pub tables: Vec<Table>,
    /// Enum type definitions (PostgreSQL).
    pub enums: Vec<EnumType>,
    /// `CREATE INDEX` statements whose table was not declared in the same
    /// parse; the differ merges these against the introspected side.
    pub standalone_indexes: Vec<Index>,
}

impl ParsedSchema {
    /// View the parsed tables and enums as a [`Schema`] for validation and
    /// diffing.
    #[must_use]
    pub fn to_schema(&self) -> Schema {
        Schema::new(self.tables.clone(), self.enums.clone())
    }

    /// Fold another parse result into this one, merging tables by name.
    fn merge(&mut self, other: ParsedSchema, origin: &str) -> Result<(), ParseError> {
        for table in other.tables {
            self.merge_table(table, origin)?;
        }
        for enum_type in other.enums {
            if !self.enums.iter().any(|e| e.name == enum_type.name) {
                self.enums.push(enum_type);
            }
        }
        for index in other.standalone_indexes {
            self.attach_index(index);
        }
        Ok(())
    }

    /// Merge one table definition in. A column declared again with an
    /// identical definition resolves to the first one seen; declaring it
    /// again with a different definition is an error.
    fn merge_table(&mut self, incoming: Table, origin: &str) -> Result<(), ParseError> {
        let Some(existing) = self.tables.iter_mut().find(|t| t.name == incoming.name) else {
            self.tables.push(incoming);
            return Ok(());
        };
        for column in incoming.columns {
            match existing.column(&column.name) {
                Some(known) if *known == column => {
                    debug!(table = %existing.name, column = %column.name, "identical duplicate column definition ignored");
                }
                Some(_) => {
                    return Err(ParseError::ColumnRedefined {
                        origin: origin.to_string(),
                        table: existing.name.clone(),
                        column: column.name,
                    });
                }
                None => existing.columns.push(column),
            }
        }
        for index in incoming.indexes {
            if !existing.indexes.iter().any(|i| i.name == index.name) {
                existing.indexes.push(index);
            }
        }
        Ok(())
    }

    /// Attach a standalone index to its table when the table is part of
    /// this parse, deduplicating by index name.
    fn attach_index(&mut self, index: Index) {
        if let Some(table) = self.tables.iter_mut().find(|t| t.name == index.table) {
            if !table.indexes.iter().any(|i| i.name == index.name) {
                table.indexes.push(index);
            }
        } else if !self.standalone_indexes.iter().any(|i| i.name == index.name) {
            self.standalone_indexes.push(index);
        }
    }
}

/// Parse DDL source text. `origin` names the source in errors, e.g. the
/// file path or `<inline>`.
///
/// # Errors
///
/// Returns a [`ParseError`] for a malformed `CREATE TABLE` statement or a
/// conflicting column redefinition.
pub fn parse_sql(source: &str, origin: &str) -> Result<ParsedSchema, ParseError> {
    let stripped = text::strip_comments(source);
    let mut parsed = ParsedSchema::default();

    for statement in text::split_top_level(&stripped, b';') {
        match classify(&statement) {
            Statement::CreateTable => {
                let table = parse_create_table(&statement, origin)?;
                parsed.merge_table(table, origin)?;
            }
            Statement::CreateIndex(index) => parsed.attach_index(index),
            Statement::CreateEnum(enum_type) => {
                if !parsed.enums.iter().any(|e| e.name == enum_type.name) {
                    parsed.enums.push(enum_type);
                }
            }
            Statement::Unknown => {
                debug!(%origin, "skipping unsupported statement: {}", error::excerpt(&statement));
            }
        }
    }

    Ok(parsed)
}

/// Parse a single `.sql` file.
///
/// # Errors
///
/// Returns a [`ParseError`] if the file cannot be read or contains a
/// malformed statement.
pub fn parse_sql_file(path: impl AsRef<Path>) -> Result<ParsedSchema, ParseError> {
    let path = path.as_ref();
    let source = std::fs::read_to_string(path).map_err(|source| ParseError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_sql(&source, &path.display().to_string())
}

/// Parse every `.sql` file under a directory, in lexical path order, merging
/// tables defined across files by name.
///
/// # Errors
///
/// Returns a [`ParseError`] if the directory walk fails, a file cannot be
/// read, any file contains a malformed statement, or a later file
/// redefines a column with a different definition.
pub fn parse_sql_dir(dir: impl AsRef<Path>) -> Result<ParsedSchema, ParseError> {
    let dir = dir.as_ref();
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(|e| ParseError::Io {
            path: dir.to_path_buf(),
            source: e.into(),
        })?;
        let path = entry.into_path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "sql") {
            files.push(path);
        }
    }
    files.sort();

    let mut parsed = ParsedSchema::default();
    for path in files {
        debug!(path = %path.display(), "parsing schema file");
        let origin = path.display().to_string();
        parsed.merge(parse_sql_file(&path)?, &origin)?;
    }

    // A later file may have declared the table a standalone index targets.
    let pending = std::mem::take(&mut parsed.standalone_indexes);
    for index in pending {
        parsed.attach_index(index);
    }

    Ok(parsed)
}
