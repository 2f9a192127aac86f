//! Schema types: tables, columns, indexes, and enum types
//!
//! Column order inside a [`Table`] is meaningful for rendering but not for
//! equality; comparisons go through the name-keyed views. All names are
//! canonicalized to lower case on ingest (by the parser for SQL files, by
//! the adapters for introspection), so lookups here use names verbatim.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Referential action attached to a foreign key's `ON DELETE` clause.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OnDeleteAction {
    /// No clause present.
    #[default]
    None,
    /// `ON DELETE CASCADE`
    Cascade,
    /// `ON DELETE SET NULL`
    SetNull,
    /// `ON DELETE RESTRICT`
    Restrict,
    /// `ON DELETE NO ACTION`
    NoAction,
    /// `ON DELETE SET DEFAULT`
    SetDefault,
}

impl OnDeleteAction {
    /// SQL spelling of the action, empty when no clause is present.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "",
            Self::Cascade => "CASCADE",
            Self::SetNull => "SET NULL",
            Self::Restrict => "RESTRICT",
            Self::NoAction => "NO ACTION",
            Self::SetDefault => "SET DEFAULT",
        }
    }
}

impl fmt::Display for OnDeleteAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OnDeleteAction {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_uppercase();
        match normalized.split_whitespace().collect::<Vec<_>>().join(" ").as_str() {
            "" => Ok(Self::None),
            "CASCADE" => Ok(Self::Cascade),
            "SET NULL" => Ok(Self::SetNull),
            "RESTRICT" => Ok(Self::Restrict),
            "NO ACTION" => Ok(Self::NoAction),
            "SET DEFAULT" => Ok(Self::SetDefault),
            other => Err(format!("unknown ON DELETE action: {other}")),
        }
    }
}

/// A single column of a table.
///
/// `tpe` is the dialect-specific upper-case type spelling, e.g.
/// `VARCHAR(255)` or `TIMESTAMP WITH TIME ZONE`. Sequence-backed defaults
/// (`nextval(...)`, `SERIAL`) are canonicalized away on ingest: the default
/// is cleared and `is_auto_increment` is set instead.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub tpe: String,
    pub nullable: bool,
    pub default: String,
    pub is_primary: bool,
    pub is_unique: bool,
    pub is_auto_increment: bool,
    pub foreign_key_table: String,
    pub foreign_key_column: String,
    pub on_delete_action: OnDeleteAction,
}

impl Column {
    /// New nullable column with the given name and type.
    #[must_use]
    pub fn new(name: impl Into<String>, tpe: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tpe: tpe.into(),
            nullable: true,
            ..Self::default()
        }
    }

    /// Whether the column carries a foreign key reference.
    #[must_use]
    pub fn has_foreign_key(&self) -> bool {
        !self.foreign_key_table.is_empty()
    }
}

/// A secondary index.
///
/// Indexes implicitly created by PRIMARY KEY or UNIQUE constraints are not
/// part of the model; they are reconstructed from the column flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Index {
    pub name: String,
    /// Owning table, needed by dialects whose DROP INDEX is table-qualified.
    pub table: String,
    /// Ordered column list.
    pub columns: Vec<String>,
    pub unique: bool,
}

/// A named enum type with its ordered value list. PostgreSQL only; the other
/// backends introspect to an empty list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumType {
    pub name: String,
    pub values: Vec<String>,
}

/// A table: ordered columns plus its secondary indexes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    pub columns: Vec<Column>,
    pub indexes: Vec<Index>,
}

impl Table {
    /// New empty table.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            indexes: Vec::new(),
        }
    }

    /// Name-keyed view of the columns for order-insensitive comparison.
    #[must_use]
    pub fn columns_by_name(&self) -> HashMap<&str, &Column> {
        self.columns.iter().map(|c| (c.name.as_str(), c)).collect()
    }

    /// Look up a column by name.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Tables this table references through foreign keys, self-references
    /// excluded. Drives the dependency sort for CREATE ordering.
    #[must_use]
    pub fn foreign_key_tables(&self) -> Vec<&str> {
        let mut deps: Vec<&str> = self
            .columns
            .iter()
            .filter(|c| c.has_foreign_key() && c.foreign_key_table != self.name)
            .map(|c| c.foreign_key_table.as_str())
            .collect();
        deps.sort_unstable();
        deps.dedup();
        deps
    }
}

/// A full schema: the unit the differ compares.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    pub tables: Vec<Table>,
    pub enums: Vec<EnumType>,
}

impl Schema {
    /// New empty schema.
    #[must_use]
    pub fn new(tables: Vec<Table>, enums: Vec<EnumType>) -> Self {
        Self { tables, enums }
    }

    /// Name-keyed view of the tables.
    #[must_use]
    pub fn tables_by_name(&self) -> HashMap<&str, &Table> {
        self.tables.iter().map(|t| (t.name.as_str(), t)).collect()
    }

    /// Look up a table by name.
    #[must_use]
    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name == name)
    }
}
