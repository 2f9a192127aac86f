//! Statement classification and the non-table statement parsers
//!
//! Statements are classified by leading keyword, case-insensitively and
//! whitespace-tolerantly. The patterns are precompiled once per process.
//! Statement kinds the engine does not understand (triggers, views, …) are
//! skipped silently; that is the extension point for future kinds.

use once_cell::sync::Lazy;
use regex::Regex;

use model::{EnumType, Index};

use crate::text::canonical_ident;

/// `"name"`, `` `name` ``, or a bare identifier.
const IDENT: &str = r#"(?:"[^"]+"|`[^`]+`|[A-Za-z_][A-Za-z0-9_$]*)"#;

pub(crate) static CREATE_TABLE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?is)^\s*CREATE\s+TABLE\s+(?:IF\s+NOT\s+EXISTS\s+)?(?P<name>{IDENT})\s*\("
    ))
    .unwrap()
});

static CREATE_INDEX_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?is)^\s*CREATE\s+(?P<unique>UNIQUE\s+)?INDEX\s+(?:IF\s+NOT\s+EXISTS\s+)?(?P<name>{IDENT})\s+ON\s+(?P<table>{IDENT})\s*\((?P<cols>[^)]*)\)"
    ))
    .unwrap()
});

static CREATE_ENUM_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?is)^\s*CREATE\s+TYPE\s+(?P<name>{IDENT})\s+AS\s+ENUM\s*\((?P<values>.*)\)\s*$"
    ))
    .unwrap()
});

static ENUM_VALUE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"'((?:[^']|'')*)'").unwrap());

/// What a single top-level statement turned out to be.
#[derive(Debug)]
pub(crate) enum Statement {
    /// `CREATE TABLE`, to be handed to the table parser.
    CreateTable,
    /// A parsed standalone `CREATE [UNIQUE] INDEX`.
    CreateIndex(Index),
    /// A parsed `CREATE TYPE … AS ENUM`.
    CreateEnum(EnumType),
    /// Anything else; skipped.
    Unknown,
}

/// Classify one statement, parsing it on the spot when it is an index or an
/// enum definition. `CREATE TABLE` is only recognized here; its body parse
/// lives in the table parser.
pub(crate) fn classify(statement: &str) -> Statement {
    if CREATE_TABLE_RE.is_match(statement) {
        return Statement::CreateTable;
    }
    if let Some(caps) = CREATE_INDEX_RE.captures(statement) {
        let columns = caps["cols"]
            .split(',')
            .map(canonical_ident)
            .filter(|c| !c.is_empty())
            .collect();
        return Statement::CreateIndex(Index {
            name: canonical_ident(&caps["name"]),
            table: canonical_ident(&caps["table"]),
            columns,
            unique: caps.name("unique").is_some(),
        });
    }
    if let Some(caps) = CREATE_ENUM_RE.captures(statement) {
        let values = ENUM_VALUE_RE
            .captures_iter(&caps["values"])
            .map(|v| v[1].replace("''", "'"))
            .collect();
        return Statement::CreateEnum(EnumType {
            name: canonical_ident(&caps["name"]),
            values,
        });
    }
    Statement::Unknown
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_create_table_variants() {
        assert!(matches!(
            classify("CREATE TABLE users (id INTEGER)"),
            Statement::CreateTable
        ));
        assert!(matches!(
            classify("create   table if not exists \"Users\" (id INTEGER)"),
            Statement::CreateTable
        ));
    }

    #[test]
    fn parses_standalone_index() {
        let Statement::CreateIndex(index) =
            classify("CREATE UNIQUE INDEX IF NOT EXISTS idx_email ON users (Email, tenant_id)")
        else {
            panic!("expected index");
        };
        assert_eq!(index.name, "idx_email");
        assert_eq!(index.table, "users");
        assert_eq!(index.columns, vec!["email", "tenant_id"]);
        assert!(index.unique);
    }

    #[test]
    fn parses_enum_type_with_escaped_quote() {
        let Statement::CreateEnum(enum_type) =
            classify("CREATE TYPE mood AS ENUM ('happy', 'it''s complicated')")
        else {
            panic!("expected enum");
        };
        assert_eq!(enum_type.name, "mood");
        assert_eq!(enum_type.values, vec!["happy", "it's complicated"]);
    }

    #[test]
    fn unknown_statements_are_flagged() {
        assert!(matches!(
            classify("CREATE TRIGGER trg AFTER INSERT ON t BEGIN SELECT 1; END"),
            Statement::Unknown
        ));
        assert!(matches!(classify("DROP TABLE users"), Statement::Unknown));
    }
}
