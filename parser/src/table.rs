//! `CREATE TABLE` parsing
//!
//! The table body is the parenthesized region between the first `(` and its
//! matching `)`. Body elements are split on top-level commas; each element
//! is either a table-level constraint (of which only `FOREIGN KEY` is
//! lifted onto the referenced column) or a column definition.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use model::{Column, OnDeleteAction, Table};

use crate::error::{excerpt, ParseError};
use crate::statements::CREATE_TABLE_RE;
use crate::text::{
    balanced_parens, canonical_ident, skip_quoted, split_top_level, uppercase_outside_quotes,
};

const IDENT: &str = r#"(?:"[^"]+"|`[^`]+`|[A-Za-z_][A-Za-z0-9_$]*)"#;
const ON_DELETE: &str = r"SET\s+NULL|SET\s+DEFAULT|CASCADE|RESTRICT|NO\s+ACTION";

/// Multi-word types recognized before generic tokenization.
static MULTI_WORD_TYPE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?is)^(?:(?:TIMESTAMP|TIME)\s*(?:\(\d+\))?\s+WITH(?:OUT)?\s+TIME\s+ZONE|DOUBLE\s+PRECISION|CHARACTER\s+VARYING\s*(?:\(\s*\d+\s*\))?)",
    )
    .unwrap()
});

static TABLE_FK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?is)^\s*(?:CONSTRAINT\s+{IDENT}\s+)?FOREIGN\s+KEY\s*\(\s*(?P<col>{IDENT})\s*\)\s*REFERENCES\s+(?P<table>{IDENT})\s*\(\s*(?P<refcol>{IDENT})\s*\)(?:\s+ON\s+DELETE\s+(?P<action>{ON_DELETE}))?"
    ))
    .unwrap()
});

static INLINE_REFERENCES_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?is)\bREFERENCES\s+(?P<table>{IDENT})\s*\(\s*(?P<refcol>{IDENT})\s*\)(?:\s+ON\s+DELETE\s+(?P<action>{ON_DELETE}))?"
    ))
    .unwrap()
});

static NOT_NULL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bNOT\s+NULL\b").unwrap());
static PRIMARY_KEY_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bPRIMARY\s+KEY\b").unwrap());
static UNIQUE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bUNIQUE\b").unwrap());
static AUTO_INCREMENT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bAUTO_?INCREMENT\b").unwrap());
static DEFAULT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bDEFAULT\b").unwrap());

/// Constraint keywords that mark a body element as table-level.
static CONSTRAINT_LEAD_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*(?:PRIMARY\s+KEY|FOREIGN\s+KEY|UNIQUE|CHECK|CONSTRAINT)\b").unwrap()
});

/// Parse one `CREATE TABLE` statement into a [`Table`].
pub(crate) fn parse_create_table(statement: &str, origin: &str) -> Result<Table, ParseError> {
    let caps = CREATE_TABLE_RE
        .captures(statement)
        .ok_or_else(|| ParseError::MissingTableName {
            origin: origin.to_string(),
            excerpt: excerpt(statement),
        })?;
    let name = canonical_ident(&caps["name"]);
    // The regex consumed the opening paren; back up one byte to re-find it.
    let body_from = caps.get(0).map_or(0, |m| m.end() - 1);
    let (body_start, body_end) =
        balanced_parens(statement, body_from).ok_or_else(|| ParseError::UnbalancedParens {
            origin: origin.to_string(),
            excerpt: excerpt(statement),
        })?;

    let mut table = Table::new(name);
    for element in split_top_level(&statement[body_start..body_end], b',') {
        if CONSTRAINT_LEAD_RE.is_match(&element) {
            apply_table_constraint(&mut table, &element);
        } else {
            let column = parse_column(&element, origin, &table.name)?;
            table.columns.push(column);
        }
    }

    Ok(table)
}

/// Lift a table-level constraint onto its column. Only `FOREIGN KEY` is
/// understood; PRIMARY KEY / UNIQUE / CHECK constraints at table level are
/// out of model and ignored.
fn apply_table_constraint(table: &mut Table, element: &str) {
    let Some(caps) = TABLE_FK_RE.captures(element) else {
        debug!(table = %table.name, "skipping table-level constraint: {}", excerpt(element));
        return;
    };

    let column_name = canonical_ident(&caps["col"]);
    let Some(column) = table.columns.iter_mut().find(|c| c.name == column_name) else {
        debug!(
            table = %table.name,
            column = %column_name,
            "foreign key names a column not declared in this table"
        );
        return;
    };

    column.foreign_key_table = canonical_ident(&caps["table"]);
    column.foreign_key_column = canonical_ident(&caps["refcol"]);
    column.on_delete_action = parse_action(caps.name("action").map(|m| m.as_str()));
}

fn parse_action(raw: Option<&str>) -> OnDeleteAction {
    raw.and_then(|a| a.parse().ok()).unwrap_or_default()
}

/// Parse one column definition.
pub(crate) fn parse_column(def: &str, origin: &str, table: &str) -> Result<Column, ParseError> {
    let malformed = || ParseError::MalformedColumn {
        origin: origin.to_string(),
        table: table.to_string(),
        excerpt: excerpt(def),
    };

    let (name, after_name) = take_ident(def).ok_or_else(malformed)?;
    let (tpe, after_type) = take_type(&def[after_name..]).ok_or_else(malformed)?;
    let attrs = &def[after_name + after_type..];
    // Keyword scanning runs over a copy with string literals blanked, so a
    // DEFAULT 'primary key' literal can never set flags.
    let masked = mask_strings(attrs);

    let mut column = Column::new(name, String::new());
    apply_type(&mut column, &tpe);

    if NOT_NULL_RE.is_match(&masked) {
        column.nullable = false;
    }
    if PRIMARY_KEY_RE.is_match(&masked) {
        column.is_primary = true;
        column.nullable = false;
    }
    if UNIQUE_RE.is_match(&masked) {
        column.is_unique = true;
    }
    if AUTO_INCREMENT_RE.is_match(&masked) {
        column.is_auto_increment = true;
        column.is_primary = true;
        column.nullable = false;
    }
    if let Some(caps) = INLINE_REFERENCES_RE.captures(attrs) {
        column.foreign_key_table = canonical_ident(&caps["table"]);
        column.foreign_key_column = canonical_ident(&caps["refcol"]);
        column.on_delete_action = parse_action(caps.name("action").map(|m| m.as_str()));
    }
    if let Some(m) = DEFAULT_RE.find(&masked) {
        let expr = take_default_expr(&attrs[m.end()..]);
        if expr.to_ascii_lowercase().starts_with("nextval(") {
            // Sequence default: canonicalize to the auto-increment flag.
            column.is_auto_increment = true;
        } else if expr.starts_with('\'') {
            column.default = expr;
        } else {
            // Bare expressions canonicalize to upper case, matching what
            // introspection reports for them.
            column.default = uppercase_outside_quotes(&expr);
        }
    }

    Ok(column)
}

/// Consume one identifier (quoted or bare) from the front. Returns the
/// canonical name and the bytes consumed including leading whitespace.
fn take_ident(input: &str) -> Option<(String, usize)> {
    let bytes = input.as_bytes();
    let start = input.len() - input.trim_start().len();
    match bytes.get(start)? {
        q @ (b'"' | b'`') => {
            let end = skip_quoted(bytes, start, *q);
            (end > start + 1).then(|| (canonical_ident(&input[start..end]), end))
        }
        b => {
            if !(b.is_ascii_alphabetic() || *b == b'_') {
                return None;
            }
            let mut end = start;
            while end < bytes.len()
                && (bytes[end].is_ascii_alphanumeric() || bytes[end] == b'_' || bytes[end] == b'$')
            {
                end += 1;
            }
            Some((canonical_ident(&input[start..end]), end))
        }
    }
}

/// Consume the column type from the front: a multi-word type, or a single
/// word with an optional attached argument group. Returns the normalized
/// spelling and the bytes consumed.
fn take_type(input: &str) -> Option<(String, usize)> {
    let start = input.len() - input.trim_start().len();
    let rest = &input[start..];

    if let Some(m) = MULTI_WORD_TYPE_RE.find(rest) {
        let collapsed = m
            .as_str()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_ascii_uppercase();
        return Some((collapsed, start + m.end()));
    }

    let bytes = rest.as_bytes();
    let mut end = 0;
    while end < bytes.len()
        && (bytes[end].is_ascii_alphanumeric() || bytes[end] == b'_' || bytes[end] == b'$')
    {
        end += 1;
    }
    if end == 0 {
        return None;
    }
    let word = rest[..end].to_ascii_uppercase();

    // Attached argument group, e.g. VARCHAR(255), NUMERIC(10,2), ENUM('a','b').
    let after_word = &rest[end..];
    let ws = after_word.len() - after_word.trim_start().len();
    if after_word[ws..].starts_with('(') {
        if let Some((arg_start, arg_end)) = balanced_parens(rest, end + ws) {
            let args = &rest[arg_start..arg_end];
            let rendered = if args.contains('\'') {
                // Value lists (ENUM) keep their spelling.
                args.trim().to_string()
            } else {
                args.split_whitespace().collect::<String>()
            };
            return Some((format!("{word}({rendered})"), start + arg_end + 1));
        }
    }

    Some((word, start + end))
}

/// Install the type on the column, canonicalizing the SERIAL family to the
/// plain integer type plus the auto-increment flag.
fn apply_type(column: &mut Column, tpe: &str) {
    match tpe {
        "SERIAL" => {
            column.tpe = "INTEGER".to_string();
            column.is_auto_increment = true;
            column.nullable = false;
        }
        "BIGSERIAL" => {
            column.tpe = "BIGINT".to_string();
            column.is_auto_increment = true;
            column.nullable = false;
        }
        "SMALLSERIAL" => {
            column.tpe = "SMALLINT".to_string();
            column.is_auto_increment = true;
            column.nullable = false;
        }
        other => column.tpe = other.to_string(),
    }
}

/// Consume a DEFAULT expression: a quoted literal, a parenthesized
/// expression, or a bare token (optionally with an attached call-argument
/// group and cast suffix, as in `nextval('seq'::regclass)`).
fn take_default_expr(input: &str) -> String {
    let trimmed = input.trim_start();
    let bytes = trimmed.as_bytes();
    if bytes.is_empty() {
        return String::new();
    }

    let end = match bytes[0] {
        b'\'' => skip_quoted(bytes, 0, b'\''),
        b'(' => balanced_parens(trimmed, 0).map_or(trimmed.len(), |(_, close)| close + 1),
        _ => {
            let mut i = 0;
            while i < bytes.len() && !bytes[i].is_ascii_whitespace() {
                match bytes[i] {
                    b'\'' => i = skip_quoted(bytes, i, b'\''),
                    b'(' => {
                        i = balanced_parens(trimmed, i).map_or(bytes.len(), |(_, close)| close + 1);
                    }
                    _ => i += 1,
                }
            }
            i
        }
    };

    trimmed[..end].trim().to_string()
}

/// Blank out quoted literal contents, preserving length and positions.
fn mask_strings(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = String::with_capacity(input.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            q @ (b'\'' | b'"' | b'`') => {
                let end = skip_quoted(bytes, i, q);
                out.extend(std::iter::repeat(' ').take(end - i));
                i = end;
            }
            _ => {
                let ch = input[i..].chars().next().unwrap_or('\u{fffd}');
                out.push(ch);
                i += ch.len_utf8();
            }
        }
    }
    out
}
