//! Migration-script statement splitter
//!
//! Splits a forward-migration script into executable statements. Statement
//! boundaries are semicolons that lie outside every string literal; the
//! splitter makes no assumption about balanced parentheses, because a `;`
//! inside a quoted value inside a function call is already covered by the
//! literal span. O(n) in the script size.

use once_cell::sync::Lazy;
use regex::Regex;

/// Single-, double-, and backtick-quoted runs with doubled-character
/// escapes, matched in one pass.
static STRING_SPAN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"'(?:[^']|'')*'|"(?:[^"]|"")*"|`(?:[^`]|``)*`"#).unwrap());

/// Split a script into trimmed executable statements.
#[must_use]
pub fn split_statements(script: &str) -> Vec<String> {
    let without_line_comments = remove_line_comments(script);

    let spans: Vec<(usize, usize)> = STRING_SPAN_RE
        .find_iter(&without_line_comments)
        .map(|m| (m.start(), m.end()))
        .collect();

    let mut statements = Vec::new();
    let mut fragment_start = 0;
    let mut span_cursor = 0;

    for (i, b) in without_line_comments.bytes().enumerate() {
        while span_cursor < spans.len() && spans[span_cursor].1 <= i {
            span_cursor += 1;
        }
        let in_string = span_cursor < spans.len()
            && spans[span_cursor].0 <= i
            && i < spans[span_cursor].1;

        if b == b';' && !in_string {
            push_statement(&mut statements, &without_line_comments[fragment_start..i]);
            fragment_start = i + 1;
        }
    }
    push_statement(&mut statements, &without_line_comments[fragment_start..]);

    statements
}

fn push_statement(statements: &mut Vec<String>, fragment: &str) {
    let trimmed = fragment.trim();
    if trimmed.is_empty() || trimmed.starts_with("/*") {
        return;
    }
    statements.push(trimmed.to_string());
}

/// Remove `-- …` line comments, leaving string literals untouched.
fn remove_line_comments(script: &str) -> String {
    let bytes = script.as_bytes();
    let mut out = String::with_capacity(script.len());
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            q @ (b'\'' | b'"' | b'`') => {
                let end = crate::text::skip_quoted(bytes, i, q);
                out.push_str(&script[i..end]);
                i = end;
            }
            b'-' if bytes.get(i + 1) == Some(&b'-') => {
                while i < bytes.len() && bytes[i] != b'\n' {
                    i += 1;
                }
            }
            _ => {
                let ch = script[i..].chars().next().unwrap_or('\u{fffd}');
                out.push(ch);
                i += ch.len_utf8();
            }
        }
    }

    out
}
