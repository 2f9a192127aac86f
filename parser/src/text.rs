//! Quote- and parenthesis-aware text scanning
//!
//! Every routine here understands the three SQL quoting styles (single,
//! double, backtick) with doubled-character escapes, so that comment
//! stripping and top-level splitting never cut through a literal.

/// Strip `-- …` line comments and `/* … */` block comments, leaving string
/// literals untouched.
#[must_use]
pub fn strip_comments(source: &str) -> String {
    let bytes = source.as_bytes();
    let mut out = String::with_capacity(source.len());
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            q @ (b'\'' | b'"' | b'`') => {
                let end = skip_quoted(bytes, i, q);
                out.push_str(&source[i..end]);
                i = end;
            }
            b'-' if bytes.get(i + 1) == Some(&b'-') => {
                while i < bytes.len() && bytes[i] != b'\n' {
                    i += 1;
                }
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                i += 2;
                while i < bytes.len() {
                    if bytes[i] == b'*' && bytes.get(i + 1) == Some(&b'/') {
                        i += 2;
                        break;
                    }
                    i += 1;
                }
                // Keep statements on either side separated.
                out.push(' ');
            }
            c => {
                out.push(c as char);
                if c.is_ascii() {
                    i += 1;
                } else {
                    // Multi-byte character: copy it whole.
                    out.pop();
                    let ch = source[i..].chars().next().unwrap_or('\u{fffd}');
                    out.push(ch);
                    i += ch.len_utf8();
                }
            }
        }
    }

    out
}

/// Advance past a quoted run starting at `start` (which holds the opening
/// quote), honoring doubled-quote escapes. Returns the index one past the
/// closing quote, or the end of input for an unterminated literal.
pub(crate) fn skip_quoted(bytes: &[u8], start: usize, quote: u8) -> usize {
    let mut i = start + 1;
    while i < bytes.len() {
        if bytes[i] == quote {
            if bytes.get(i + 1) == Some(&quote) {
                i += 2;
                continue;
            }
            return i + 1;
        }
        i += 1;
    }
    bytes.len()
}

/// Split on a single-byte delimiter at parenthesis depth zero, outside all
/// string literals. Empty fragments are dropped.
#[must_use]
pub fn split_top_level(source: &str, delimiter: u8) -> Vec<String> {
    let bytes = source.as_bytes();
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut fragment_start = 0;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            q @ (b'\'' | b'"' | b'`') => i = skip_quoted(bytes, i, q),
            b'(' => {
                depth += 1;
                i += 1;
            }
            b')' => {
                depth = depth.saturating_sub(1);
                i += 1;
            }
            c if c == delimiter && depth == 0 => {
                push_fragment(&mut parts, &source[fragment_start..i]);
                i += 1;
                fragment_start = i;
            }
            _ => i += 1,
        }
    }
    push_fragment(&mut parts, &source[fragment_start..]);

    parts
}

fn push_fragment(parts: &mut Vec<String>, fragment: &str) {
    let trimmed = fragment.trim();
    if !trimmed.is_empty() {
        parts.push(trimmed.to_string());
    }
}

/// Find the region between the first `(` at or after `from` and its matching
/// `)`, quote-aware. Returns the inner span as byte offsets, or `None` when
/// the parenthesis never balances.
#[must_use]
pub fn balanced_parens(source: &str, from: usize) -> Option<(usize, usize)> {
    let bytes = source.as_bytes();
    let mut i = from;
    while i < bytes.len() && bytes[i] != b'(' {
        match bytes[i] {
            q @ (b'\'' | b'"' | b'`') => i = skip_quoted(bytes, i, q),
            _ => i += 1,
        }
    }
    if i >= bytes.len() {
        return None;
    }

    let open = i;
    let mut depth = 0usize;
    while i < bytes.len() {
        match bytes[i] {
            q @ (b'\'' | b'"' | b'`') => {
                i = skip_quoted(bytes, i, q);
                continue;
            }
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth == 0 {
                    return Some((open + 1, i));
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

/// Uppercase a spelling outside of single-quoted runs, so
/// `enum('on','off')` becomes `ENUM('on','off')` without touching the
/// values. Types and bare default expressions canonicalize through this
/// on both the parse and the introspection path, which is what keeps the
/// two sides comparable.
#[must_use]
pub fn uppercase_outside_quotes(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut in_quote = false;
    for ch in raw.chars() {
        if ch == '\'' {
            in_quote = !in_quote;
            out.push(ch);
        } else if in_quote {
            out.push(ch);
        } else {
            out.extend(ch.to_uppercase());
        }
    }
    out
}

/// Strip surrounding identifier quoting (`"…"`, `` `…` ``) and lowercase,
/// producing the canonical name used throughout the model.
#[must_use]
pub fn canonical_ident(raw: &str) -> String {
    let trimmed = raw.trim();
    let unquoted = trimmed
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .or_else(|| trimmed.strip_prefix('`').and_then(|s| s.strip_suffix('`')))
        .unwrap_or(trimmed);
    unquoted.to_ascii_lowercase()
}
