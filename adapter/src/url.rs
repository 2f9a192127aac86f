//! Connection URL handling
//!
//! The engine accepts `postgres://`, `mysql://`, and `sqlite://` URLs. The
//! MySQL form tolerates the PostgreSQL-style `sslmode=` aliases and
//! rewrites them to the driver-native `ssl-mode=` spellings; the SQLite
//! form is stripped down to its file path before the connect options are
//! built.

use crate::Dialect;

/// Determine the backend a connection URL addresses.
#[must_use]
pub fn dialect_of(url: &str) -> Option<Dialect> {
    let scheme = url.split("://").next()?.to_ascii_lowercase();
    match scheme.as_str() {
        "postgres" | "postgresql" => Some(Dialect::Postgres),
        "mysql" => Some(Dialect::MySql),
        "sqlite" => Some(Dialect::Sqlite),
        _ => None,
    }
}

/// Strip the `sqlite://` scheme prefix, leaving the filesystem path (or
/// `:memory:`). Query parameters are dropped here; journaling and cache
/// behavior are set through the connect options instead.
#[must_use]
pub fn sqlite_path(url: &str) -> String {
    let without_scheme = url
        .strip_prefix("sqlite://")
        .or_else(|| url.strip_prefix("sqlite:"))
        .unwrap_or(url);
    without_scheme
        .split_once('?')
        .map_or(without_scheme, |(path, _)| path)
        .to_string()
}

/// Rewrite PostgreSQL-style `sslmode=` query parameters in a MySQL URL to
/// the driver-native `ssl-mode=` values. Anything already driver-native
/// passes through untouched.
#[must_use]
pub fn normalize_mysql_url(url: &str) -> String {
    let Some((base, query)) = url.split_once('?') else {
        return url.to_string();
    };

    let params: Vec<String> = query
        .split('&')
        .filter(|p| !p.is_empty())
        .map(|param| {
            let Some((key, value)) = param.split_once('=') else {
                return param.to_string();
            };
            if !key.eq_ignore_ascii_case("sslmode") {
                return param.to_string();
            }
            let mode = match value.to_ascii_lowercase().as_str() {
                "disable" | "disabled" => "DISABLED",
                "prefer" | "preferred" => "PREFERRED",
                "require" | "required" => "REQUIRED",
                "verify-ca" => "VERIFY_CA",
                "verify-full" | "verify-identity" => "VERIFY_IDENTITY",
                other => return format!("ssl-mode={other}"),
            };
            format!("ssl-mode={mode}")
        })
        .collect();

    if params.is_empty() {
        base.to_string()
    } else {
        format!("{base}?{}", params.join("&"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_schemes() {
        assert_eq!(dialect_of("postgres://u:p@h/db"), Some(Dialect::Postgres));
        assert_eq!(dialect_of("postgresql://u:p@h/db"), Some(Dialect::Postgres));
        assert_eq!(dialect_of("mysql://u:p@h/db"), Some(Dialect::MySql));
        assert_eq!(dialect_of("sqlite://app.db"), Some(Dialect::Sqlite));
        assert_eq!(dialect_of("mongodb://h/db"), None);
    }

    #[test]
    fn sqlite_path_strips_scheme_and_query() {
        assert_eq!(sqlite_path("sqlite://data/app.db"), "data/app.db");
        assert_eq!(sqlite_path("sqlite://app.db?cache=shared"), "app.db");
        assert_eq!(sqlite_path("sqlite::memory:"), ":memory:");
    }

    #[test]
    fn mysql_sslmode_aliases_are_rewritten() {
        assert_eq!(
            normalize_mysql_url("mysql://u:p@h/db?sslmode=disable"),
            "mysql://u:p@h/db?ssl-mode=DISABLED"
        );
        assert_eq!(
            normalize_mysql_url("mysql://u:p@h/db?sslmode=require&charset=utf8"),
            "mysql://u:p@h/db?ssl-mode=REQUIRED&charset=utf8"
        );
        assert_eq!(
            normalize_mysql_url("mysql://u:p@h/db"),
            "mysql://u:p@h/db"
        );
    }
}
