//! Query dialects
//!
//! A dialect owns identifier quoting and the time-bucket functions. Plans are
//! dialect-independent until rendered.

/// Dialect-specific rendering hooks
pub trait Dialect {
    /// Dialect name for diagnostics
    fn name(&self) -> &'static str;

    /// Quotes an identifier, escaping embedded quote characters
    fn quote_ident(&self, ident: &str) -> String;

    /// Calendar year of a rendered date-like expression
    fn year_bucket(&self, expr: &str) -> String;

    /// Calendar month (`YYYY-MM`) of a rendered date-like expression
    fn month_bucket(&self, expr: &str) -> String;
}

/// SQLite dialect
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteDialect;

impl Dialect for SqliteDialect {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn quote_ident(&self, ident: &str) -> String {
        format!("\"{}\"", ident.replace('"', "\"\""))
    }

    fn year_bucket(&self, expr: &str) -> String {
        format!("substr({}, 1, 4)", expr)
    }

    fn month_bucket(&self, expr: &str) -> String {
        format!("strftime('%Y-%m', {})", expr)
    }
}
