//! Result cell values and query output

use std::fmt;

/// A single value returned by the store
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    /// SQL NULL
    Null,
    /// 64-bit integer
    Integer(i64),
    /// Double precision real
    Real(f64),
    /// Text (blobs are decoded lossily)
    Text(String),
}

impl Cell {
    /// Renders the cell as a metric value string.
    ///
    /// NULL renders as `null`, reals use the shortest round-trip form and
    /// always carry a fractional part (`100.0`, `0.25`).
    pub fn render(&self) -> String {
        match self {
            Cell::Null => "null".to_string(),
            Cell::Integer(v) => v.to_string(),
            Cell::Real(v) => format_real(*v),
            Cell::Text(s) => s.clone(),
        }
    }

    /// Numeric view of the cell. Text is parsed after trimming.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Null => None,
            Cell::Integer(v) => Some(*v as f64),
            Cell::Real(v) => Some(*v),
            Cell::Text(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        }
    }

    /// Returns true for NULL and for empty or whitespace-only text
    pub fn is_missing(&self) -> bool {
        match self {
            Cell::Null => true,
            Cell::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.render())
    }
}

/// Formats a real the way metric values and query literals expect it
pub(crate) fn format_real(v: f64) -> String {
    format!("{:?}", v)
}

/// Column metadata for a table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnInfo {
    /// Physical column name
    pub name: String,
    /// Declared type as written in the table definition (may be empty)
    pub declared_type: String,
}

impl ColumnInfo {
    /// Creates column metadata
    pub fn new(name: impl Into<String>, declared_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            declared_type: declared_type.into(),
        }
    }
}

/// Output of a single query
#[derive(Debug, Clone, Default)]
pub struct QueryOutput {
    /// Result column names, in select order
    pub columns: Vec<String>,
    /// Rows in the order the store returned them
    pub rows: Vec<Vec<Cell>>,
    /// True if more rows were available than requested
    pub truncated: bool,
}

impl QueryOutput {
    /// Returns the number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if the query returned no rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Returns the first cell of the first row, if any
    pub fn scalar(&self) -> Option<&Cell> {
        self.rows.first().and_then(|r| r.first())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render() {
        assert_eq!(Cell::Null.render(), "null");
        assert_eq!(Cell::Integer(42).render(), "42");
        assert_eq!(Cell::Real(100.0).render(), "100.0");
        assert_eq!(Cell::Real(0.25).render(), "0.25");
        assert_eq!(Cell::Text("West".into()).render(), "West");
    }

    #[test]
    fn test_as_f64() {
        assert_eq!(Cell::Integer(3).as_f64(), Some(3.0));
        assert_eq!(Cell::Text(" 12.5 ".into()).as_f64(), Some(12.5));
        assert_eq!(Cell::Text("abc".into()).as_f64(), None);
        assert_eq!(Cell::Text("inf".into()).as_f64(), None);
        assert_eq!(Cell::Null.as_f64(), None);
    }

    #[test]
    fn test_is_missing() {
        assert!(Cell::Null.is_missing());
        assert!(Cell::Text("  ".into()).is_missing());
        assert!(!Cell::Integer(0).is_missing());
    }
}
