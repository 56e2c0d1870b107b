//! Store error types

use thiserror::Error;

use crate::errors::ErrorCategory;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Relational store errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store holds no user table to analyze
    #[error("No user tables found in the store")]
    NoTables,

    /// The configured table does not exist
    #[error("Table '{0}' not found")]
    UnknownTable(String),

    /// The table exists but declares no columns
    #[error("Table '{0}' has no columns")]
    NoColumns(String),

    /// The underlying SQLite call failed
    #[error("{0}")]
    Sqlite(#[from] rusqlite::Error),
}

impl StoreError {
    /// Maps the error onto the run-level taxonomy
    pub fn category(&self) -> ErrorCategory {
        match self {
            StoreError::NoTables | StoreError::UnknownTable(_) | StoreError::NoColumns(_) => {
                ErrorCategory::Configuration
            }
            StoreError::Sqlite(_) => ErrorCategory::Execution,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_errors_are_configuration() {
        assert_eq!(StoreError::NoTables.category(), ErrorCategory::Configuration);
        assert_eq!(
            StoreError::UnknownTable("orders".into()).category(),
            ErrorCategory::Configuration
        );
    }

    #[test]
    fn test_display() {
        let err = StoreError::NoColumns("data".into());
        assert_eq!(err.to_string(), "Table 'data' has no columns");
    }
}
