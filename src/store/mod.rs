//! Relational store subsystem
//!
//! The engine reads one primary table through the `Store` trait. It never
//! opens or closes the connection and never mutates the dataset.
//!
//! # Primary table
//!
//! An explicitly configured table wins. Otherwise the first table in the
//! catalog whose name does not start with `sqlite_`, ordered by name.

mod cell;
mod errors;
mod sqlite;

pub use cell::{Cell, ColumnInfo, QueryOutput};
pub(crate) use cell::format_real;
pub use errors::{StoreError, StoreResult};
pub use sqlite::SqliteStore;

use crate::planner::Dialect;

/// Read-only access to a relational store
pub trait Store {
    /// Name of the table under analysis
    fn primary_table(&self) -> StoreResult<String>;

    /// Columns of `table` in declaration order
    fn columns(&self, table: &str) -> StoreResult<Vec<ColumnInfo>>;

    /// Executes `sql`, keeping at most `max_rows` rows
    fn query(&self, sql: &str, max_rows: usize) -> StoreResult<QueryOutput>;

    /// Query dialect used to render plans for this store
    fn dialect(&self) -> &dyn Dialect;

    /// Column names of the primary table
    fn column_names(&self) -> StoreResult<Vec<String>> {
        let table = self.primary_table()?;
        Ok(self.columns(&table)?.into_iter().map(|c| c.name).collect())
    }
}
