//! SQLite-backed store
//!
//! Borrows an open `rusqlite::Connection`. The store never opens, closes or
//! writes to the connection.

use rusqlite::types::ValueRef;
use rusqlite::Connection;

use crate::planner::{Dialect, SqliteDialect};

use super::cell::{Cell, ColumnInfo, QueryOutput};
use super::errors::{StoreError, StoreResult};
use super::Store;

/// Store over a borrowed SQLite connection
pub struct SqliteStore<'a> {
    conn: &'a Connection,
    table: Option<String>,
    dialect: SqliteDialect,
}

impl<'a> SqliteStore<'a> {
    /// Creates a store that analyzes the first user table (by name)
    pub fn new(conn: &'a Connection) -> Self {
        Self {
            conn,
            table: None,
            dialect: SqliteDialect,
        }
    }

    /// Creates a store pinned to an explicit table
    pub fn with_table(conn: &'a Connection, table: impl Into<String>) -> Self {
        Self {
            conn,
            table: Some(table.into()),
            dialect: SqliteDialect,
        }
    }

    /// Returns the underlying connection
    pub fn connection(&self) -> &Connection {
        self.conn
    }

    fn table_exists(&self, table: &str) -> StoreResult<bool> {
        let mut stmt = self
            .conn
            .prepare("SELECT COUNT(*) FROM sqlite_master WHERE type IN ('table', 'view') AND name = ?1")?;
        let count: i64 = stmt.query_row([table], |row| row.get(0))?;
        Ok(count > 0)
    }
}

impl Store for SqliteStore<'_> {
    fn primary_table(&self) -> StoreResult<String> {
        if let Some(table) = &self.table {
            if !self.table_exists(table)? {
                return Err(StoreError::UnknownTable(table.clone()));
            }
            return Ok(table.clone());
        }

        let mut stmt = self.conn.prepare(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name LIMIT 1",
        )?;
        let mut rows = stmt.query([])?;
        match rows.next()? {
            Some(row) => Ok(row.get(0)?),
            None => Err(StoreError::NoTables),
        }
    }

    fn columns(&self, table: &str) -> StoreResult<Vec<ColumnInfo>> {
        let mut stmt = self
            .conn
            .prepare("SELECT name, type FROM pragma_table_info(?1) ORDER BY cid")?;
        let columns = stmt
            .query_map([table], |row| {
                Ok(ColumnInfo::new(
                    row.get::<_, String>(0)?,
                    row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        if columns.is_empty() {
            if self.table_exists(table)? {
                return Err(StoreError::NoColumns(table.to_string()));
            }
            return Err(StoreError::UnknownTable(table.to_string()));
        }
        Ok(columns)
    }

    fn query(&self, sql: &str, max_rows: usize) -> StoreResult<QueryOutput> {
        let mut stmt = self.conn.prepare(sql)?;
        let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();
        let width = columns.len();

        let mut output = QueryOutput {
            columns,
            rows: Vec::new(),
            truncated: false,
        };

        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            if output.rows.len() >= max_rows {
                output.truncated = true;
                break;
            }
            let mut cells = Vec::with_capacity(width);
            for i in 0..width {
                cells.push(to_cell(row.get_ref(i)?));
            }
            output.rows.push(cells);
        }

        Ok(output)
    }

    fn dialect(&self) -> &dyn Dialect {
        &self.dialect
    }
}

fn to_cell(value: ValueRef<'_>) -> Cell {
    match value {
        ValueRef::Null => Cell::Null,
        ValueRef::Integer(v) => Cell::Integer(v),
        ValueRef::Real(v) => Cell::Real(v),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            Cell::Text(String::from_utf8_lossy(bytes).into_owned())
        }
    }
}
