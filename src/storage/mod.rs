//! Storage Module
//!
//! The relational backend the cache persists into, accessed through a small
//! execute/query/escape interface so the engine never depends on a driver.

mod sqlite;

use std::collections::HashMap;
use std::path::PathBuf;

use thiserror::Error;

pub use sqlite::SqliteStorage;

// == Storage Error ==
/// Failures raised by a storage backend.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Error reported by SQLite
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// The connection mutex was poisoned by a panicking holder
    #[error("Connection lock poisoned: {0}")]
    LockPoisoned(String),

    /// A row did not have the expected shape
    #[error("Unexpected row: {0}")]
    UnexpectedRow(String),

    /// Filesystem error while preparing the database location
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

// == SQL Value ==
/// A single bound parameter or column value.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::Text(value.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        SqlValue::Text(value)
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        SqlValue::Integer(value)
    }
}

impl From<Option<i64>> for SqlValue {
    fn from(value: Option<i64>) -> Self {
        value.map_or(SqlValue::Null, SqlValue::Integer)
    }
}

// == Row ==
/// A result row as a column-name to value map.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    fields: HashMap<String, SqlValue>,
}

impl Row {
    /// Creates a row from its column values.
    pub fn new(fields: HashMap<String, SqlValue>) -> Self {
        Self { fields }
    }

    /// Returns the raw value of a column.
    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        self.fields.get(column)
    }

    /// Returns a text column. Blobs are decoded as UTF-8 when possible.
    pub fn text(&self, column: &str) -> Option<String> {
        match self.fields.get(column)? {
            SqlValue::Text(s) => Some(s.clone()),
            SqlValue::Blob(b) => String::from_utf8(b.clone()).ok(),
            _ => None,
        }
    }

    /// Returns an integer column, `None` for NULL or non-integer values.
    pub fn integer(&self, column: &str) -> Option<i64> {
        match self.fields.get(column)? {
            SqlValue::Integer(i) => Some(*i),
            _ => None,
        }
    }
}

// == Storage Trait ==
/// A blocking connection to a relational store.
///
/// Implementations must be shareable across threads; the cache engine holds
/// one as `Arc<dyn Storage>` and issues every round-trip through it.
pub trait Storage: Send + Sync {
    /// Executes a statement and returns the number of affected rows.
    fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<usize, StorageError>;

    /// Runs a query and returns every resulting row.
    fn query(&self, sql: &str, params: &[SqlValue]) -> Result<Vec<Row>, StorageError>;

    /// Escapes a string for inclusion in a quoted SQL literal.
    fn escape(&self, raw: &str) -> String;
}
