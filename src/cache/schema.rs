//! Schema Manager
//!
//! Lazily creates the cache table and remembers which layout is ready.

use tracing::{debug, info};

use crate::cache::entry::{EXPIRE_COLUMN, TIMESTAMP_COLUMN};
use crate::cache::identifier::{quote, ID_COLUMN};
use crate::cache::{DEFAULT_KEY_COLUMN, DEFAULT_PAYLOAD_COLUMN, DEFAULT_TABLE_NAME};
use crate::error::{CacheError, Result};
use crate::storage::Storage;

// == Table Layout ==
/// Identifiers naming the cache table and its configurable columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableLayout {
    pub table: String,
    pub key_column: String,
    pub payload_column: String,
}

impl Default for TableLayout {
    fn default() -> Self {
        Self {
            table: DEFAULT_TABLE_NAME.to_string(),
            key_column: DEFAULT_KEY_COLUMN.to_string(),
            payload_column: DEFAULT_PAYLOAD_COLUMN.to_string(),
        }
    }
}

impl TableLayout {
    /// Returns the `CREATE TABLE IF NOT EXISTS` statement for this layout.
    ///
    /// Timestamps are Unix milliseconds. `timestamp` defaults to the insert
    /// time; the engine refreshes it on every update.
    pub fn create_statement(&self) -> String {
        format!(
            "CREATE TABLE IF NOT EXISTS {table} (\
                {id} INTEGER PRIMARY KEY AUTOINCREMENT, \
                {key} TEXT NOT NULL UNIQUE, \
                {payload} TEXT NOT NULL, \
                {expire} INTEGER NULL DEFAULT NULL, \
                {timestamp} INTEGER NOT NULL \
                    DEFAULT (CAST(strftime('%s', 'now') AS INTEGER) * 1000)\
            )",
            table = quote(&self.table),
            id = quote(ID_COLUMN),
            key = quote(&self.key_column),
            payload = quote(&self.payload_column),
            expire = quote(EXPIRE_COLUMN),
            timestamp = quote(TIMESTAMP_COLUMN),
        )
    }
}

// == Schema State ==
/// Readiness of the backing table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SchemaState {
    /// No table has been ensured yet
    #[default]
    Uninitialized,
    /// The table for this layout exists
    Ready(TableLayout),
}

// == Schema Manager ==
/// Ensures the cache table exists before the engine touches it.
#[derive(Debug, Default)]
pub struct SchemaManager {
    state: SchemaState,
}

impl SchemaManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &SchemaState {
        &self.state
    }

    /// Returns true if the table for `layout` has already been ensured.
    pub fn is_ready_for(&self, layout: &TableLayout) -> bool {
        matches!(&self.state, SchemaState::Ready(ready) if ready == layout)
    }

    // == Ensure Ready ==
    /// Creates the table for `layout` unless it is already known to exist.
    ///
    /// A table that already existed is brought up to date: missing `expire`
    /// and `timestamp` columns are added and the key column gets a unique
    /// index. Fails with `DatabaseNotReady` when no storage is attached, a
    /// statement is rejected, or the key or payload column is missing. A
    /// failure leaves the state untouched.
    pub fn ensure_ready(&mut self, storage: Option<&dyn Storage>, layout: &TableLayout) -> Result<()> {
        if self.is_ready_for(layout) {
            return Ok(());
        }

        let storage = storage.ok_or_else(|| {
            CacheError::DatabaseNotReady("no storage connection configured".to_string())
        })?;

        storage
            .execute(&layout.create_statement(), &[])
            .map_err(|e| {
                CacheError::DatabaseNotReady(format!(
                    "could not create table `{}`: {}",
                    layout.table, e
                ))
            })?;
        upgrade_existing(storage, layout)?;

        info!("Cache table `{}` ready", layout.table);
        debug!(
            "Schema layout: key column `{}`, payload column `{}`",
            layout.key_column, layout.payload_column
        );
        self.state = SchemaState::Ready(layout.clone());
        Ok(())
    }
}

// == Legacy Tables ==
fn not_ready(layout: &TableLayout, e: impl std::fmt::Display) -> CacheError {
    CacheError::DatabaseNotReady(format!("table `{}`: {}", layout.table, e))
}

/// Adds what older tables lack so reads and upserts work against them.
fn upgrade_existing(storage: &dyn Storage, layout: &TableLayout) -> Result<()> {
    let table = quote(&layout.table);
    let columns: Vec<String> = storage
        .query(&format!("PRAGMA table_info({})", table), &[])
        .map_err(|e| not_ready(layout, e))?
        .iter()
        .filter_map(|row| row.text("name"))
        .collect();
    let has_column = |name: &str| columns.iter().any(|c| c.eq_ignore_ascii_case(name));

    for required in [&layout.key_column, &layout.payload_column] {
        if !has_column(required.as_str()) {
            return Err(not_ready(layout, format!("missing column `{}`", required)));
        }
    }

    if !has_column(EXPIRE_COLUMN) {
        storage
            .execute(
                &format!(
                    "ALTER TABLE {} ADD COLUMN {} INTEGER NULL DEFAULT NULL",
                    table,
                    quote(EXPIRE_COLUMN)
                ),
                &[],
            )
            .map_err(|e| not_ready(layout, e))?;
        info!("Added `{}` column to `{}`", EXPIRE_COLUMN, layout.table);
    }

    // ALTER TABLE only accepts constant defaults; old rows read as written at the epoch
    if !has_column(TIMESTAMP_COLUMN) {
        storage
            .execute(
                &format!(
                    "ALTER TABLE {} ADD COLUMN {} INTEGER NOT NULL DEFAULT 0",
                    table,
                    quote(TIMESTAMP_COLUMN)
                ),
                &[],
            )
            .map_err(|e| not_ready(layout, e))?;
        info!("Added `{}` column to `{}`", TIMESTAMP_COLUMN, layout.table);
    }

    if !key_is_unique(storage, layout)? {
        let index = quote(&format!("{}_{}_unique", layout.table, layout.key_column));
        storage
            .execute(
                &format!(
                    "CREATE UNIQUE INDEX IF NOT EXISTS {} ON {} ({})",
                    index,
                    table,
                    quote(&layout.key_column)
                ),
                &[],
            )
            .map_err(|e| not_ready(layout, e))?;
        info!("Added unique index on `{}`.`{}`", layout.table, layout.key_column);
    }

    Ok(())
}

/// Checks for a unique index covering exactly the key column.
fn key_is_unique(storage: &dyn Storage, layout: &TableLayout) -> Result<bool> {
    let indexes = storage
        .query(&format!("PRAGMA index_list({})", quote(&layout.table)), &[])
        .map_err(|e| not_ready(layout, e))?;

    for index in indexes {
        if index.integer("unique") != Some(1) {
            continue;
        }
        let Some(name) = index.text("name") else {
            continue;
        };
        let columns = storage
            .query(&format!("PRAGMA index_info({})", quote(&name)), &[])
            .map_err(|e| not_ready(layout, e))?;
        if let [column] = columns.as_slice() {
            if column
                .text("name")
                .is_some_and(|c| c.eq_ignore_ascii_case(&layout.key_column))
            {
                return Ok(true);
            }
        }
    }
    Ok(false)
}
