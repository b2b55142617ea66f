//! Cache Store Module
//!
//! Main cache engine: a TTL key/value store persisted in a relational table.

use std::fmt;
use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::cache::entry::{
    current_timestamp_ms, expiration_for, lifetime_ms, EXPIRE_COLUMN, TIMESTAMP_COLUMN,
};
use crate::cache::identifier::{is_reserved_column, quote, validate_identifier};
use crate::cache::{
    CacheEntry, FreshnessPolicy, SchemaManager, SchemaState, TableLayout, TtlCache,
    DEFAULT_LIFETIME, IMMORTAL_LIFETIME,
};
use crate::config::CacheOptions;
use crate::error::{CacheError, Result};
use crate::storage::{SqlValue, Storage, StorageError};

// == Purge Policy ==
/// Which rows [`SimpleCache::purge_expired`] removes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PurgePolicy {
    /// Only rows whose stored expiration has passed
    #[default]
    ExplicitOnly,
    /// Also rows without a stored expiration that are older than the
    /// current default lifetime
    IncludeDefaultLifetime,
}

// == Simple Cache ==
/// Persistent TTL cache over a [`Storage`] connection.
///
/// The backing table is created lazily by the first operation that needs it,
/// or eagerly through [`SimpleCache::ensure_ready`].
pub struct SimpleCache {
    /// Shared connection, None until one is attached
    storage: Option<Arc<dyn Storage>>,
    /// Table and column names
    layout: TableLayout,
    /// Lifetime in seconds for writes without an override
    default_lifetime: u64,
    freshness: FreshnessPolicy,
    purge_policy: PurgePolicy,
    schema: SchemaManager,
}

impl fmt::Debug for SimpleCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimpleCache")
            .field("connected", &self.storage.is_some())
            .field("layout", &self.layout)
            .field("default_lifetime", &self.default_lifetime)
            .field("freshness", &self.freshness)
            .field("purge_policy", &self.purge_policy)
            .field("schema", self.schema.state())
            .finish()
    }
}

impl SimpleCache {
    // == Constructors ==
    /// Creates a cache over `storage` with the default table layout.
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self {
            storage: Some(storage),
            ..Self::detached()
        }
    }

    /// Creates a cache with no storage attached.
    ///
    /// Identifier changes are rejected and every operation fails with
    /// `DatabaseNotReady` until [`SimpleCache::set_storage`] is called.
    pub fn detached() -> Self {
        Self {
            storage: None,
            layout: TableLayout::default(),
            default_lifetime: DEFAULT_LIFETIME,
            freshness: FreshnessPolicy::default(),
            purge_policy: PurgePolicy::default(),
            schema: SchemaManager::new(),
        }
    }

    /// Creates a cache configured from `options`.
    ///
    /// Runs a purge right away when `purge_on_start` is set.
    pub fn from_options(storage: Arc<dyn Storage>, options: &CacheOptions) -> Result<Self> {
        let mut cache = Self::new(storage);
        cache.set_table_name(&options.table)?;
        cache.set_columns(&options.key_column, &options.payload_column)?;
        cache.set_default_lifetime(options.default_lifetime_seconds);
        cache.freshness = options.freshness;
        cache.purge_policy = options.purge;

        if options.purge_on_start {
            let removed = cache.purge_expired()?;
            info!("Startup purge removed {} expired entries", removed);
        }

        Ok(cache)
    }

    // == Configuration ==
    /// Attaches a storage connection, replacing any previous one.
    ///
    /// The table is ensured again on the next operation.
    pub fn set_storage(&mut self, storage: Arc<dyn Storage>) {
        self.storage = Some(storage);
        self.schema = SchemaManager::new();
    }

    pub fn has_storage(&self) -> bool {
        self.storage.is_some()
    }

    pub fn layout(&self) -> &TableLayout {
        &self.layout
    }

    pub fn schema_state(&self) -> &SchemaState {
        self.schema.state()
    }

    /// Sets the cache table name.
    ///
    /// On rejection the previous name is kept. An existing table is never
    /// renamed; later calls simply target the new one.
    pub fn set_table_name(&mut self, table: &str) -> Result<()> {
        self.check_identifier("table", table)?;
        self.layout.table = table.to_string();
        Ok(())
    }

    /// Sets the key column name.
    pub fn set_key_column(&mut self, column: &str) -> Result<()> {
        self.check_column("key", column, &self.layout.payload_column)?;
        self.layout.key_column = column.to_string();
        Ok(())
    }

    /// Sets the payload column name.
    pub fn set_payload_column(&mut self, column: &str) -> Result<()> {
        self.check_column("payload", column, &self.layout.key_column)?;
        self.layout.payload_column = column.to_string();
        Ok(())
    }

    /// Sets both column names at once.
    ///
    /// The pair is checked against each other rather than the current
    /// layout, so the defaults can be swapped or reused. Nothing changes if
    /// either name is rejected.
    pub fn set_columns(&mut self, key_column: &str, payload_column: &str) -> Result<()> {
        self.check_column("key", key_column, payload_column)?;
        self.check_column("payload", payload_column, key_column)?;
        self.layout.key_column = key_column.to_string();
        self.layout.payload_column = payload_column.to_string();
        Ok(())
    }

    /// Reconfigures any of the identifiers, then ensures the table exists.
    ///
    /// Identifiers are validated before anything changes; if one is
    /// rejected the layout is left as it was.
    pub fn build(
        &mut self,
        table: Option<&str>,
        key_column: Option<&str>,
        payload_column: Option<&str>,
    ) -> Result<()> {
        let previous = self.layout.clone();
        let applied = self.apply_layout(table, key_column, payload_column);
        if applied.is_err() {
            self.layout = previous;
        }
        applied?;
        self.ensure_ready()
    }

    fn apply_layout(
        &mut self,
        table: Option<&str>,
        key_column: Option<&str>,
        payload_column: Option<&str>,
    ) -> Result<()> {
        if let Some(table) = table {
            self.set_table_name(table)?;
        }
        match (key_column, payload_column) {
            (Some(key), Some(payload)) => self.set_columns(key, payload),
            (Some(key), None) => self.set_key_column(key),
            (None, Some(payload)) => self.set_payload_column(payload),
            (None, None) => Ok(()),
        }
    }

    /// Returns the default lifetime in seconds (0 = immortal).
    pub fn default_lifetime(&self) -> u64 {
        self.default_lifetime
    }

    /// Sets the lifetime used by writes without an override.
    ///
    /// Negative values are treated as zero (immortal). Under
    /// [`FreshnessPolicy::DefaultLifetime`] this also changes the freshness of
    /// rows stored without an expiration.
    pub fn set_default_lifetime(&mut self, seconds: i64) {
        self.default_lifetime = seconds.max(0) as u64;
    }

    pub fn freshness_policy(&self) -> FreshnessPolicy {
        self.freshness
    }

    pub fn set_freshness_policy(&mut self, policy: FreshnessPolicy) {
        self.freshness = policy;
    }

    pub fn purge_policy(&self) -> PurgePolicy {
        self.purge_policy
    }

    pub fn set_purge_policy(&mut self, policy: PurgePolicy) {
        self.purge_policy = policy;
    }

    // == Ensure Ready ==
    /// Creates the cache table if it has not been ensured for the current
    /// layout. Idempotent.
    pub fn ensure_ready(&mut self) -> Result<()> {
        self.schema
            .ensure_ready(self.storage.as_deref(), &self.layout)
    }

    fn ready_storage(&mut self) -> Result<Arc<dyn Storage>> {
        self.ensure_ready()?;
        self.storage.clone().ok_or_else(|| {
            CacheError::DatabaseNotReady("no storage connection configured".to_string())
        })
    }

    fn check_identifier(&self, kind: &str, name: &str) -> Result<()> {
        if validate_identifier(self.storage.as_deref(), name) {
            Ok(())
        } else {
            warn!("Rejected {} name `{}`", kind, name);
            Err(CacheError::InvalidIdentifier(format!(
                "`{}` is not a valid {} name",
                name, kind
            )))
        }
    }

    fn check_column(&self, kind: &str, name: &str, other: &str) -> Result<()> {
        self.check_identifier(kind, name)?;
        if is_reserved_column(name) || name.eq_ignore_ascii_case(other) {
            warn!("Rejected {} column `{}`: name already in use", kind, name);
            return Err(CacheError::InvalidIdentifier(format!(
                "`{}` collides with another cache column",
                name
            )));
        }
        Ok(())
    }

    // == Freshness Predicate ==
    /// SQL condition selecting fresh rows at `now_ms`, with its parameters
    /// numbered from `?2` (the key is `?1`).
    fn freshness_predicate(&self, now_ms: i64) -> (String, Vec<SqlValue>) {
        let expire = quote(EXPIRE_COLUMN);
        let timestamp = quote(TIMESTAMP_COLUMN);

        match self.freshness {
            FreshnessPolicy::StoredExpiration => (
                format!("({expire} IS NULL OR {expire} > ?2)"),
                vec![SqlValue::from(now_ms)],
            ),
            FreshnessPolicy::DefaultLifetime if self.default_lifetime == IMMORTAL_LIFETIME => (
                format!("({expire} IS NULL OR {expire} > ?2)"),
                vec![SqlValue::from(now_ms)],
            ),
            FreshnessPolicy::DefaultLifetime => {
                let cutoff = now_ms.saturating_sub(lifetime_ms(self.default_lifetime));
                (
                    format!(
                        "(({expire} IS NOT NULL AND {expire} > ?2) \
                         OR ({expire} IS NULL AND {timestamp} > ?3))"
                    ),
                    vec![SqlValue::from(now_ms), SqlValue::from(cutoff)],
                )
            }
        }
    }
}

impl TtlCache for SimpleCache {
    // == Fetch ==
    /// Returns the payload of the newest fresh row for `key`.
    fn fetch(&mut self, key: &str) -> Result<Option<String>> {
        let storage = self.ready_storage()?;
        let (predicate, extra) = self.freshness_predicate(current_timestamp_ms());

        let sql = format!(
            "SELECT {payload} FROM {table} WHERE {key_col} = ?1 AND {predicate} \
             ORDER BY {timestamp} DESC LIMIT 1",
            payload = quote(&self.layout.payload_column),
            table = quote(&self.layout.table),
            key_col = quote(&self.layout.key_column),
            timestamp = quote(TIMESTAMP_COLUMN),
        );
        let mut params = vec![SqlValue::from(key)];
        params.extend(extra);

        let rows = storage.query(&sql, &params)?;
        match rows.first() {
            Some(row) => {
                let payload = row.text(&self.layout.payload_column).ok_or_else(|| {
                    StorageError::UnexpectedRow(format!(
                        "payload column `{}` missing for `{}`",
                        self.layout.payload_column, key
                    ))
                })?;
                debug!("Cache hit for `{}`", key);
                Ok(Some(payload))
            }
            None => {
                debug!("Cache miss for `{}`", key);
                Ok(None)
            }
        }
    }

    // == Store ==
    /// Writes `payload` for `key` in a single atomic upsert.
    ///
    /// The expiration is computed now from `lifetime` (or the default
    /// lifetime); a lifetime of zero stores no expiration.
    fn store(&mut self, key: &str, payload: String, lifetime: Option<u64>) -> Result<()> {
        let storage = self.ready_storage()?;
        let now = current_timestamp_ms();
        let expire = expiration_for(now, lifetime.unwrap_or(self.default_lifetime));

        let key_col = quote(&self.layout.key_column);
        let payload_col = quote(&self.layout.payload_column);
        let expire_col = quote(EXPIRE_COLUMN);
        let timestamp_col = quote(TIMESTAMP_COLUMN);
        let sql = format!(
            "INSERT INTO {table} ({key_col}, {payload_col}, {expire_col}, {timestamp_col}) \
             VALUES (?1, ?2, ?3, ?4) \
             ON CONFLICT({key_col}) DO UPDATE SET \
                {payload_col} = excluded.{payload_col}, \
                {expire_col} = excluded.{expire_col}, \
                {timestamp_col} = excluded.{timestamp_col}",
            table = quote(&self.layout.table),
        );
        let params = [
            SqlValue::from(key),
            SqlValue::from(payload),
            SqlValue::from(expire),
            SqlValue::from(now),
        ];

        match storage.execute(&sql, &params) {
            Ok(0) => Err(CacheError::CacheWriteFailed(format!(
                "no row written for `{}`",
                key
            ))),
            Ok(_) => {
                debug!("Stored `{}` (expire: {:?})", key, expire);
                Ok(())
            }
            Err(e) => Err(CacheError::CacheWriteFailed(format!(
                "could not write `{}`: {}",
                key, e
            ))),
        }
    }

    // == Delete ==
    fn delete(&mut self, key: &str) -> Result<()> {
        let storage = self.ready_storage()?;
        let sql = format!(
            "DELETE FROM {} WHERE {} = ?1",
            quote(&self.layout.table),
            quote(&self.layout.key_column)
        );
        let removed = storage.execute(&sql, &[SqlValue::from(key)])?;
        debug!("Deleted `{}` ({} rows)", key, removed);
        Ok(())
    }

    // == Get Entry ==
    fn get_entry(&mut self, key: &str) -> Result<Option<CacheEntry>> {
        let storage = self.ready_storage()?;
        let sql = format!(
            "SELECT * FROM {} WHERE {} = ?1 ORDER BY {} DESC LIMIT 1",
            quote(&self.layout.table),
            quote(&self.layout.key_column),
            quote(TIMESTAMP_COLUMN)
        );

        let rows = storage.query(&sql, &[SqlValue::from(key)])?;
        let Some(row) = rows.first() else {
            return Ok(None);
        };

        let entry = CacheEntry::from_row(row, &self.layout.key_column, &self.layout.payload_column)
            .ok_or_else(|| StorageError::UnexpectedRow(format!("malformed row for `{}`", key)))?;
        Ok(Some(entry))
    }

    // == Purge Expired ==
    /// Deletes every row whose stored expiration is strictly in the past.
    ///
    /// With [`PurgePolicy::IncludeDefaultLifetime`] and a finite default
    /// lifetime, rows without an expiration that are older than the default
    /// lifetime are deleted as well.
    fn purge_expired(&mut self) -> Result<usize> {
        let storage = self.ready_storage()?;
        let now = current_timestamp_ms();
        let expire = quote(EXPIRE_COLUMN);
        let table = quote(&self.layout.table);

        let removed = match self.purge_policy {
            PurgePolicy::IncludeDefaultLifetime if self.default_lifetime != IMMORTAL_LIFETIME => {
                let cutoff = now.saturating_sub(lifetime_ms(self.default_lifetime));
                let sql = format!(
                    "DELETE FROM {table} WHERE ({expire} IS NOT NULL AND {expire} < ?1) \
                     OR ({expire} IS NULL AND {timestamp} <= ?2)",
                    timestamp = quote(TIMESTAMP_COLUMN),
                );
                storage.execute(&sql, &[SqlValue::from(now), SqlValue::from(cutoff)])?
            }
            _ => {
                let sql = format!(
                    "DELETE FROM {table} WHERE {expire} IS NOT NULL AND {expire} < ?1"
                );
                storage.execute(&sql, &[SqlValue::from(now)])?
            }
        };

        info!("Purged {} expired entries from `{}`", removed, self.layout.table);
        Ok(removed)
    }
}
