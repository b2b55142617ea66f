//! Cache Module
//!
//! Provides a persistent key/value cache with TTL expiration and an optional
//! hierarchical key namespace on top.

pub mod codec;
mod entry;
mod hierarchy;
pub mod identifier;
mod schema;
mod store;


use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};

use crate::error::Result;

// Re-export public types
pub use entry::{CacheEntry, Expiration, FreshnessPolicy};
pub use hierarchy::HierarchicalCache;
pub use schema::{SchemaManager, SchemaState, TableLayout};
pub use store::{PurgePolicy, SimpleCache};

// == Public Constants ==
/// Default lifetime of cached data in seconds (1 hour)
pub const DEFAULT_LIFETIME: u64 = 3600;

/// Lifetime meaning "never expires"
pub const IMMORTAL_LIFETIME: u64 = 0;

/// Default cache table name
pub const DEFAULT_TABLE_NAME: &str = "cache";

/// Default key column name
pub const DEFAULT_KEY_COLUMN: &str = "key";

/// Default payload column name
pub const DEFAULT_PAYLOAD_COLUMN: &str = "cache";

/// Default separator between hierarchy segments
pub const DEFAULT_DELIMITER: &str = "/";

/// Default replacement for delimiters found inside a segment
pub const DEFAULT_PLACEHOLDER: &str = "_";

// == TTL Cache ==
/// Key/value operations shared by the engine and the key namespace.
///
/// Payloads are already-encoded strings; [`TtlCache::get`] and
/// [`TtlCache::set`] add the codec on top.
pub trait TtlCache {
    /// Returns the payload of the fresh row for `key`, if any.
    fn fetch(&mut self, key: &str) -> Result<Option<String>>;

    /// Inserts or replaces the payload for `key`.
    ///
    /// `lifetime` overrides the default lifetime; `Some(0)` stores an
    /// immortal row.
    fn store(&mut self, key: &str, payload: String, lifetime: Option<u64>) -> Result<()>;

    /// Removes the row for `key`. Removing an absent key succeeds.
    fn delete(&mut self, key: &str) -> Result<()>;

    /// Returns the raw row for `key` regardless of freshness.
    fn get_entry(&mut self, key: &str) -> Result<Option<CacheEntry>>;

    /// Deletes expired rows and returns how many were removed.
    fn purge_expired(&mut self) -> Result<usize>;

    /// Returns the last write time of the row for `key`.
    fn get_timestamp(&mut self, key: &str) -> Result<Option<DateTime<Utc>>> {
        Ok(self.get_entry(key)?.map(|entry| entry.updated_at))
    }

    /// Returns the stored expiration of the row for `key`.
    fn get_expiration(&mut self, key: &str) -> Result<Option<Expiration>> {
        Ok(self.get_entry(key)?.map(|entry| entry.expiration()))
    }

    /// Reads and decodes the fresh value for `key`.
    fn get<T: DeserializeOwned>(&mut self, key: &str) -> Result<Option<T>>
    where
        Self: Sized,
    {
        self.fetch(key)?
            .map(|payload| codec::decode(&payload))
            .transpose()
    }

    /// Encodes and stores `value` under `key`.
    fn set<T: Serialize + ?Sized>(&mut self, key: &str, value: &T, lifetime: Option<u64>) -> Result<()>
    where
        Self: Sized,
    {
        let payload = codec::encode(value)?;
        self.store(key, payload, lifetime)
    }
}
