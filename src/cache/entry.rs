//! Cache Entry Module
//!
//! Defines the stored row for a key, its expiration and the freshness rule.

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;

use crate::cache::IMMORTAL_LIFETIME;
use crate::storage::Row;

/// Name of the nullable absolute-expiration column.
pub const EXPIRE_COLUMN: &str = "expire";

/// Name of the last-write column.
pub const TIMESTAMP_COLUMN: &str = "timestamp";

// == Freshness Policy ==
/// How rows without a stored expiration are judged at read time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FreshnessPolicy {
    /// A row without `expire` stays fresh while `timestamp + default lifetime`
    /// is in the future, using the engine's current default lifetime.
    /// A default of zero makes such rows immortal.
    #[default]
    DefaultLifetime,
    /// A row without `expire` never goes stale.
    StoredExpiration,
}

// == Expiration ==
/// Stored expiration of an existing row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiration {
    /// No expiration was stored (immortal write)
    Never,
    /// Absolute expiration instant
    At(DateTime<Utc>),
}

impl Expiration {
    /// Returns the instant, or `None` for an immortal row.
    pub fn at(&self) -> Option<DateTime<Utc>> {
        match self {
            Expiration::Never => None,
            Expiration::At(at) => Some(*at),
        }
    }

    pub fn is_never(&self) -> bool {
        matches!(self, Expiration::Never)
    }
}

// == Cache Entry ==
/// A single persisted cache row.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    /// Storage key (already resolved by any namespace)
    pub key: String,
    /// Serialized value
    pub payload: String,
    /// Insert or last update time
    pub updated_at: DateTime<Utc>,
    /// Absolute expiration, None = not stored
    pub expires_at: Option<DateTime<Utc>>,
}

impl CacheEntry {
    // == From Row ==
    /// Builds an entry from a `SELECT *` row of the cache table.
    ///
    /// Returns `None` when a required column is missing or malformed.
    pub fn from_row(row: &Row, key_column: &str, payload_column: &str) -> Option<Self> {
        let expires_at = match row.integer(EXPIRE_COLUMN) {
            // Rows written before clamping may hold an unrepresentable instant
            Some(ms) => Some(from_timestamp_ms(ms.min(max_timestamp_ms()))?),
            None => None,
        };

        Some(Self {
            key: row.text(key_column)?,
            payload: row.text(payload_column)?,
            updated_at: from_timestamp_ms(row.integer(TIMESTAMP_COLUMN)?)?,
            expires_at,
        })
    }

    /// Returns the stored expiration of this row.
    pub fn expiration(&self) -> Expiration {
        self.expires_at.map_or(Expiration::Never, Expiration::At)
    }

    // == Is Fresh ==
    /// Checks whether the row may still be returned by a read at `now`.
    ///
    /// A stored expiration is authoritative: the row is fresh while
    /// `now < expires_at`. Rows without one follow `policy`.
    pub fn is_fresh(
        &self,
        now: DateTime<Utc>,
        default_lifetime: u64,
        policy: FreshnessPolicy,
    ) -> bool {
        match (self.expires_at, policy) {
            (Some(expires), _) => expires > now,
            (None, FreshnessPolicy::StoredExpiration) => true,
            (None, FreshnessPolicy::DefaultLifetime) => {
                if default_lifetime == IMMORTAL_LIFETIME {
                    return true;
                }
                let lifetime = Duration::milliseconds(lifetime_ms(default_lifetime));
                // Out-of-range deadlines are treated as never reached
                self.updated_at
                    .checked_add_signed(lifetime)
                    .map_or(true, |deadline| deadline > now)
            }
        }
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Converts stored milliseconds back into a UTC instant.
pub fn from_timestamp_ms(ms: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms)
}

/// Converts a lifetime in seconds into milliseconds, saturating.
pub fn lifetime_ms(lifetime_seconds: u64) -> i64 {
    i64::try_from(lifetime_seconds)
        .unwrap_or(i64::MAX)
        .saturating_mul(1000)
}

/// Latest instant that still converts back into a `DateTime<Utc>`.
pub fn max_timestamp_ms() -> i64 {
    DateTime::<Utc>::MAX_UTC.timestamp_millis()
}

/// Computes the absolute expiration for a write at `now_ms`.
///
/// Returns `None` for the immortal lifetime. Lifetimes reaching past the
/// representable range are clamped to [`max_timestamp_ms`].
pub fn expiration_for(now_ms: i64, lifetime_seconds: u64) -> Option<i64> {
    if lifetime_seconds == IMMORTAL_LIFETIME {
        None
    } else {
        Some(
            now_ms
                .saturating_add(lifetime_ms(lifetime_seconds))
                .min(max_timestamp_ms()),
        )
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::SqlValue;
    use std::collections::HashMap;

    fn entry(updated_at: DateTime<Utc>, expires_at: Option<DateTime<Utc>>) -> CacheEntry {
        CacheEntry {
            key: "k".to_string(),
            payload: "\"v\"".to_string(),
            updated_at,
            expires_at,
        }
    }

    #[test]
    fn test_expiration_for_immortal() {
        assert_eq!(expiration_for(1_000, IMMORTAL_LIFETIME), None);
    }

    #[test]
    fn test_expiration_for_lifetime() {
        assert_eq!(expiration_for(1_000, 60), Some(61_000));
    }

    #[test]
    fn test_expiration_for_clamps_to_representable_range() {
        let max = max_timestamp_ms();
        assert_eq!(expiration_for(i64::MAX - 1, u64::MAX), Some(max));
        assert_eq!(expiration_for(1_000, 10_000_000_000_000), Some(max));
        assert!(from_timestamp_ms(max).is_some());
    }

    #[test]
    fn test_explicit_expiration_is_authoritative() {
        let now = Utc::now();
        let live = entry(now - Duration::hours(5), Some(now + Duration::seconds(10)));
        let dead = entry(now, Some(now - Duration::seconds(1)));

        // Default lifetime is irrelevant once an expiration is stored
        assert!(live.is_fresh(now, 1, FreshnessPolicy::DefaultLifetime));
        assert!(!dead.is_fresh(now, 3600, FreshnessPolicy::DefaultLifetime));
        assert!(!dead.is_fresh(now, 3600, FreshnessPolicy::StoredExpiration));
    }

    #[test]
    fn test_expiration_boundary_condition() {
        let now = Utc::now();
        let boundary = entry(now, Some(now));
        assert!(!boundary.is_fresh(now, 0, FreshnessPolicy::DefaultLifetime));
    }

    #[test]
    fn test_default_lifetime_policy() {
        let now = Utc::now();
        let old = entry(now - Duration::seconds(120), None);

        assert!(!old.is_fresh(now, 60, FreshnessPolicy::DefaultLifetime));
        assert!(old.is_fresh(now, 600, FreshnessPolicy::DefaultLifetime));
        assert!(old.is_fresh(now, IMMORTAL_LIFETIME, FreshnessPolicy::DefaultLifetime));
    }

    #[test]
    fn test_stored_expiration_policy_keeps_unexpiring_rows() {
        let now = Utc::now();
        let old = entry(now - Duration::days(30), None);
        assert!(old.is_fresh(now, 60, FreshnessPolicy::StoredExpiration));
    }

    #[test]
    fn test_expiration_accessors() {
        let now = Utc::now();
        assert!(entry(now, None).expiration().is_never());
        assert_eq!(entry(now, Some(now)).expiration().at(), Some(now));
    }

    #[test]
    fn test_from_row() {
        let mut fields = HashMap::new();
        fields.insert("key".to_string(), SqlValue::Text("k".to_string()));
        fields.insert("cache".to_string(), SqlValue::Text("1".to_string()));
        fields.insert(TIMESTAMP_COLUMN.to_string(), SqlValue::Integer(1_000));
        fields.insert(EXPIRE_COLUMN.to_string(), SqlValue::Null);

        let parsed = CacheEntry::from_row(&Row::new(fields), "key", "cache").unwrap();
        assert_eq!(parsed.key, "k");
        assert_eq!(parsed.payload, "1");
        assert_eq!(parsed.updated_at.timestamp_millis(), 1_000);
        assert!(parsed.expires_at.is_none());
    }

    #[test]
    fn test_from_row_out_of_range_expiration() {
        let mut fields = HashMap::new();
        fields.insert("key".to_string(), SqlValue::Text("k".to_string()));
        fields.insert("cache".to_string(), SqlValue::Text("1".to_string()));
        fields.insert(TIMESTAMP_COLUMN.to_string(), SqlValue::Integer(1_000));
        fields.insert(EXPIRE_COLUMN.to_string(), SqlValue::Integer(i64::MAX));

        let parsed = CacheEntry::from_row(&Row::new(fields), "key", "cache").unwrap();
        let expires_at = parsed.expires_at.unwrap();
        assert_eq!(expires_at.timestamp_millis(), max_timestamp_ms());
    }

    #[test]
    fn test_from_row_missing_column() {
        let row = Row::new(HashMap::new());
        assert!(CacheEntry::from_row(&row, "key", "cache").is_none());
    }
}
