//! Response DTOs for the cache server API
//!
//! Defines the structure of outgoing HTTP response bodies.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::cache::{CacheEntry, Expiration};

/// Response body for the GET operation (GET /get/:key)
#[derive(Debug, Clone, Serialize)]
pub struct GetResponse {
    /// The requested key
    pub key: String,
    /// The stored value
    pub value: serde_json::Value,
}

impl GetResponse {
    /// Creates a new GetResponse
    pub fn new(key: impl Into<String>, value: serde_json::Value) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }
}

/// Response body for the SET operation (PUT /set)
#[derive(Debug, Clone, Serialize)]
pub struct SetResponse {
    /// Success message
    pub message: String,
    /// The key that was set
    pub key: String,
}

impl SetResponse {
    /// Creates a new SetResponse
    pub fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            message: format!("Key '{}' set successfully", key),
            key,
        }
    }
}

/// Response body for the DELETE operation (DELETE /del/:key)
#[derive(Debug, Clone, Serialize)]
pub struct DeleteResponse {
    /// Success message
    pub message: String,
    /// The key that was deleted
    pub key: String,
}

impl DeleteResponse {
    /// Creates a new DeleteResponse
    pub fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            message: format!("Key '{}' deleted successfully", key),
            key,
        }
    }
}

/// Response body for GET /meta/:key
#[derive(Debug, Clone, Serialize)]
pub struct MetaResponse {
    /// The requested key
    pub key: String,
    /// Key as stored, after hierarchy resolution
    pub resolved_key: String,
    /// Last write time
    pub timestamp: DateTime<Utc>,
    /// Stored expiration, null when the row never expires
    pub expires_at: Option<DateTime<Utc>>,
    /// Whether a read would currently return the value
    pub fresh: bool,
}

impl MetaResponse {
    /// Creates a MetaResponse from a stored row
    pub fn new(key: impl Into<String>, entry: &CacheEntry, fresh: bool) -> Self {
        Self {
            key: key.into(),
            resolved_key: entry.key.clone(),
            timestamp: entry.updated_at,
            expires_at: match entry.expiration() {
                Expiration::Never => None,
                Expiration::At(at) => Some(at),
            },
            fresh,
        }
    }
}

/// Response body for POST /purge
#[derive(Debug, Clone, Serialize)]
pub struct PurgeResponse {
    /// Number of rows removed
    pub removed: usize,
}

/// Response body for PUT /lifetime
#[derive(Debug, Clone, Serialize)]
pub struct LifetimeResponse {
    /// Effective default lifetime in seconds (0 = immortal)
    pub default_lifetime: u64,
}

/// Response body for the namespace endpoints
#[derive(Debug, Clone, Serialize)]
pub struct NamespaceResponse {
    /// Current hierarchy base
    pub base: String,
    /// Segment separator
    pub delimiter: String,
    /// Replacement for delimiters inside a segment
    pub placeholder: String,
}

/// Response body for POST /namespace/pop
#[derive(Debug, Clone, Serialize)]
pub struct PopResponse {
    /// Segment removed from the base, null when already at the root
    pub removed: Option<String>,
    /// Base after the pop
    pub base: String,
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}
