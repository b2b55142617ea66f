//! Request DTOs for the cache server API
//!
//! Defines the structure of incoming HTTP request bodies.

use serde::Deserialize;

/// Maximum accepted key length in bytes.
pub const MAX_KEY_LENGTH: usize = 256;

/// Request body for the SET operation (PUT /set)
///
/// # Fields
/// - `key`: The cache key, resolved against the current hierarchy base
/// - `value`: Any JSON value to store
/// - `ttl`: Optional lifetime in seconds (0 = never expires)
#[derive(Debug, Clone, Deserialize)]
pub struct SetRequest {
    /// The cache key
    pub key: String,
    /// The value to store
    pub value: serde_json::Value,
    /// Optional TTL in seconds
    #[serde(default)]
    pub ttl: Option<u64>,
}

impl SetRequest {
    /// Validates the request data
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        validate_key(&self.key)
    }
}

/// Request body for PUT /lifetime
#[derive(Debug, Clone, Deserialize)]
pub struct LifetimeRequest {
    /// New default lifetime in seconds; negative values become 0
    pub seconds: i64,
}

/// Request body for POST /namespace/push
#[derive(Debug, Clone, Deserialize)]
pub struct PushRequest {
    /// Segment appended to the hierarchy base
    pub segment: String,
}

/// Checks a key supplied by a client.
pub fn validate_key(key: &str) -> Option<String> {
    if key.is_empty() {
        return Some("Key cannot be empty".to_string());
    }
    if key.len() > MAX_KEY_LENGTH {
        return Some(format!(
            "Key exceeds maximum length of {} characters",
            MAX_KEY_LENGTH
        ));
    }
    None
}
