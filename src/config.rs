//! Configuration Module
//!
//! Handles loading and managing server configuration from environment variables.

use std::env;
use std::str::FromStr;

use serde::Deserialize;

use crate::cache::{
    FreshnessPolicy, PurgePolicy, DEFAULT_DELIMITER, DEFAULT_KEY_COLUMN, DEFAULT_LIFETIME,
    DEFAULT_PAYLOAD_COLUMN, DEFAULT_PLACEHOLDER, DEFAULT_TABLE_NAME,
};

/// Database path that selects a private in-memory database.
pub const IN_MEMORY_DB: &str = ":memory:";

/// Options recognized by the cache engine and its key namespace.
///
/// Field names follow the camelCase option names when deserialized, e.g.
/// `{"table": "cache", "defaultLifetimeSeconds": 60, "delimiter": "/"}`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CacheOptions {
    /// Storage table name
    pub table: String,
    /// Name of the key column
    pub key_column: String,
    /// Name of the payload column
    pub payload_column: String,
    /// TTL applied when a write has no override (0 = immortal)
    pub default_lifetime_seconds: i64,
    /// Starting hierarchy base; defaults to the delimiter
    pub base: Option<String>,
    /// Separator between hierarchy segments
    pub delimiter: String,
    /// Replacement for delimiters inside a segment
    pub placeholder: String,
    /// Freshness rule for rows without a stored expiration
    pub freshness: FreshnessPolicy,
    /// Which rows a purge removes
    pub purge: PurgePolicy,
    /// Purge expired rows as soon as the engine is built
    pub purge_on_start: bool,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            table: DEFAULT_TABLE_NAME.to_string(),
            key_column: DEFAULT_KEY_COLUMN.to_string(),
            payload_column: DEFAULT_PAYLOAD_COLUMN.to_string(),
            default_lifetime_seconds: DEFAULT_LIFETIME as i64,
            base: None,
            delimiter: DEFAULT_DELIMITER.to_string(),
            placeholder: DEFAULT_PLACEHOLDER.to_string(),
            freshness: FreshnessPolicy::default(),
            purge: PurgePolicy::default(),
            purge_on_start: false,
        }
    }
}

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// SQLite database file, or `:memory:`
    pub db_path: String,
    /// HTTP server port
    pub server_port: u16,
    /// Background purge interval in seconds, 0 disables the task
    pub purge_interval: u64,
    /// Cache engine and namespace options
    pub cache: CacheOptions,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_DB_PATH` - SQLite database path (default: simple_cache.db)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `PURGE_INTERVAL` - Purge frequency in seconds (default: 60)
    /// - `CACHE_TABLE` / `CACHE_KEY_COLUMN` / `CACHE_PAYLOAD_COLUMN` - identifiers
    /// - `DEFAULT_LIFETIME` - Default TTL in seconds (default: 3600)
    /// - `HIERARCHY_BASE` / `HIERARCHY_DELIMITER` / `HIERARCHY_PLACEHOLDER`
    /// - `PURGE_ON_START` - Purge once at startup (default: false)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let cache_defaults = defaults.cache;

        Self {
            db_path: env::var("CACHE_DB_PATH").unwrap_or(defaults.db_path),
            server_port: parse_env("SERVER_PORT").unwrap_or(defaults.server_port),
            purge_interval: parse_env("PURGE_INTERVAL").unwrap_or(defaults.purge_interval),
            cache: CacheOptions {
                table: env::var("CACHE_TABLE").unwrap_or(cache_defaults.table),
                key_column: env::var("CACHE_KEY_COLUMN").unwrap_or(cache_defaults.key_column),
                payload_column: env::var("CACHE_PAYLOAD_COLUMN")
                    .unwrap_or(cache_defaults.payload_column),
                default_lifetime_seconds: parse_env("DEFAULT_LIFETIME")
                    .unwrap_or(cache_defaults.default_lifetime_seconds),
                base: env::var("HIERARCHY_BASE").ok().or(cache_defaults.base),
                delimiter: env::var("HIERARCHY_DELIMITER").unwrap_or(cache_defaults.delimiter),
                placeholder: env::var("HIERARCHY_PLACEHOLDER")
                    .unwrap_or(cache_defaults.placeholder),
                purge_on_start: parse_env("PURGE_ON_START")
                    .unwrap_or(cache_defaults.purge_on_start),
                ..cache_defaults
            },
        }
    }

    /// Returns true if the database lives only in memory.
    pub fn is_in_memory(&self) -> bool {
        self.db_path == IN_MEMORY_DB
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: "simple_cache.db".to_string(),
            server_port: 3000,
            purge_interval: 60,
            cache: CacheOptions::default(),
        }
    }
}

fn parse_env<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.db_path, "simple_cache.db");
        assert_eq!(config.server_port, 3000);
        assert_eq!(config.purge_interval, 60);
        assert!(!config.is_in_memory());
        assert_eq!(config.cache.table, "cache");
        assert_eq!(config.cache.key_column, "key");
        assert_eq!(config.cache.payload_column, "cache");
        assert_eq!(config.cache.default_lifetime_seconds, 3600);
        assert_eq!(config.cache.delimiter, "/");
        assert_eq!(config.cache.placeholder, "_");
        assert!(config.cache.base.is_none());
    }

    #[test]
    fn test_config_from_env_defaults() {
        // Clear any existing env vars to test defaults
        for name in [
            "CACHE_DB_PATH",
            "SERVER_PORT",
            "PURGE_INTERVAL",
            "CACHE_TABLE",
            "CACHE_KEY_COLUMN",
            "CACHE_PAYLOAD_COLUMN",
            "DEFAULT_LIFETIME",
            "HIERARCHY_BASE",
            "HIERARCHY_DELIMITER",
            "HIERARCHY_PLACEHOLDER",
            "PURGE_ON_START",
        ] {
            env::remove_var(name);
        }

        let config = Config::from_env();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_cache_options_deserialize() {
        let json = r#"{
            "table": "foo",
            "keyColumn": "bar",
            "payloadColumn": "baz",
            "defaultLifetimeSeconds": 0,
            "base": "app",
            "delimiter": ".",
            "freshness": "storedExpiration",
            "purge": "includeDefaultLifetime",
            "purgeOnStart": true
        }"#;
        let options: CacheOptions = serde_json::from_str(json).unwrap();

        assert_eq!(options.table, "foo");
        assert_eq!(options.key_column, "bar");
        assert_eq!(options.payload_column, "baz");
        assert_eq!(options.default_lifetime_seconds, 0);
        assert_eq!(options.base.as_deref(), Some("app"));
        assert_eq!(options.delimiter, ".");
        assert_eq!(options.placeholder, "_");
        assert_eq!(options.freshness, FreshnessPolicy::StoredExpiration);
        assert_eq!(options.purge, PurgePolicy::IncludeDefaultLifetime);
        assert!(options.purge_on_start);
    }

    #[test]
    fn test_cache_options_empty_object() {
        let options: CacheOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(options, CacheOptions::default());
    }
}
