//! Simple Cache - A persistent TTL cache server backed by SQLite
//!
//! Stores JSON values in a SQL table with per-row expiration, and layers a
//! path-like key namespace on top.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod storage;
pub mod tasks;

pub use api::AppState;
pub use cache::{HierarchicalCache, SimpleCache, TtlCache};
pub use config::Config;
pub use error::{CacheError, Result};
pub use storage::{SqliteStorage, Storage};
pub use tasks::spawn_purge_task;
