//! API Handlers
//!
//! HTTP request handlers for each cache server endpoint.

use std::sync::Arc;
use tokio::sync::RwLock;

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;

use crate::cache::{HierarchicalCache, SimpleCache, TtlCache};
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::models::{
    validate_key, DeleteResponse, GetResponse, HealthResponse, LifetimeRequest, LifetimeResponse,
    MetaResponse, NamespaceResponse, PopResponse, PurgeResponse, PushRequest, SetRequest,
    SetResponse,
};
use crate::storage::{SqliteStorage, Storage};

/// Application state shared across all handlers.
///
/// Holds the key namespace (and the engine inside it) behind an
/// Arc<RwLock<>>. Every storage operation takes the write lock because the
/// engine lazily creates its table, and runs through [`AppState::with_cache`].
#[derive(Clone)]
pub struct AppState {
    /// Thread-safe cache with its key namespace
    pub cache: Arc<RwLock<HierarchicalCache>>,
}

impl AppState {
    /// Creates a new AppState around the given cache.
    pub fn new(cache: HierarchicalCache) -> Self {
        Self {
            cache: Arc::new(RwLock::new(cache)),
        }
    }

    /// Creates a new AppState from configuration.
    ///
    /// Opens the SQLite database named by the config and builds the engine
    /// and key namespace from its cache options.
    pub fn from_config(config: &Config) -> Result<Self> {
        let storage: Arc<dyn Storage> = if config.is_in_memory() {
            Arc::new(SqliteStorage::in_memory()?)
        } else {
            Arc::new(SqliteStorage::open(&config.db_path)?)
        };

        let engine = SimpleCache::from_options(storage, &config.cache)?;
        let cache = HierarchicalCache::from_options(engine, &config.cache)?;
        Ok(Self::new(cache))
    }

    /// Runs `op` against the cache on the blocking thread pool.
    ///
    /// The write lock is awaited here and moved into the blocking task, so
    /// SQLite I/O never runs on a runtime worker thread.
    pub async fn with_cache<T, F>(&self, op: F) -> Result<T>
    where
        F: FnOnce(&mut HierarchicalCache) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let mut cache = self.cache.clone().write_owned().await;
        tokio::task::spawn_blocking(move || op(&mut *cache))
            .await
            .map_err(|e| CacheError::TaskFailed(format!("cache task failed: {}", e)))?
    }
}

/// Handler for PUT /set
///
/// Stores a JSON value under a key in the current namespace, with an
/// optional TTL override.
pub async fn set_handler(
    State(state): State<AppState>,
    Json(req): Json<SetRequest>,
) -> Result<Json<SetResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let SetRequest { key, value, ttl } = req;
    let target = key.clone();
    state
        .with_cache(move |cache| cache.set(&target, &value, ttl))
        .await?;

    Ok(Json(SetResponse::new(key)))
}

/// Handler for GET /get/:key
///
/// Returns the fresh value for a key, or 404 when it is absent or stale.
pub async fn get_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<GetResponse>> {
    let target = key.clone();
    let value = state
        .with_cache(move |cache| cache.get::<serde_json::Value>(&target))
        .await?
        .ok_or_else(|| CacheError::NotFound(key.clone()))?;

    Ok(Json(GetResponse::new(key, value)))
}

/// Handler for DELETE /del/:key
///
/// Deleting an absent key still succeeds.
pub async fn delete_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<DeleteResponse>> {
    let target = key.clone();
    state.with_cache(move |cache| cache.delete(&target)).await?;

    Ok(Json(DeleteResponse::new(key)))
}

/// Handler for GET /meta/:key
///
/// Reports the stored timestamps of a row, stale or not.
pub async fn meta_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<MetaResponse>> {
    let target = key.clone();
    let (entry, fresh) = state
        .with_cache(move |cache| {
            let Some(entry) = cache.get_entry(&target)? else {
                return Ok(None);
            };
            let engine = cache.inner();
            let fresh = entry.is_fresh(
                Utc::now(),
                engine.default_lifetime(),
                engine.freshness_policy(),
            );
            Ok(Some((entry, fresh)))
        })
        .await?
        .ok_or_else(|| CacheError::NotFound(key.clone()))?;

    Ok(Json(MetaResponse::new(key, &entry, fresh)))
}

/// Handler for POST /purge
pub async fn purge_handler(State(state): State<AppState>) -> Result<Json<PurgeResponse>> {
    let removed = state.with_cache(|cache| cache.purge_expired()).await?;

    Ok(Json(PurgeResponse { removed }))
}

/// Handler for PUT /lifetime
///
/// Changes the default lifetime used by later writes. Negative values are
/// clamped to 0 (immortal).
pub async fn lifetime_handler(
    State(state): State<AppState>,
    Json(req): Json<LifetimeRequest>,
) -> Json<LifetimeResponse> {
    let mut cache = state.cache.write().await;
    cache.inner_mut().set_default_lifetime(req.seconds);

    Json(LifetimeResponse {
        default_lifetime: cache.inner().default_lifetime(),
    })
}

/// Handler for GET /namespace
pub async fn namespace_handler(State(state): State<AppState>) -> Json<NamespaceResponse> {
    let cache = state.cache.read().await;
    Json(namespace_of(&cache))
}

/// Handler for POST /namespace/push
pub async fn push_handler(
    State(state): State<AppState>,
    Json(req): Json<PushRequest>,
) -> Result<Json<NamespaceResponse>> {
    if let Some(error_msg) = validate_key(&req.segment) {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let mut cache = state.cache.write().await;
    cache.push(&req.segment);

    Ok(Json(namespace_of(&cache)))
}

/// Handler for POST /namespace/pop
///
/// `removed` is null when the base is already at the root.
pub async fn pop_handler(State(state): State<AppState>) -> Json<PopResponse> {
    let mut cache = state.cache.write().await;
    let removed = cache.pop();

    Json(PopResponse {
        removed,
        base: cache.base().to_string(),
    })
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

fn namespace_of(cache: &HierarchicalCache) -> NamespaceResponse {
    NamespaceResponse {
        base: cache.base().to_string(),
        delimiter: cache.delimiter().to_string(),
        placeholder: cache.placeholder().to_string(),
    }
}
