//! Expired Row Purge Task
//!
//! Background task that periodically deletes expired cache rows from storage.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::cache::TtlCache;

/// Spawns a background task that periodically purges expired cache rows.
///
/// The task sleeps for the given interval between runs and takes the write
/// lock on the cache for each purge, running the purge itself on the
/// blocking thread pool. Failures are logged and the task keeps
/// running; the next interval retries.
///
/// # Arguments
/// * `cache` - Shared cache (engine or key namespace)
/// * `purge_interval_secs` - Interval in seconds between purge runs
///
/// # Returns
/// A JoinHandle for the spawned task, which can be used to abort the task
/// during graceful shutdown.
///
/// # Example
/// ```ignore
/// let cache = Arc::new(RwLock::new(SimpleCache::new(storage)));
/// let purge_handle = spawn_purge_task(cache.clone(), 60);
/// // Later, during shutdown:
/// purge_handle.abort();
/// ```
pub fn spawn_purge_task<C>(cache: Arc<RwLock<C>>, purge_interval_secs: u64) -> JoinHandle<()>
where
    C: TtlCache + Send + Sync + 'static,
{
    let interval = Duration::from_secs(purge_interval_secs);

    tokio::spawn(async move {
        info!(
            "Starting purge task with interval of {} seconds",
            purge_interval_secs
        );

        loop {
            tokio::time::sleep(interval).await;

            // Storage I/O runs on the blocking pool with the owned guard
            let mut cache_guard = cache.clone().write_owned().await;
            let result =
                tokio::task::spawn_blocking(move || cache_guard.purge_expired()).await;

            match result {
                Ok(Ok(0)) => debug!("Purge: no expired entries found"),
                Ok(Ok(removed)) => info!("Purge: removed {} expired entries", removed),
                Ok(Err(e)) => error!("Purge failed: {}", e),
                Err(e) => error!("Purge task failed: {}", e),
            }
        }
    })
}
