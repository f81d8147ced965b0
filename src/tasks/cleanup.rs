//! TTL Cleanup Task
//!
//! Background task that periodically removes expired cache entries.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::{Codec, FileCache};

/// Spawns a background task that periodically cleans up expired cache entries.
///
/// The task runs in an infinite loop, sleeping for the specified interval
/// between cleanup runs. Each run takes the cache's write lock and touches the
/// filesystem, so it is executed on the blocking thread pool.
///
/// # Arguments
/// * `cache` - Shared reference to the cache
/// * `cleanup_interval_secs` - Interval in seconds between cleanup runs
///
/// # Returns
/// A JoinHandle for the spawned task, which can be used to abort the task
/// during graceful shutdown.
///
/// # Example
/// ```ignore
/// let cache = Arc::new(FileCache::open("./cache", CacheOptions::default())?);
/// let cleanup_handle = spawn_cleanup_task(cache.clone(), 60);
/// // Later, during shutdown:
/// cleanup_handle.abort();
/// ```
pub fn spawn_cleanup_task<C: Codec>(
    cache: Arc<FileCache<C>>,
    cleanup_interval_secs: u64,
) -> JoinHandle<()> {
    let interval = Duration::from_secs(cleanup_interval_secs);

    tokio::spawn(async move {
        info!(
            "Starting TTL cleanup task with interval of {} seconds",
            cleanup_interval_secs
        );

        loop {
            tokio::time::sleep(interval).await;

            let cache = Arc::clone(&cache);
            let outcome = tokio::task::spawn_blocking(move || cache.clean_expired()).await;

            match outcome {
                Ok(Ok(removed)) if removed > 0 => {
                    info!("TTL cleanup: removed {} expired entries", removed);
                }
                Ok(Ok(_)) => debug!("TTL cleanup: no expired entries found"),
                Ok(Err(e)) => warn!(error = %e, "TTL cleanup failed"),
                Err(e) => warn!(error = %e, "TTL cleanup task panicked"),
            }
        }
    })
}
