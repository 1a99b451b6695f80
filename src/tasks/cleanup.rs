//! Artifact Cleanup Task
//!
//! Background task that periodically sweeps TTL-expired artifacts out of
//! the cache.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::ArtifactCache;

/// Spawns a background task that runs [`ArtifactCache::cleanup`] every
/// `cleanup_interval_ms`.
///
/// The write lock is held only for the sweep itself. The returned handle is
/// aborted during graceful shutdown.
///
/// # Example
/// ```ignore
/// let cache = Arc::new(RwLock::new(ArtifactCache::new(CacheConfig::default())));
/// let cleanup_handle = spawn_cleanup_task(cache.clone(), 300_000);
/// // Later, during shutdown:
/// cleanup_handle.abort();
/// ```
pub fn spawn_cleanup_task(
    cache: Arc<RwLock<ArtifactCache>>,
    cleanup_interval_ms: u64,
) -> JoinHandle<()> {
    let interval = Duration::from_millis(cleanup_interval_ms.max(1));

    tokio::spawn(async move {
        info!(interval_ms = cleanup_interval_ms, "Starting artifact cleanup task");

        loop {
            tokio::time::sleep(interval).await;

            let (removed, remaining) = {
                let mut cache_guard = cache.write().await;
                let removed = cache_guard.cleanup();
                (removed, cache_guard.len())
            };

            if removed > 0 {
                info!(removed, remaining, "Artifact cleanup removed expired entries");
            } else {
                debug!(remaining, "Artifact cleanup found no expired entries");
            }
        }
    })
}
