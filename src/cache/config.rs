//! Cache limits, fixed when the cache is constructed.

use serde::Serialize;

/// Bounds and timing for an [`ArtifactCache`](crate::cache::ArtifactCache).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheConfig {
    /// Maximum total artifact bytes
    pub max_size: usize,
    /// Maximum number of artifacts
    pub max_entries: usize,
    /// Age in milliseconds after which an artifact is stale
    pub ttl_ms: u64,
    /// How often the background sweep runs, in milliseconds
    pub cleanup_interval_ms: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_size: 100 * 1024 * 1024,
            max_entries: 100,
            ttl_ms: 60 * 60 * 1000,
            cleanup_interval_ms: 5 * 60 * 1000,
        }
    }
}
