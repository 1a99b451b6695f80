//! Configuration Module
//!
//! Handles loading and managing server configuration from environment variables.

use std::env;
use std::str::FromStr;

use crate::cache::CacheConfig;

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port
    pub server_port: u16,
    /// Maximum total artifact bytes held by the cache
    pub cache_max_size: usize,
    /// Maximum number of cached artifacts
    pub cache_max_entries: usize,
    /// Artifact time-to-live in milliseconds
    pub cache_ttl_ms: u64,
    /// Background cleanup interval in milliseconds
    pub cache_cleanup_interval_ms: u64,
    /// Timeout for fetching remote images
    pub asset_fetch_timeout_ms: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `CACHE_MAX_SIZE_BYTES` - Cache byte budget (default: 100 MiB)
    /// - `CACHE_MAX_ENTRIES` - Maximum cached artifacts (default: 100)
    /// - `CACHE_TTL_MS` - Artifact TTL (default: 1 hour)
    /// - `CACHE_CLEANUP_INTERVAL_MS` - Cleanup frequency (default: 5 minutes)
    /// - `ASSET_FETCH_TIMEOUT_MS` - Remote image fetch timeout (default: 10 seconds)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            server_port: env_or("SERVER_PORT", defaults.server_port),
            cache_max_size: env_or("CACHE_MAX_SIZE_BYTES", defaults.cache_max_size),
            cache_max_entries: env_or("CACHE_MAX_ENTRIES", defaults.cache_max_entries),
            cache_ttl_ms: env_or("CACHE_TTL_MS", defaults.cache_ttl_ms),
            cache_cleanup_interval_ms: env_or(
                "CACHE_CLEANUP_INTERVAL_MS",
                defaults.cache_cleanup_interval_ms,
            ),
            asset_fetch_timeout_ms: env_or(
                "ASSET_FETCH_TIMEOUT_MS",
                defaults.asset_fetch_timeout_ms,
            ),
        }
    }

    /// Cache settings, fixed for the lifetime of the cache.
    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig {
            max_size: self.cache_max_size,
            max_entries: self.cache_max_entries,
            ttl_ms: self.cache_ttl_ms,
            cleanup_interval_ms: self.cache_cleanup_interval_ms,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let cache = CacheConfig::default();
        Self {
            server_port: 3000,
            cache_max_size: cache.max_size,
            cache_max_entries: cache.max_entries,
            cache_ttl_ms: cache.ttl_ms,
            cache_cleanup_interval_ms: cache.cleanup_interval_ms,
            asset_fetch_timeout_ms: 10_000,
        }
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
