//! Response DTOs for the export server API
//!
//! Defines the structure of outgoing JSON response bodies. Artifact
//! downloads are raw bytes and do not go through these types.

use serde::Serialize;

use crate::cache::{CacheConfig, CacheEntryInfo, CacheStats, HealthReport};

/// Number of entries listed in the stats response rankings
pub const TOP_ENTRIES: usize = 5;

/// Response body for `get-cache-stats`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStatsPayload {
    pub stats: CacheStats,
    pub health: HealthReport,
    pub config: CacheConfig,
    pub most_accessed: Vec<CacheEntryInfo>,
    pub largest: Vec<CacheEntryInfo>,
}

/// Response body for the cache-management endpoint
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheOperationResponse {
    pub success: bool,
    pub operation: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub removed: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<CacheStatsPayload>,
}

impl CacheOperationResponse {
    pub fn stats(payload: CacheStatsPayload) -> Self {
        Self {
            success: true,
            operation: "get-cache-stats".to_string(),
            message: format!("{} cached artifacts", payload.stats.total_entries),
            removed: None,
            data: Some(payload),
        }
    }

    pub fn cleared(removed: usize) -> Self {
        Self {
            success: true,
            operation: "clear-cache".to_string(),
            message: "Cache cleared".to_string(),
            removed: Some(removed),
            data: None,
        }
    }

    pub fn cleaned(removed: usize) -> Self {
        Self {
            success: true,
            operation: "cleanup-cache".to_string(),
            message: format!("Removed {} expired entries", removed),
            removed: Some(removed),
            data: None,
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// "healthy" or "degraded"; a degraded cache never blocks exports
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
    pub cache: HealthReport,
}

impl HealthResponse {
    pub fn from_report(cache: HealthReport) -> Self {
        let status = if cache.healthy { "healthy" } else { "degraded" };
        Self {
            status: status.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            cache,
        }
    }
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error message describing what went wrong
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}
