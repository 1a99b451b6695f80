//! Cache Entry Module
//!
//! Defines the structure for individual cached artifacts with access metadata.

use serde::Serialize;

use crate::cache::eviction::EvictionRank;
use crate::models::{ExportFormat, ExportResult};

// == Cache Entry ==
/// One cached artifact plus the bookkeeping the cache needs for TTL and LRU.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// Request fingerprint
    pub key: String,
    /// The stored artifact
    pub result: ExportResult,
    /// Size in bytes, taken from `result.file_size`
    pub size: usize,
    /// Starts at 1 on insert, +1 on every hit
    pub access_count: u64,
    /// Last hit (Unix milliseconds)
    pub last_accessed: u64,
    /// Insert time (Unix milliseconds), never changes
    pub created_at: u64,
    /// Cache-wide touch counter, breaks ties between same-millisecond touches
    pub(crate) sequence: u64,
}

impl CacheEntry {
    // == Constructor ==
    pub fn new(key: String, result: ExportResult, now_ms: u64, sequence: u64) -> Self {
        let size = result.file_size;
        Self {
            key,
            result,
            size,
            access_count: 1,
            last_accessed: now_ms,
            created_at: now_ms,
            sequence,
        }
    }

    // == Touch ==
    /// Records a hit.
    pub(crate) fn touch(&mut self, now_ms: u64, sequence: u64) {
        self.access_count += 1;
        self.last_accessed = self.last_accessed.max(now_ms);
        self.sequence = sequence;
    }

    // == Age ==
    /// Milliseconds since insertion.
    pub fn age_ms(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.created_at)
    }

    // == Is Expired ==
    /// An entry is expired once its age is strictly greater than the TTL.
    pub fn is_expired(&self, now_ms: u64, ttl_ms: u64) -> bool {
        self.age_ms(now_ms) > ttl_ms
    }

    /// Position of this entry in the eviction order.
    pub(crate) fn rank(&self) -> EvictionRank {
        EvictionRank::new(self.last_accessed, self.size, self.sequence)
    }

    /// Read-only snapshot for diagnostics.
    pub fn info(&self) -> CacheEntryInfo {
        CacheEntryInfo {
            key: self.key.clone(),
            size: self.size,
            access_count: self.access_count,
            last_accessed: self.last_accessed,
            created_at: self.created_at,
            format: self.result.format,
            file_name: self.result.file_name.clone(),
        }
    }
}

// == Cache Entry Info ==
/// Snapshot of an entry's metadata, without the artifact bytes.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntryInfo {
    pub key: String,
    pub size: usize,
    pub access_count: u64,
    pub last_accessed: u64,
    pub created_at: u64,
    pub format: ExportFormat,
    pub file_name: String,
}
