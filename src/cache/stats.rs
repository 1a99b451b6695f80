//! Cache Statistics Module
//!
//! Running lookup counters plus the derived snapshot and health report types.

use serde::Serialize;

// == Cache Counters ==
/// Running counters, incremented as operations happen.
#[derive(Debug, Clone, Default)]
pub struct CacheCounters {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub expirations: u64,
}

impl CacheCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_eviction(&mut self) {
        self.evictions += 1;
    }

    pub fn record_expirations(&mut self, count: usize) {
        self.expirations += count as u64;
    }

    // == Hit Rate ==
    /// Hits as a rounded percentage of all lookups, 0 before any lookup.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64 * 100.0).round()
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

// == Cache Stats ==
/// Point-in-time statistics. Entry figures are recomputed from the entry
/// set on every call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub total_entries: usize,
    pub total_size: usize,
    /// Percentage, 0-100
    pub hit_rate: f64,
    pub average_entry_size: f64,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub expirations: u64,
}

impl CacheStats {
    pub fn from_parts(total_entries: usize, total_size: usize, counters: &CacheCounters) -> Self {
        let average_entry_size = if total_entries == 0 {
            0.0
        } else {
            total_size as f64 / total_entries as f64
        };
        Self {
            total_entries,
            total_size,
            hit_rate: counters.hit_rate(),
            average_entry_size,
            hits: counters.hits,
            misses: counters.misses,
            evictions: counters.evictions,
            expirations: counters.expirations,
        }
    }
}

// == Health Report ==
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthReport {
    pub healthy: bool,
    pub issues: Vec<String>,
}

impl HealthReport {
    pub fn from_issues(issues: Vec<String>) -> Self {
        Self {
            healthy: issues.is_empty(),
            issues,
        }
    }
}
