//! Artifact Cache Module
//!
//! Fingerprint-keyed artifact storage with byte/count bounds, TTL expiry and
//! least-recently-used eviction.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info};

use crate::cache::{
    CacheConfig, CacheCounters, CacheEntry, CacheEntryInfo, CacheStats, Clock, EvictionIndex,
    HealthReport, SystemClock,
};
use crate::error::CacheError;
use crate::models::ExportResult;

/// Outcome of a successful `set`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetOutcome {
    /// Entries removed to make room
    pub evicted: usize,
    /// Whether an entry with the same key was replaced
    pub replaced: bool,
}

// == Artifact Cache ==
/// Bounded, expiring store of rendered artifacts.
///
/// Every operation completes synchronously, so a caller holding the cache
/// lock never observes a half-applied eviction.
#[derive(Debug)]
pub struct ArtifactCache {
    /// Fingerprint -> artifact
    entries: HashMap<String, CacheEntry>,
    /// Eviction order
    eviction: EvictionIndex,
    /// Lookup and removal counters
    counters: CacheCounters,
    /// Running byte total, cross-checked by `is_healthy`
    total_size: usize,
    /// Monotonic touch counter
    next_sequence: u64,
    config: CacheConfig,
    clock: Arc<dyn Clock>,
}

impl ArtifactCache {
    // == Constructor ==
    /// Creates an empty cache on the wall clock.
    pub fn new(config: CacheConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Creates an empty cache reading time from `clock`.
    pub fn with_clock(config: CacheConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: HashMap::new(),
            eviction: EvictionIndex::new(),
            counters: CacheCounters::new(),
            total_size: 0,
            next_sequence: 0,
            config,
            clock,
        }
    }

    /// Lifecycle entry point; equivalent to [`ArtifactCache::new`].
    pub fn init(config: CacheConfig) -> Self {
        info!(
            max_size = config.max_size,
            max_entries = config.max_entries,
            ttl_ms = config.ttl_ms,
            "Artifact cache initialized"
        );
        Self::new(config)
    }

    /// Releases every entry and logs final statistics.
    pub fn dispose(mut self) {
        let stats = self.get_stats();
        let removed = self.clear();
        info!(
            removed,
            hits = stats.hits,
            misses = stats.misses,
            hit_rate = stats.hit_rate,
            "Artifact cache disposed"
        );
    }

    // == Get ==
    /// Looks up an artifact. A hit bumps `access_count` and `last_accessed`.
    ///
    /// Entries past their TTL that the sweep has not reached yet are dropped
    /// here and reported as misses.
    pub fn get(&mut self, key: &str) -> Option<&CacheEntry> {
        let now = self.clock.now_ms();

        let expired = self
            .entries
            .get(key)
            .is_some_and(|entry| entry.is_expired(now, self.config.ttl_ms));
        if expired {
            self.remove_entry(key);
            self.counters.record_expirations(1);
        }

        let sequence = self.bump_sequence();
        match self.entries.get_mut(key) {
            Some(entry) => {
                self.eviction.remove(&entry.rank());
                entry.touch(now, sequence);
                self.eviction.insert(entry.rank(), key);
                self.counters.record_hit();
                Some(&*entry)
            }
            None => {
                self.counters.record_miss();
                None
            }
        }
    }

    // == Set ==
    /// Stores an artifact, evicting least-recently-used entries until it fits.
    ///
    /// An artifact larger than the whole byte budget is rejected and the
    /// cache is left untouched.
    pub fn set(&mut self, key: String, result: ExportResult) -> Result<SetOutcome, CacheError> {
        if self.config.max_entries == 0 {
            return Err(CacheError::ZeroCapacity);
        }
        if result.file_size != result.blob.len() {
            return Err(CacheError::InconsistentSize {
                declared: result.file_size,
                actual: result.blob.len(),
            });
        }
        let size = result.file_size;
        if size > self.config.max_size {
            return Err(CacheError::TooLarge {
                size,
                max: self.config.max_size,
            });
        }

        let replaced = self.remove_entry(&key).is_some();

        let mut evicted = 0;
        while self.entries.len() + 1 > self.config.max_entries
            || self.total_size + size > self.config.max_size
        {
            let Some(victim) = self.eviction.pop_oldest() else {
                break;
            };
            if let Some(entry) = self.entries.remove(&victim) {
                self.total_size -= entry.size;
                self.counters.record_eviction();
                evicted += 1;
                debug!(key = %victim, size = entry.size, "Evicted artifact");
            }
        }

        let now = self.clock.now_ms();
        let sequence = self.bump_sequence();
        let entry = CacheEntry::new(key.clone(), result, now, sequence);
        self.eviction.insert(entry.rank(), &key);
        self.total_size += size;
        self.entries.insert(key, entry);

        Ok(SetOutcome { evicted, replaced })
    }

    // == Cleanup ==
    /// Removes every entry older than the TTL. Returns the number removed.
    pub fn cleanup(&mut self) -> usize {
        let now = self.clock.now_ms();
        let ttl = self.config.ttl_ms;
        let expired_keys: Vec<String> = self
            .entries
            .values()
            .filter(|entry| entry.is_expired(now, ttl))
            .map(|entry| entry.key.clone())
            .collect();

        for key in &expired_keys {
            self.remove_entry(key);
        }

        self.counters.record_expirations(expired_keys.len());
        expired_keys.len()
    }

    // == Clear ==
    /// Removes everything and resets counters. Returns the number removed.
    pub fn clear(&mut self) -> usize {
        let removed = self.entries.len();
        self.entries.clear();
        self.eviction.clear();
        self.total_size = 0;
        self.counters.reset();
        removed
    }

    // == Health ==
    /// Checks bounds, cleanup lag and size bookkeeping.
    pub fn is_healthy(&self) -> HealthReport {
        let now = self.clock.now_ms();
        let stats = self.get_stats();
        let mut issues = Vec::new();

        if stats.total_size > self.config.max_size {
            issues.push(format!(
                "Cache size {} bytes exceeds limit of {} bytes",
                stats.total_size, self.config.max_size
            ));
        }
        if stats.total_entries > self.config.max_entries {
            issues.push(format!(
                "Cache holds {} entries, limit is {}",
                stats.total_entries, self.config.max_entries
            ));
        }

        let lag_limit = self
            .config
            .ttl_ms
            .saturating_add(self.config.cleanup_interval_ms);
        let lagging = self
            .entries
            .values()
            .filter(|entry| entry.age_ms(now) > lag_limit)
            .count();
        if lagging > 0 {
            issues.push(format!(
                "{} entries outlived their TTL by more than one cleanup interval",
                lagging
            ));
        }

        if stats.total_entries > 0 && stats.average_entry_size == 0.0 {
            issues.push("Average entry size is zero for a non-empty cache".to_string());
        }
        if stats.total_size != self.total_size {
            issues.push(format!(
                "Size bookkeeping drift: tracked {} bytes, entries sum to {} bytes",
                self.total_size, stats.total_size
            ));
        }
        if self.eviction.len() != self.entries.len() {
            issues.push(format!(
                "Eviction index tracks {} keys for {} entries",
                self.eviction.len(),
                self.entries.len()
            ));
        }

        HealthReport::from_issues(issues)
    }

    // == Rankings ==
    /// Up to `n` entries by descending access count, most recent first on ties.
    pub fn get_most_accessed_entries(&self, n: usize) -> Vec<CacheEntryInfo> {
        let mut entries: Vec<&CacheEntry> = self.entries.values().collect();
        entries.sort_by(|a, b| {
            b.access_count
                .cmp(&a.access_count)
                .then(b.last_accessed.cmp(&a.last_accessed))
                .then(b.sequence.cmp(&a.sequence))
        });
        entries.into_iter().take(n).map(CacheEntry::info).collect()
    }

    /// Up to `n` entries by descending size, most recent first on ties.
    pub fn get_largest_entries(&self, n: usize) -> Vec<CacheEntryInfo> {
        let mut entries: Vec<&CacheEntry> = self.entries.values().collect();
        entries.sort_by(|a, b| {
            b.size
                .cmp(&a.size)
                .then(b.last_accessed.cmp(&a.last_accessed))
                .then(b.sequence.cmp(&a.sequence))
        });
        entries.into_iter().take(n).map(CacheEntry::info).collect()
    }

    // == Stats ==
    pub fn get_stats(&self) -> CacheStats {
        let total_size = self.entries.values().map(|entry| entry.size).sum();
        CacheStats::from_parts(self.entries.len(), total_size, &self.counters)
    }

    pub fn get_config(&self) -> CacheConfig {
        self.config
    }

    /// Non-mutating membership check; does not count as a lookup.
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn remove_entry(&mut self, key: &str) -> Option<CacheEntry> {
        let entry = self.entries.remove(key)?;
        self.eviction.remove(&entry.rank());
        self.total_size -= entry.size;
        Some(entry)
    }

    fn bump_sequence(&mut self) -> u64 {
        self.next_sequence += 1;
        self.next_sequence
    }
}
