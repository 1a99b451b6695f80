//! Cache Module
//!
//! Bounded artifact cache with TTL expiry and least-recently-used eviction.

mod clock;
mod config;
mod entry;
mod eviction;
mod stats;
mod store;


// Re-export public types
pub use clock::{current_timestamp_ms, Clock, ManualClock, SystemClock};
pub use config::CacheConfig;
pub use entry::{CacheEntry, CacheEntryInfo};
pub(crate) use eviction::EvictionIndex;
pub use stats::{CacheCounters, CacheStats, HealthReport};
pub use store::{ArtifactCache, SetOutcome};
