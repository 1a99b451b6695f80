//! Eviction Index Module
//!
//! Orders cache keys for least-recently-used eviction with a size tiebreak.

use std::cmp::Reverse;
use std::collections::BTreeMap;

// == Eviction Rank ==
/// Sort key for eviction, smallest first:
/// oldest `last_accessed`, then larger size, then older touch sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct EvictionRank {
    last_accessed: u64,
    size: Reverse<usize>,
    sequence: u64,
}

impl EvictionRank {
    pub fn new(last_accessed: u64, size: usize, sequence: u64) -> Self {
        Self {
            last_accessed,
            size: Reverse(size),
            sequence,
        }
    }
}

// == Eviction Index ==
/// Keys ordered by eviction priority.
///
/// The sequence component is unique per cache, so every rank maps to
/// exactly one key.
#[derive(Debug, Default)]
pub struct EvictionIndex {
    order: BTreeMap<EvictionRank, String>,
}

impl EvictionIndex {
    // == Constructor ==
    pub fn new() -> Self {
        Self {
            order: BTreeMap::new(),
        }
    }

    // == Insert ==
    pub fn insert(&mut self, rank: EvictionRank, key: &str) {
        self.order.insert(rank, key.to_string());
    }

    // == Remove ==
    pub fn remove(&mut self, rank: &EvictionRank) {
        self.order.remove(rank);
    }

    // == Pop Oldest ==
    /// Returns and removes the next key to evict.
    pub fn pop_oldest(&mut self) -> Option<String> {
        self.order.pop_first().map(|(_, key)| key)
    }

    // == Peek Oldest ==
    #[cfg(test)]
    pub fn peek_oldest(&self) -> Option<&String> {
        self.order.first_key_value().map(|(_, key)| key)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn clear(&mut self) {
        self.order.clear();
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_oldest_access_evicts_first() {
        let mut index = EvictionIndex::new();
        index.insert(EvictionRank::new(300, 10, 3), "c");
        index.insert(EvictionRank::new(100, 10, 1), "a");
        index.insert(EvictionRank::new(200, 10, 2), "b");

        assert_eq!(index.pop_oldest(), Some("a".to_string()));
        assert_eq!(index.pop_oldest(), Some("b".to_string()));
        assert_eq!(index.pop_oldest(), Some("c".to_string()));
        assert_eq!(index.pop_oldest(), None);
        assert!(index.is_empty());
    }

    #[test]
    fn test_same_access_time_prefers_larger_entry() {
        let mut index = EvictionIndex::new();
        index.insert(EvictionRank::new(100, 10, 1), "small");
        index.insert(EvictionRank::new(100, 500, 2), "large");

        assert_eq!(index.peek_oldest(), Some(&"large".to_string()));
    }

    #[test]
    fn test_same_access_and_size_falls_back_to_sequence() {
        let mut index = EvictionIndex::new();
        index.insert(EvictionRank::new(100, 10, 2), "second");
        index.insert(EvictionRank::new(100, 10, 1), "first");

        assert_eq!(index.pop_oldest(), Some("first".to_string()));
    }

    #[test]
    fn test_remove_and_reinsert_moves_key() {
        let mut index = EvictionIndex::new();
        let a = EvictionRank::new(100, 10, 1);
        index.insert(a, "a");
        index.insert(EvictionRank::new(200, 10, 2), "b");

        // Touch "a": its rank moves past "b"
        index.remove(&a);
        index.insert(EvictionRank::new(300, 10, 3), "a");

        assert_eq!(index.len(), 2);
        assert_eq!(index.pop_oldest(), Some("b".to_string()));
    }

    #[test]
    fn test_clear() {
        let mut index = EvictionIndex::new();
        index.insert(EvictionRank::new(1, 1, 1), "a");
        index.clear();
        assert!(index.is_empty());
    }
}
