//! LRU Tracker Module
//!
//! Orders keys for least-recently-accessed eviction.

use std::collections::{BTreeMap, HashMap};

use crate::geo::CacheKey;

// == Access Stamp ==
/// Eviction rank of a key. Smaller stamps are evicted first: older access,
/// then older creation, then earlier touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct AccessStamp {
    accessed_at: u64,
    created_at: u64,
    seq: u64,
}

// == LRU Tracker ==
/// Tracks access order for LRU eviction.
///
/// `order` is sorted oldest-first; `stamps` allows O(log n) re-ranking.
#[derive(Debug, Default)]
pub struct LruTracker {
    order: BTreeMap<AccessStamp, CacheKey>,
    stamps: HashMap<CacheKey, AccessStamp>,
    next_seq: u64,
}

impl LruTracker {
    // == Constructor ==
    /// Creates a new empty LRU tracker.
    pub fn new() -> Self {
        Self::default()
    }

    // == Touch ==
    /// Records an access to `key` at `accessed_at` for an entry created at `created_at`.
    pub fn touch(&mut self, key: &CacheKey, accessed_at: u64, created_at: u64) {
        self.remove(key);
        let stamp = AccessStamp {
            accessed_at,
            created_at,
            seq: self.next_seq,
        };
        self.next_seq += 1;
        self.order.insert(stamp, key.clone());
        self.stamps.insert(key.clone(), stamp);
    }

    // == Remove ==
    /// Removes a key from the tracker.
    pub fn remove(&mut self, key: &CacheKey) {
        if let Some(stamp) = self.stamps.remove(key) {
            self.order.remove(&stamp);
        }
    }

    // == Evict Oldest ==
    /// Returns and removes the least recently accessed key.
    pub fn evict_oldest(&mut self) -> Option<CacheKey> {
        let (_, key) = self.order.pop_first()?;
        self.stamps.remove(&key);
        Some(key)
    }

    #[cfg(test)]
    fn peek_oldest(&self) -> Option<&CacheKey> {
        self.order.values().next()
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.stamps.len()
    }

    #[cfg(test)]
    fn is_empty(&self) -> bool {
        self.stamps.is_empty()
    }

    #[cfg(test)]
    fn contains(&self, key: &CacheKey) -> bool {
        self.stamps.contains_key(key)
    }

    pub fn clear(&mut self) {
        self.order.clear();
        self.stamps.clear();
    }
}
