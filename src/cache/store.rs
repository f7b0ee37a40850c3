//! Candidate Store Module
//!
//! Single-threaded cache engine: HashMap storage, LRU ranking, TTL checks and
//! estimate-based memory accounting. Concurrency is layered on top by
//! [`CandidateCache`](super::CandidateCache).

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use tracing::debug;

use crate::cache::entry::{current_timestamp_ms, estimate_size};
use crate::cache::{CacheCounters, CacheStats, CandidateEntry, Candidates, LruTracker};
use crate::error::{CacheError, Result};
use crate::geo::CacheKey;

// == Candidate Store ==
/// Candidate lists keyed by grid cell, bounded by a soft memory budget.
#[derive(Debug)]
pub struct CandidateStore {
    entries: HashMap<CacheKey, CandidateEntry>,
    lru: LruTracker,
    counters: CacheCounters,
    /// Sum of `estimated_size()` over all stored entries
    memory_usage: usize,
    memory_budget: usize,
}

impl CandidateStore {
    // == Constructor ==
    /// Creates an empty store that keeps its estimated footprint within `memory_budget` bytes.
    pub fn new(memory_budget: usize) -> Self {
        Self {
            entries: HashMap::new(),
            lru: LruTracker::new(),
            counters: CacheCounters::new(),
            memory_usage: 0,
            memory_budget,
        }
    }

    // == Get ==
    /// Returns the live candidates for `key`, refreshing its access time.
    ///
    /// Expired entries are removed on the spot and reported as a miss.
    pub fn get(&mut self, key: &CacheKey) -> Option<Candidates> {
        self.get_at(key, current_timestamp_ms())
    }

    pub fn get_at(&mut self, key: &CacheKey, now: u64) -> Option<Candidates> {
        let found = self.lookup_at(key, now);
        if found.is_none() {
            self.counters.record_miss();
        }
        found
    }

    /// Same as [`get`](Self::get) but a miss is not counted, for re-reads
    /// of a key whose miss was already recorded.
    pub fn probe(&mut self, key: &CacheKey) -> Option<Candidates> {
        self.lookup_at(key, current_timestamp_ms())
    }

    fn lookup_at(&mut self, key: &CacheKey, now: u64) -> Option<Candidates> {
        if self.entries.get(key)?.is_expired_at(now) {
            self.remove_entry(key);
            self.counters.record_expirations(1);
            return None;
        }

        let entry = self.entries.get_mut(key)?;
        entry.last_accessed_at = now;
        let candidates = entry.candidates.clone();
        let created_at = entry.created_at;
        self.lru.touch(key, now, created_at);
        self.counters.record_hit();
        Some(candidates)
    }

    // == Put ==
    /// Inserts or replaces the entry for `key`, evicting as needed.
    ///
    /// Returns the number of live entries evicted to make room. A write whose
    /// own estimate exceeds the budget is rejected and the store is unchanged.
    pub fn put(&mut self, key: CacheKey, candidates: Candidates, ttl: Duration) -> Result<usize> {
        self.put_at(key, candidates, ttl, current_timestamp_ms())
    }

    pub fn put_at(
        &mut self,
        key: CacheKey,
        candidates: Candidates,
        ttl: Duration,
        now: u64,
    ) -> Result<usize> {
        let size = estimate_size(&key, &candidates);
        if size > self.memory_budget {
            return Err(CacheError::EntryTooLarge {
                size,
                budget: self.memory_budget,
            });
        }

        // Overwrite: the old footprint no longer counts against the new write
        self.remove_entry(&key);

        if self.memory_usage + size > self.memory_budget {
            self.cleanup_expired_at(now);
        }

        let mut evicted = 0;
        while self.memory_usage + size > self.memory_budget {
            let Some(victim) = self.lru.evict_oldest() else {
                break;
            };
            if let Some(entry) = self.entries.remove(&victim) {
                self.memory_usage -= entry.estimated_size();
            }
            self.counters.record_eviction();
            evicted += 1;
            debug!(key = %victim, "evicted least recently accessed entry");
        }

        let entry = CandidateEntry::new(key.clone(), candidates, ttl, now);
        self.lru.touch(&key, now, now);
        self.entries.insert(key, entry);
        self.memory_usage += size;

        Ok(evicted)
    }

    // == Invalidate ==
    /// Removes one entry. Returns whether anything was removed.
    pub fn invalidate(&mut self, key: &CacheKey) -> bool {
        self.remove_entry(key).is_some()
    }

    // == Clear ==
    /// Removes every entry. Returns the number removed.
    pub fn clear(&mut self) -> usize {
        let removed = self.entries.len();
        self.entries.clear();
        self.lru.clear();
        self.memory_usage = 0;
        removed
    }

    // == Cleanup Expired ==
    /// Removes all expired entries. Returns the number removed.
    pub fn cleanup_expired(&mut self) -> usize {
        self.cleanup_expired_at(current_timestamp_ms())
    }

    pub fn cleanup_expired_at(&mut self, now: u64) -> usize {
        let expired_keys: Vec<CacheKey> = self
            .entries
            .values()
            .filter(|entry| entry.is_expired_at(now))
            .map(|entry| entry.key.clone())
            .collect();

        for key in &expired_keys {
            self.remove_entry(key);
        }

        self.counters.record_expirations(expired_keys.len());
        expired_keys.len()
    }

    // == Snapshot ==
    /// Builds a stats snapshot as of `now`.
    pub fn snapshot(&self, enabled: bool, now: u64) -> CacheStats {
        let mut ngo_ids = HashSet::new();
        let mut size = 0;
        for entry in self.entries.values().filter(|e| !e.is_expired_at(now)) {
            size += 1;
            ngo_ids.extend(entry.candidates.iter().map(|ngo| ngo.id.as_str()));
        }

        CacheStats {
            enabled,
            size,
            total_known_ngos: ngo_ids.len(),
            memory_usage_bytes: self.memory_usage,
            memory_budget_bytes: self.memory_budget,
            as_of: now,
            counters: self.counters,
        }
    }

    /// Number of entries still visible at `now`.
    pub fn live_len_at(&self, now: u64) -> usize {
        self.entries.values().filter(|e| !e.is_expired_at(now)).count()
    }

    /// Read-only view of an entry, expired or not.
    pub fn entry(&self, key: &CacheKey) -> Option<&CandidateEntry> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn memory_usage(&self) -> usize {
        self.memory_usage
    }

    pub fn memory_budget(&self) -> usize {
        self.memory_budget
    }

    fn remove_entry(&mut self, key: &CacheKey) -> Option<CandidateEntry> {
        let entry = self.entries.remove(key)?;
        self.lru.remove(key);
        self.memory_usage -= entry.estimated_size();
        Some(entry)
    }
}
