//! Cache Statistics Module
//!
//! Lifetime counters and the point-in-time snapshot reported to operators.

use serde::Serialize;

// == Cache Counters ==
/// Lifetime performance counters. Not reset by `clear`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheCounters {
    /// Lookups answered from the cache
    pub hits: u64,
    /// Lookups that found nothing live (absent, expired or disabled)
    pub misses: u64,
    /// Entries dropped to stay within the memory budget
    pub evictions: u64,
    /// Entries dropped because their TTL elapsed
    pub expirations: u64,
}

impl CacheCounters {
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Returns hits / (hits + misses), or 0.0 if no lookups have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
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
}

// == Cache Stats ==
/// Consistent snapshot of the candidate cache, taken under a single lock.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheStats {
    pub enabled: bool,
    /// Live (non-expired) entries
    pub size: usize,
    /// Distinct NGO ids across live entries
    pub total_known_ngos: usize,
    /// Estimated bytes held, expired-but-unswept entries included
    pub memory_usage_bytes: usize,
    pub memory_budget_bytes: usize,
    /// Snapshot time (Unix milliseconds)
    pub as_of: u64,
    pub counters: CacheCounters,
}
