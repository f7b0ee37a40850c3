//! Candidate Entry Module
//!
//! Defines one cached candidate list with its TTL and access metadata.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::geo::CacheKey;
use crate::upstream::NgoRef;

/// Shared, immutable candidate list handed out on every hit
pub type Candidates = Arc<[NgoRef]>;

/// Fixed bookkeeping cost charged per entry (map slot, LRU node, timestamps)
pub const ENTRY_OVERHEAD_BYTES: usize = 160;

/// Fixed cost charged per candidate on top of its string payload
pub const CANDIDATE_OVERHEAD_BYTES: usize = 64;

// == Candidate Entry ==
/// A cached list of nearby NGOs for one grid cell.
#[derive(Debug, Clone)]
pub struct CandidateEntry {
    pub key: CacheKey,
    /// Resolver order, nearest first
    pub candidates: Candidates,
    /// Creation timestamp (Unix milliseconds)
    pub created_at: u64,
    /// Expiration timestamp (Unix milliseconds), always after `created_at`
    pub expires_at: u64,
    /// Last successful read or write (Unix milliseconds)
    pub last_accessed_at: u64,
}

impl CandidateEntry {
    // == Constructor ==
    /// Creates an entry created at `now` that lives for `ttl`.
    ///
    /// A zero TTL is bumped to one millisecond to keep `expires_at > created_at`.
    pub fn new(key: CacheKey, candidates: Candidates, ttl: Duration, now: u64) -> Self {
        let ttl_ms = (ttl.as_millis() as u64).max(1);
        Self {
            key,
            candidates,
            created_at: now,
            expires_at: now.saturating_add(ttl_ms),
            last_accessed_at: now,
        }
    }

    // == Is Expired ==
    /// An entry is visible only while `now < expires_at`.
    pub fn is_expired_at(&self, now: u64) -> bool {
        now >= self.expires_at
    }

    /// Remaining lifetime in milliseconds, zero once expired.
    #[cfg(test)]
    fn ttl_remaining_ms(&self, now: u64) -> u64 {
        self.expires_at.saturating_sub(now)
    }

    /// Approximate heap footprint; see [`estimate_size`].
    pub fn estimated_size(&self) -> usize {
        estimate_size(&self.key, &self.candidates)
    }
}

// == Size Estimate ==
/// Estimated bytes held by an entry for `key` with `candidates`.
///
/// This is an accounting estimate, not an allocator measurement: a fixed
/// overhead per entry and per candidate plus the length of every string.
pub fn estimate_size(key: &CacheKey, candidates: &[NgoRef]) -> usize {
    let payload: usize = candidates
        .iter()
        .map(|ngo| CANDIDATE_OVERHEAD_BYTES + ngo.id.len() + ngo.name.len())
        .sum();
    ENTRY_OVERHEAD_BYTES + key.len() + payload
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    fn ngo(id: &str) -> NgoRef {
        NgoRef {
            id: id.to_string(),
            name: format!("NGO {}", id),
            lat: 12.9,
            lon: 77.6,
            distance_km: 1.0,
        }
    }

    #[test]
    fn test_entry_window() {
        let entry = CandidateEntry::new(
            CacheKey::from("1:1"),
            Arc::from(vec![ngo("a")]),
            Duration::from_secs(10),
            1_000,
        );

        assert_eq!(entry.created_at, 1_000);
        assert_eq!(entry.expires_at, 11_000);
        assert_eq!(entry.last_accessed_at, 1_000);
        assert!(!entry.is_expired_at(10_999));
        assert!(entry.is_expired_at(11_000));
        assert_eq!(entry.ttl_remaining_ms(6_000), 5_000);
        assert_eq!(entry.ttl_remaining_ms(20_000), 0);
    }

    #[test]
    fn test_zero_ttl_still_orders_timestamps() {
        let entry = CandidateEntry::new(CacheKey::from("1:1"), Arc::from(vec![]), Duration::ZERO, 500);
        assert!(entry.expires_at > entry.created_at);
    }

    #[test]
    fn test_size_grows_with_candidates() {
        let key = CacheKey::from("1297:7759");
        let empty = estimate_size(&key, &[]);
        let one = estimate_size(&key, &[ngo("a")]);
        let two = estimate_size(&key, &[ngo("a"), ngo("b")]);

        assert_eq!(empty, ENTRY_OVERHEAD_BYTES + key.len());
        assert!(one > empty);
        assert_eq!(two - one, one - empty);
    }
}
