//! Cache Module
//!
//! Location-keyed NGO candidate caching with TTL expiration, memory-bounded
//! LRU eviction and single-flight population.

mod entry;
mod lru;
mod service;
mod stats;
mod store;


// Re-export public types
pub use entry::{current_timestamp_ms, estimate_size, CandidateEntry, Candidates};
pub use lru::LruTracker;
pub use service::{CacheSettings, CandidateCache, ResolveOutcome};
pub use stats::{CacheCounters, CacheStats};
pub use store::CandidateStore;
