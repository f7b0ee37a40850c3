//! Candidate Cache Service
//!
//! Thread-safe front of the [`CandidateStore`]: enable/disable switch,
//! timeout-bounded upstream resolution, and single-flight population.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::cache::entry::current_timestamp_ms;
use crate::cache::{CacheStats, Candidates, CandidateStore};
use crate::config::Config;
use crate::error::{CacheError, ConfigError, ResolveError, Result};
use crate::flight::SingleFlight;
use crate::geo::{CacheKey, Coordinates, LocationKeyEncoder};
use crate::upstream::CandidateResolver;

/// Outcome of one upstream resolution, shared by every caller of a flight
pub type ResolveOutcome = std::result::Result<Candidates, ResolveError>;

// == Cache Settings ==
/// Tunables for a [`CandidateCache`].
#[derive(Debug, Clone, Copy)]
pub struct CacheSettings {
    pub ttl: Duration,
    pub memory_budget: usize,
    pub upstream_timeout: Duration,
    pub enabled: bool,
}

impl From<&Config> for CacheSettings {
    fn from(config: &Config) -> Self {
        Self {
            ttl: config.candidate_ttl(),
            memory_budget: config.max_memory_bytes,
            upstream_timeout: config.upstream_timeout(),
            enabled: config.cache_enabled,
        }
    }
}

struct CacheInner {
    store: RwLock<CandidateStore>,
    enabled: AtomicBool,
    encoder: LocationKeyEncoder,
    resolver: Arc<dyn CandidateResolver>,
    flights: SingleFlight<ResolveOutcome>,
    ttl: Duration,
    upstream_timeout: Duration,
}

// == Candidate Cache ==
/// Shared handle to the candidate cache. Cloning is cheap.
#[derive(Clone)]
pub struct CandidateCache {
    inner: Arc<CacheInner>,
}

impl CandidateCache {
    // == Constructor ==
    pub fn new(
        encoder: LocationKeyEncoder,
        resolver: Arc<dyn CandidateResolver>,
        settings: CacheSettings,
    ) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                store: RwLock::new(CandidateStore::new(settings.memory_budget)),
                enabled: AtomicBool::new(settings.enabled),
                encoder,
                resolver,
                flights: SingleFlight::new(),
                ttl: settings.ttl,
                upstream_timeout: settings.upstream_timeout,
            }),
        }
    }

    /// Builds a cache from validated configuration.
    pub fn from_config(
        config: &Config,
        resolver: Arc<dyn CandidateResolver>,
    ) -> std::result::Result<Self, ConfigError> {
        config.validate()?;
        let encoder = LocationKeyEncoder::new(config.grid_resolution)?;
        Ok(Self::new(encoder, resolver, CacheSettings::from(config)))
    }

    pub fn encoder(&self) -> &LocationKeyEncoder {
        &self.inner.encoder
    }

    pub fn key_for(&self, location: Coordinates) -> CacheKey {
        self.inner.encoder.encode(location.lat, location.lon)
    }

    // == Enable / Disable ==
    pub fn is_enabled(&self) -> bool {
        self.inner.enabled.load(Ordering::Acquire)
    }

    /// Disabling keeps every entry; lookups miss and writes are dropped
    /// until the cache is enabled again.
    pub fn set_enabled(&self, enabled: bool) {
        let previous = self.inner.enabled.swap(enabled, Ordering::AcqRel);
        if previous != enabled {
            info!(enabled, "candidate cache toggled");
        }
    }

    // == Get ==
    /// Live candidates for `key`, or `None` when absent, expired or disabled.
    pub async fn get(&self, key: &CacheKey) -> Option<Candidates> {
        if !self.is_enabled() {
            return None;
        }
        self.inner.store.write().await.get(key)
    }

    // == Put ==
    /// Stores `candidates` for `ttl`. A no-op while disabled.
    pub async fn put(&self, key: CacheKey, candidates: Candidates, ttl: Duration) {
        self.inner.put(key, candidates, ttl).await;
    }

    pub async fn invalidate(&self, key: &CacheKey) -> bool {
        self.inner.store.write().await.invalidate(key)
    }

    // == Clear ==
    pub async fn clear(&self) -> usize {
        let removed = self.inner.store.write().await.clear();
        info!(removed, "candidate cache cleared");
        removed
    }

    /// Like [`clear`](Self::clear) but gives up if the store cannot be
    /// locked within `wait`.
    pub async fn clear_within(&self, wait: Duration) -> Result<usize> {
        let mut store = tokio::time::timeout(wait, self.inner.store.write())
            .await
            .map_err(|_| CacheError::LockTimeout(wait))?;
        let removed = store.clear();
        info!(removed, "candidate cache cleared");
        Ok(removed)
    }

    /// Drops every expired entry. Used by the background sweep.
    pub async fn purge_expired(&self) -> usize {
        self.inner.store.write().await.cleanup_expired()
    }

    // == Stats ==
    /// Snapshot taken under one read lock.
    pub async fn stats(&self) -> CacheStats {
        let store = self.inner.store.read().await;
        store.snapshot(self.is_enabled(), current_timestamp_ms())
    }

    /// Number of entries not yet expired.
    pub async fn live_len(&self) -> usize {
        self.inner
            .store
            .read()
            .await
            .live_len_at(current_timestamp_ms())
    }

    /// Number of stored entries, expired-but-unswept included.
    pub async fn len(&self) -> usize {
        self.inner.store.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.store.read().await.is_empty()
    }

    // == Get Or Resolve ==
    /// The organic lookup path: a hit, or a single-flight population.
    ///
    /// While disabled the resolver is called directly and nothing is cached.
    pub async fn get_or_resolve(&self, location: Coordinates) -> ResolveOutcome {
        if !self.is_enabled() {
            return self.resolve_direct(location).await;
        }

        let key = self.key_for(location);
        if let Some(hit) = self.get(&key).await {
            return Ok(hit);
        }

        let inner = Arc::clone(&self.inner);
        let work_key = key.clone();
        let probe_key = &key;
        self.inner
            .flights
            .run(
                &key,
                move || self.probe(probe_key),
                move || CacheInner::populate(inner, work_key, location),
            )
            .await
            .unwrap_or_else(|aborted| Err(aborted.into()))
    }

    /// One uncached, timeout-bounded resolver call.
    pub async fn resolve_direct(&self, location: Coordinates) -> ResolveOutcome {
        self.inner.call_upstream(location).await
    }

    // == Warm ==
    /// Resolves and stores every location concurrently, refreshing existing
    /// entries. Returns how many locations resolved successfully.
    pub async fn warm(&self, locations: &[Coordinates]) -> usize {
        if !self.is_enabled() {
            warn!(requested = locations.len(), "warm skipped: cache disabled");
            return 0;
        }

        let outcomes = join_all(locations.iter().map(|&location| self.refresh(location))).await;
        let warmed = outcomes.iter().filter(|outcome| outcome.is_ok()).count();
        info!(requested = locations.len(), warmed, "cache warm finished");
        warmed
    }

    async fn refresh(&self, location: Coordinates) -> ResolveOutcome {
        let key = self.key_for(location);
        let inner = Arc::clone(&self.inner);
        let work_key = key.clone();
        self.inner
            .flights
            .run(
                &key,
                || async { None },
                move || CacheInner::populate(inner, work_key, location),
            )
            .await
            .unwrap_or_else(|aborted| Err(aborted.into()))
    }

    /// Holds the store read lock, for exercising lock contention in tests.
    #[cfg(test)]
    pub(crate) async fn read_store(&self) -> tokio::sync::RwLockReadGuard<'_, CandidateStore> {
        self.inner.store.read().await
    }

    #[cfg(test)]
    pub(crate) async fn in_flight(&self) -> usize {
        self.inner.flights.in_flight().await
    }

    /// Recheck used under the flight lock; does not count a second miss.
    async fn probe(&self, key: &CacheKey) -> Option<ResolveOutcome> {
        if !self.is_enabled() {
            return None;
        }
        self.inner.store.write().await.probe(key).map(Ok)
    }
}

impl CacheInner {
    async fn call_upstream(&self, location: Coordinates) -> ResolveOutcome {
        let call = self.resolver.resolve_candidates(location);
        match tokio::time::timeout(self.upstream_timeout, call).await {
            Ok(Ok(list)) => Ok(Candidates::from(list)),
            Ok(Err(e)) => Err(ResolveError::Upstream(e.to_string())),
            Err(_) => Err(ResolveError::Timeout(self.upstream_timeout)),
        }
    }

    async fn put(&self, key: CacheKey, candidates: Candidates, ttl: Duration) {
        if !self.enabled.load(Ordering::Acquire) {
            return;
        }
        match self.store.write().await.put(key.clone(), candidates, ttl) {
            Ok(0) => {}
            Ok(evicted) => debug!(key = %key, evicted, "evicted entries to stay within budget"),
            Err(e) => warn!(key = %key, error = %e, "candidate list not cached"),
        }
    }

    async fn populate(inner: Arc<Self>, key: CacheKey, location: Coordinates) -> ResolveOutcome {
        let outcome = inner.call_upstream(location).await;
        match &outcome {
            Ok(candidates) => {
                inner.put(key, candidates.clone(), inner.ttl).await;
            }
            Err(e) => {
                warn!(key = %key, error = %e, "candidate resolution failed");
            }
        }
        outcome
    }
}
