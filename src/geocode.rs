//! Geocode Memoizer
//!
//! Memoizes reverse-geocoding results per grid cell.
//!
//! Addresses are treated as immutable facts about a cell, so entries never
//! expire; they are dropped only by an explicit [`GeocodeMemoizer::clear`].
//! Failures are never memoized.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::cache::current_timestamp_ms;
use crate::error::ResolveError;
use crate::flight::SingleFlight;
use crate::geo::{CacheKey, Coordinates, LocationKeyEncoder};
use crate::upstream::ReverseGeocoder;

/// Returned when the upstream geocoder fails or times out
pub const UNKNOWN_LOCATION: &str = "Unknown Location";

type GeocodeOutcome = Result<Arc<str>, ResolveError>;

// == Geocode Entry ==
#[derive(Debug, Clone)]
pub struct GeocodeEntry {
    pub key: CacheKey,
    pub resolved_address: Arc<str>,
    /// Creation timestamp (Unix milliseconds)
    pub created_at: u64,
}

struct MemoInner {
    entries: RwLock<HashMap<CacheKey, GeocodeEntry>>,
    encoder: LocationKeyEncoder,
    geocoder: Arc<dyn ReverseGeocoder>,
    flights: SingleFlight<GeocodeOutcome>,
    upstream_timeout: Duration,
}

// == Geocode Memoizer ==
/// Shared handle; cloning is cheap.
#[derive(Clone)]
pub struct GeocodeMemoizer {
    inner: Arc<MemoInner>,
}

impl GeocodeMemoizer {
    pub fn new(
        encoder: LocationKeyEncoder,
        geocoder: Arc<dyn ReverseGeocoder>,
        upstream_timeout: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(MemoInner {
                entries: RwLock::new(HashMap::new()),
                encoder,
                geocoder,
                flights: SingleFlight::new(),
                upstream_timeout,
            }),
        }
    }

    // == Resolve ==
    /// Address of the cell containing (`lat`, `lon`).
    ///
    /// One upstream call per cell even under concurrent callers. Returns
    /// [`UNKNOWN_LOCATION`] on failure, and the next call retries.
    pub async fn resolve(&self, lat: f64, lon: f64) -> String {
        let key = self.inner.encoder.encode(lat, lon);
        if let Some(address) = self.cached(&key).await {
            return address.to_string();
        }

        let inner = Arc::clone(&self.inner);
        let work_key = key.clone();
        let location = Coordinates::new(lat, lon);
        let recheck_key = &key;
        let outcome = self
            .inner
            .flights
            .run(
                &key,
                move || async move { self.cached(recheck_key).await.map(Ok) },
                move || MemoInner::lookup(inner, work_key, location),
            )
            .await
            .unwrap_or_else(|aborted| Err(aborted.into()));

        match outcome {
            Ok(address) => address.to_string(),
            Err(e) => {
                warn!(key = %key, error = %e, "reverse geocoding failed");
                UNKNOWN_LOCATION.to_string()
            }
        }
    }

    /// Memoized entry for a cell, if any.
    pub async fn entry(&self, key: &CacheKey) -> Option<GeocodeEntry> {
        self.inner.entries.read().await.get(key).cloned()
    }

    /// Drops every memoized address. Returns the number removed.
    pub async fn clear(&self) -> usize {
        let mut entries = self.inner.entries.write().await;
        let removed = entries.len();
        entries.clear();
        removed
    }

    pub async fn len(&self) -> usize {
        self.inner.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.entries.read().await.is_empty()
    }

    async fn cached(&self, key: &CacheKey) -> Option<Arc<str>> {
        self.inner
            .entries
            .read()
            .await
            .get(key)
            .map(|entry| Arc::clone(&entry.resolved_address))
    }
}

impl MemoInner {
    async fn lookup(inner: Arc<Self>, key: CacheKey, location: Coordinates) -> GeocodeOutcome {
        let call = inner.geocoder.reverse_geocode(location);
        let address: Arc<str> = match tokio::time::timeout(inner.upstream_timeout, call).await {
            Ok(Ok(address)) => Arc::from(address),
            Ok(Err(e)) => return Err(ResolveError::Upstream(e.to_string())),
            Err(_) => return Err(ResolveError::Timeout(inner.upstream_timeout)),
        };

        debug!(key = %key, address = %address, "memoized address");
        let entry = GeocodeEntry {
            key: key.clone(),
            resolved_address: Arc::clone(&address),
            created_at: current_timestamp_ms(),
        };
        inner.entries.write().await.insert(key, entry);
        Ok(address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    struct StubGeocoder {
        calls: AtomicUsize,
        failing: AtomicBool,
        delay: Duration,
    }

    impl StubGeocoder {
        fn new(delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                failing: AtomicBool::new(false),
                delay,
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ReverseGeocoder for StubGeocoder {
        async fn reverse_geocode(&self, location: Coordinates) -> anyhow::Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            if self.failing.load(Ordering::SeqCst) {
                anyhow::bail!("geocoder unavailable");
            }
            Ok(format!("Cell {:.2}", location.lat))
        }
    }

    fn memoizer(geocoder: Arc<StubGeocoder>, timeout: Duration) -> GeocodeMemoizer {
        GeocodeMemoizer::new(LocationKeyEncoder::new(0.01).unwrap(), geocoder, timeout)
    }

    #[tokio::test]
    async fn test_memoizes_per_cell() {
        let geocoder = StubGeocoder::new(Duration::ZERO);
        let memo = memoizer(geocoder.clone(), Duration::from_secs(1));

        let first = memo.resolve(12.9716, 77.5946).await;
        let second = memo.resolve(12.9719, 77.5949).await;

        assert_eq!(first, "Cell 12.97");
        assert_eq!(first, second);
        assert_eq!(geocoder.calls(), 1);
        assert_eq!(memo.len().await, 1);
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_call() {
        let geocoder = StubGeocoder::new(Duration::from_millis(80));
        let memo = memoizer(geocoder.clone(), Duration::from_secs(1));

        let handles: Vec<_> = (0..10)
            .map(|_| {
                let memo = memo.clone();
                tokio::spawn(async move { memo.resolve(12.9716, 77.5946).await })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.await.unwrap(), "Cell 12.97");
        }
        assert_eq!(geocoder.calls(), 1);
    }

    #[tokio::test]
    async fn test_failure_returns_sentinel_and_retries() {
        let geocoder = StubGeocoder::new(Duration::ZERO);
        let memo = memoizer(geocoder.clone(), Duration::from_secs(1));

        geocoder.failing.store(true, Ordering::SeqCst);
        assert_eq!(memo.resolve(12.9716, 77.5946).await, UNKNOWN_LOCATION);
        assert!(memo.is_empty().await);

        geocoder.failing.store(false, Ordering::SeqCst);
        assert_eq!(memo.resolve(12.9716, 77.5946).await, "Cell 12.97");
        assert_eq!(geocoder.calls(), 2);
    }

    #[tokio::test]
    async fn test_timeout_returns_sentinel() {
        let geocoder = StubGeocoder::new(Duration::from_millis(200));
        let memo = memoizer(geocoder.clone(), Duration::from_millis(20));

        assert_eq!(memo.resolve(12.9716, 77.5946).await, UNKNOWN_LOCATION);
        assert!(memo.is_empty().await);
    }

    #[tokio::test]
    async fn test_clear_forces_new_lookup() {
        let geocoder = StubGeocoder::new(Duration::ZERO);
        let memo = memoizer(geocoder.clone(), Duration::from_secs(1));

        memo.resolve(12.9716, 77.5946).await;
        let key = LocationKeyEncoder::new(0.01).unwrap().encode(12.9716, 77.5946);
        assert!(memo.entry(&key).await.is_some());

        assert_eq!(memo.clear().await, 1);
        memo.resolve(12.9716, 77.5946).await;
        assert_eq!(geocoder.calls(), 2);
    }
}
