//! Expiry Sweep Task
//!
//! Background task that periodically drops expired candidate entries so
//! memory is reclaimed even for cells nobody reads again.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::CandidateCache;

/// Spawns a background task that purges expired entries every
/// `sweep_interval_secs` seconds.
///
/// Returns the task handle so shutdown can abort it.
///
/// # Example
/// ```ignore
/// let sweep_handle = spawn_sweep_task(state.cache().clone(), 60);
/// // Later, during shutdown:
/// sweep_handle.abort();
/// ```
pub fn spawn_sweep_task(cache: CandidateCache, sweep_interval_secs: u64) -> JoinHandle<()> {
    let interval = Duration::from_secs(sweep_interval_secs);

    tokio::spawn(async move {
        info!(
            "Starting expiry sweep task with interval of {} seconds",
            sweep_interval_secs
        );

        loop {
            tokio::time::sleep(interval).await;

            let removed = cache.purge_expired().await;

            if removed > 0 {
                info!("Expiry sweep: removed {} expired entries", removed);
            } else {
                debug!("Expiry sweep: no expired entries found");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheSettings;
    use crate::geo::{Coordinates, LocationKeyEncoder};
    use crate::upstream::{CandidateResolver, NgoRef};
    use async_trait::async_trait;
    use std::sync::Arc;

    struct EmptyResolver;

    #[async_trait]
    impl CandidateResolver for EmptyResolver {
        async fn resolve_candidates(&self, _location: Coordinates) -> anyhow::Result<Vec<NgoRef>> {
            Ok(Vec::new())
        }
    }

    fn test_cache() -> CandidateCache {
        CandidateCache::new(
            LocationKeyEncoder::new(0.01).unwrap(),
            Arc::new(EmptyResolver),
            CacheSettings {
                ttl: Duration::from_secs(3600),
                memory_budget: 1 << 20,
                upstream_timeout: Duration::from_secs(1),
                enabled: true,
            },
        )
    }

    fn sample() -> crate::cache::Candidates {
        Arc::from(vec![NgoRef {
            id: "ngo001".to_string(),
            name: "Helping Hands".to_string(),
            lat: 12.933,
            lon: 77.610,
            distance_km: 0.4,
        }])
    }

    #[tokio::test]
    async fn test_sweep_task_removes_expired_entries() {
        let cache = test_cache();
        let key = cache.key_for(Coordinates::new(12.93, 77.61));
        cache.put(key, sample(), Duration::from_millis(200)).await;
        assert_eq!(cache.len().await, 1);

        let handle = spawn_sweep_task(cache.clone(), 1);

        tokio::time::sleep(Duration::from_millis(1500)).await;

        assert_eq!(cache.len().await, 0, "Expired entry should have been swept");
        handle.abort();
    }

    #[tokio::test]
    async fn test_sweep_task_preserves_live_entries() {
        let cache = test_cache();
        let key = cache.key_for(Coordinates::new(12.93, 77.61));
        cache.put(key.clone(), sample(), Duration::from_secs(3600)).await;

        let handle = spawn_sweep_task(cache.clone(), 1);

        tokio::time::sleep(Duration::from_millis(1500)).await;

        assert!(cache.get(&key).await.is_some(), "Live entry should not be removed");
        handle.abort();
    }

    #[tokio::test]
    async fn test_sweep_task_can_be_aborted() {
        let handle = spawn_sweep_task(test_cache(), 1);

        handle.abort();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(handle.is_finished(), "Task should be finished after abort");
    }
}
