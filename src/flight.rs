//! Single-flight coordination
//!
//! Collapses concurrent work for the same key into one spawned task so an
//! expensive upstream call runs once no matter how many callers miss at once.

use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Weak};

use futures::future::{BoxFuture, FutureExt, Shared};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, error};

use crate::geo::CacheKey;

type Flight<T> = Shared<BoxFuture<'static, Option<T>>>;
type FlightMap<T> = Mutex<HashMap<CacheKey, Flight<T>>>;

/// The task running a flight panicked or was cancelled before finishing.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("in-flight resolution aborted")]
pub struct FlightAborted;

// == Single Flight ==
/// Registry of in-flight computations keyed by cache key.
///
/// Each flight runs on its own task, so it finishes, persists its result and
/// leaves the registry even if every caller awaiting it is dropped. The
/// outcome (success or failure) is never memoized here; persisting a result
/// is the job of the work future itself.
pub struct SingleFlight<T> {
    inflight: Arc<FlightMap<T>>,
}

impl<T> Clone for SingleFlight<T> {
    fn clone(&self) -> Self {
        Self {
            inflight: Arc::clone(&self.inflight),
        }
    }
}

impl<T> Default for SingleFlight<T> {
    fn default() -> Self {
        Self {
            inflight: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

impl<T> SingleFlight<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    // == Run ==
    /// Joins the flight for `key`, or starts one.
    ///
    /// With no flight in progress, `recheck` runs under the registry lock;
    /// if it yields a value (for example the result a flight that just
    /// finished stored in a cache) that value is returned and no work
    /// starts. Otherwise `work` is spawned and becomes the flight every
    /// concurrent caller for `key` awaits.
    pub async fn run<R, RFut, W, WFut>(
        &self,
        key: &CacheKey,
        recheck: R,
        work: W,
    ) -> Result<T, FlightAborted>
    where
        R: FnOnce() -> RFut,
        RFut: Future<Output = Option<T>>,
        W: FnOnce() -> WFut,
        WFut: Future<Output = T> + Send + 'static,
    {
        let flight = {
            let mut inflight = self.inflight.lock().await;
            if let Some(existing) = inflight.get(key) {
                debug!(key = %key, "joining in-flight resolution");
                existing.clone()
            } else {
                if let Some(value) = recheck().await {
                    return Ok(value);
                }
                let flight = Self::launch(Arc::downgrade(&self.inflight), key.clone(), work());
                inflight.insert(key.clone(), flight.clone());
                flight
            }
        };

        flight.await.ok_or(FlightAborted)
    }

    /// Number of keys with a resolution currently in progress.
    #[cfg(test)]
    pub(crate) async fn in_flight(&self) -> usize {
        self.inflight.lock().await.len()
    }

    /// Spawns `work`. Called with the registry locked, so the task cannot
    /// deregister `key` before it has been inserted.
    fn launch<F>(registry: Weak<FlightMap<T>>, key: CacheKey, work: F) -> Flight<T>
    where
        F: Future<Output = T> + Send + 'static,
    {
        let task_key = key.clone();
        let handle = tokio::spawn(async move {
            let value = AssertUnwindSafe(work).catch_unwind().await.ok();
            if let Some(registry) = registry.upgrade() {
                registry.lock().await.remove(&task_key);
            }
            value
        });

        async move {
            match handle.await {
                Ok(Some(value)) => Some(value),
                Ok(None) => {
                    error!(key = %key, "flight work panicked");
                    None
                }
                Err(e) => {
                    error!(key = %key, error = %e, "flight task aborted");
                    None
                }
            }
        }
        .boxed()
        .shared()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_concurrent_callers_share_one_run() {
        let flights: SingleFlight<u32> = SingleFlight::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let key = CacheKey::from("1:1");

        let mut handles = Vec::new();
        for _ in 0..16 {
            let flights = flights.clone();
            let calls = Arc::clone(&calls);
            let key = key.clone();
            handles.push(tokio::spawn(async move {
                flights
                    .run(&key, || async { None }, move || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        42
                    })
                    .await
            }));
        }

        for handle in handles {
            assert_eq!(handle.await.unwrap(), Ok(42));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(flights.in_flight().await, 0);
    }

    #[tokio::test]
    async fn test_recheck_short_circuits() {
        let flights: SingleFlight<u32> = SingleFlight::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let value = flights
            .run(&CacheKey::from("1:1"), || async { Some(7) }, move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                0
            })
            .await;
        assert_eq!(value, Ok(7));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_completed_flight_is_not_memoized() {
        let flights: SingleFlight<Result<u32, String>> = SingleFlight::new();
        let key = CacheKey::from("1:1");

        let first = flights
            .run(&key, || async { None }, || async { Err("down".to_string()) })
            .await;
        let second = flights
            .run(&key, || async { None }, || async { Ok(5) })
            .await;

        assert_eq!(first, Ok(Err("down".to_string())));
        assert_eq!(second, Ok(Ok(5)));
    }

    #[tokio::test]
    async fn test_distinct_keys_run_independently() {
        let flights: SingleFlight<u32> = SingleFlight::new();
        let calls = Arc::new(AtomicUsize::new(0));

        for k in ["1:1", "2:2", "3:3"] {
            let calls = Arc::clone(&calls);
            flights
                .run(&CacheKey::from(k), || async { None }, move || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    1
                })
                .await
                .unwrap();
        }
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_work_finishes_after_caller_is_dropped() {
        let flights: SingleFlight<u32> = SingleFlight::new();
        let finished = Arc::new(AtomicUsize::new(0));
        let key = CacheKey::from("1:1");

        let counter = Arc::clone(&finished);
        let abandoned = tokio::time::timeout(
            Duration::from_millis(10),
            flights.run(&key, || async { None }, move || async move {
                tokio::time::sleep(Duration::from_millis(100)).await;
                counter.fetch_add(1, Ordering::SeqCst);
                1
            }),
        )
        .await;
        assert!(abandoned.is_err());

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(finished.load(Ordering::SeqCst), 1);
        assert_eq!(flights.in_flight().await, 0);
    }

    #[tokio::test]
    async fn test_panicking_work_is_reported_and_deregistered() {
        let flights: SingleFlight<u32> = SingleFlight::new();
        let key = CacheKey::from("1:1");

        let fail = true;
        let outcome = flights
            .run(&key, || async { None }, move || async move {
                if fail {
                    panic!("work blew up");
                }
                0
            })
            .await;

        assert_eq!(outcome, Err(FlightAborted));
        assert_eq!(flights.in_flight().await, 0);
        let retry = flights.run(&key, || async { None }, || async { 3 }).await;
        assert_eq!(retry, Ok(3));
    }
}
