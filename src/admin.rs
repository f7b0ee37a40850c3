//! Cache Administration
//!
//! Control-plane operations over the candidate cache: status, stats, warm,
//! clear, per-location invalidation and the enable switch.

use std::time::Duration;

use tracing::{info, warn};

use crate::cache::{CacheStats, CandidateCache};
use crate::error::{CacheError, Result};
use crate::geo::{CacheKey, Coordinates};

/// Enabled flag plus current size, as shown on the status endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStatus {
    pub enabled: bool,
    pub size: usize,
}

/// Result of a warm request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WarmReport {
    pub requested: usize,
    pub warmed: usize,
}

// == Cache Administration ==
#[derive(Clone)]
pub struct CacheAdministration {
    cache: CandidateCache,
    lock_timeout: Duration,
    default_locations: Vec<Coordinates>,
}

impl CacheAdministration {
    pub fn new(
        cache: CandidateCache,
        lock_timeout: Duration,
        default_locations: Vec<Coordinates>,
    ) -> Self {
        Self {
            cache,
            lock_timeout,
            default_locations,
        }
    }

    pub fn cache(&self) -> &CandidateCache {
        &self.cache
    }

    pub async fn status(&self) -> CacheStatus {
        CacheStatus {
            enabled: self.cache.is_enabled(),
            size: self.cache.live_len().await,
        }
    }

    pub async fn set_enabled(&self, enabled: bool) -> CacheStatus {
        self.cache.set_enabled(enabled);
        self.status().await
    }

    pub async fn stats(&self) -> CacheStats {
        self.cache.stats().await
    }

    // == Warm ==
    /// Warms the given locations, or the configured common locations when
    /// none are given.
    pub async fn warm(&self, locations: Option<Vec<Coordinates>>) -> WarmReport {
        let locations = match locations {
            Some(list) if !list.is_empty() => list,
            _ => self.default_locations.clone(),
        };
        let warmed = self.cache.warm(&locations).await;
        WarmReport {
            requested: locations.len(),
            warmed,
        }
    }

    // == Clear ==
    /// Clears the cache, retrying once if the store stays locked past the
    /// deadline. A second failure is reported as an internal error.
    pub async fn clear(&self) -> Result<usize> {
        match self.cache.clear_within(self.lock_timeout).await {
            Ok(removed) => Ok(removed),
            Err(first) => {
                warn!(error = %first, "cache clear failed, retrying once");
                self.cache
                    .clear_within(self.lock_timeout)
                    .await
                    .map_err(|e| CacheError::Internal(format!("cache clear failed twice: {}", e)))
            }
        }
    }

    /// Drops the entry for the grid cell containing `location`.
    pub async fn invalidate_location(&self, location: Coordinates) -> (CacheKey, bool) {
        let key = self.cache.key_for(location);
        let removed = self.cache.invalidate(&key).await;
        info!(key = %key, removed, "location invalidated");
        (key, removed)
    }
}
