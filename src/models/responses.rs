//! Response DTOs for the cache service API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;

use crate::admin::{CacheStatus, WarmReport};
use crate::cache::{current_timestamp_ms, CacheStats};
use crate::matching::MatchRecord;

/// Response body for GET/PUT /cache/status
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub enabled: bool,
    pub cache_size: usize,
    /// Unix milliseconds
    pub timestamp: u64,
}

impl From<CacheStatus> for StatusResponse {
    fn from(status: CacheStatus) -> Self {
        Self {
            enabled: status.enabled,
            cache_size: status.size,
            timestamp: current_timestamp_ms(),
        }
    }
}

/// Response body for GET /cache/stats
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub cache_enabled: bool,
    pub cache_size: usize,
    /// Distinct NGOs across live entries
    pub total_ngos: usize,
    /// Estimated bytes, not an allocator measurement
    pub memory_usage: usize,
    pub max_memory: usize,
    pub timestamp: u64,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub hit_rate: f64,
}

impl From<CacheStats> for StatsResponse {
    fn from(stats: CacheStats) -> Self {
        Self {
            cache_enabled: stats.enabled,
            cache_size: stats.size,
            total_ngos: stats.total_known_ngos,
            memory_usage: stats.memory_usage_bytes,
            max_memory: stats.memory_budget_bytes,
            timestamp: stats.as_of,
            hits: stats.counters.hits,
            misses: stats.counters.misses,
            evictions: stats.counters.evictions,
            hit_rate: stats.counters.hit_rate(),
        }
    }
}

/// Response body for POST /cache/warm
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WarmResponse {
    pub message: String,
    pub locations_warmed: usize,
    pub locations_requested: usize,
}

impl From<WarmReport> for WarmResponse {
    fn from(report: WarmReport) -> Self {
        Self {
            message: format!(
                "Cache warmed with {} of {} locations",
                report.warmed, report.requested
            ),
            locations_warmed: report.warmed,
            locations_requested: report.requested,
        }
    }
}

/// Response body for the clear endpoints
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearResponse {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub timestamp: u64,
}

impl ClearResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            location: None,
            timestamp: current_timestamp_ms(),
        }
    }

    pub fn for_location(message: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            location: Some(location.into()),
            ..Self::new(message)
        }
    }
}

/// Response body for POST /donations
#[derive(Debug, Clone, Serialize)]
pub struct MatchResponse {
    pub matched: bool,
    #[serde(rename = "match", skip_serializing_if = "Option::is_none")]
    pub record: Option<MatchRecord>,
}

impl From<Option<MatchRecord>> for MatchResponse {
    fn from(record: Option<MatchRecord>) -> Self {
        Self {
            matched: record.is_some(),
            record,
        }
    }
}

/// Response body for GET /geocode
#[derive(Debug, Clone, Serialize)]
pub struct GeocodeResponse {
    pub lat: f64,
    pub lon: f64,
    pub location: String,
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}
