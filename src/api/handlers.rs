//! API Handlers
//!
//! HTTP request handlers for the cache administration, donation intake and
//! geocoding endpoints.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Query, State},
    Json,
};
use tracing::info;

use crate::admin::CacheAdministration;
use crate::cache::CandidateCache;
use crate::config::Config;
use crate::error::{CacheError, ConfigError, Result};
use crate::geocode::GeocodeMemoizer;
use crate::matching::{DonationEvent, MatchingOrchestrator};
use crate::models::{
    ClearResponse, GeocodeResponse, HealthResponse, LocationQuery, MatchResponse, StatsResponse,
    StatusResponse, ToggleRequest, WarmRequest, WarmResponse,
};
use crate::upstream::{CandidateResolver, NgoDirectory, NominatimGeocoder, ReverseGeocoder};

/// Application state shared across all handlers.
///
/// Every component is a cheap-to-clone handle over shared state.
#[derive(Clone)]
pub struct AppState {
    pub admin: CacheAdministration,
    pub orchestrator: MatchingOrchestrator,
    pub geocoder: GeocodeMemoizer,
}

impl AppState {
    /// Wires the service around the given upstream collaborators.
    pub fn new(
        config: &Config,
        resolver: Arc<dyn CandidateResolver>,
        geocoder: Arc<dyn ReverseGeocoder>,
    ) -> std::result::Result<Self, ConfigError> {
        let cache = CandidateCache::from_config(config, resolver)?;
        let geocoder = GeocodeMemoizer::new(*cache.encoder(), geocoder, config.upstream_timeout());
        Ok(Self {
            admin: CacheAdministration::new(
                cache.clone(),
                config.admin_lock_timeout(),
                config.warm_locations.clone(),
            ),
            orchestrator: MatchingOrchestrator::new(cache),
            geocoder,
        })
    }

    /// Creates the state with the built-in NGO directory and Nominatim geocoder.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let geocoder = NominatimGeocoder::new(config.geocoder_url.clone())?;
        let state = Self::new(
            config,
            Arc::new(NgoDirectory::with_default_ngos(config.search_radius_km)),
            Arc::new(geocoder),
        )?;
        Ok(state)
    }

    pub fn cache(&self) -> &CandidateCache {
        self.admin.cache()
    }
}

/// Handler for GET /cache/status
pub async fn status_handler(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(state.admin.status().await.into())
}

/// Handler for PUT /cache/status
///
/// Enables or disables the cache without dropping its entries.
pub async fn toggle_handler(
    State(state): State<AppState>,
    Json(req): Json<ToggleRequest>,
) -> Json<StatusResponse> {
    Json(state.admin.set_enabled(req.enabled).await.into())
}

/// Handler for GET /cache/stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(state.admin.stats().await.into())
}

/// Handler for POST /cache/warm
///
/// An empty body warms the configured common locations.
pub async fn warm_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<WarmResponse>> {
    let req = if body.iter().all(u8::is_ascii_whitespace) {
        WarmRequest::default()
    } else {
        serde_json::from_slice::<WarmRequest>(&body)
            .map_err(|e| CacheError::InvalidRequest(format!("invalid warm request: {}", e)))?
    };

    let report = state.admin.warm(req.locations).await;
    Ok(Json(report.into()))
}

/// Handler for DELETE /cache/clear
pub async fn clear_handler(State(state): State<AppState>) -> Result<Json<ClearResponse>> {
    let removed = state.admin.clear().await?;
    info!(removed, "cache cleared via API");
    Ok(Json(ClearResponse::new("Cache cleared successfully")))
}

/// Handler for DELETE /cache/clear/location?lat=..&lon=..
pub async fn clear_location_handler(
    State(state): State<AppState>,
    Query(query): Query<LocationQuery>,
) -> Result<Json<ClearResponse>> {
    if let Some(error_msg) = query.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let (key, _) = state.admin.invalidate_location(query.coordinates()).await;
    Ok(Json(ClearResponse::for_location(
        "Location cache cleared",
        key.to_string(),
    )))
}

/// Handler for POST /donations
pub async fn donation_handler(
    State(state): State<AppState>,
    Json(donation): Json<DonationEvent>,
) -> Result<Json<MatchResponse>> {
    if !donation.lat.is_finite() || !donation.lon.is_finite() {
        return Err(CacheError::InvalidRequest(
            "lat and lon must be finite numbers".to_string(),
        ));
    }

    let record = state.orchestrator.handle_donation(&donation).await;
    Ok(Json(record.into()))
}

/// Handler for GET /geocode?lat=..&lon=..
pub async fn geocode_handler(
    State(state): State<AppState>,
    Query(query): Query<LocationQuery>,
) -> Result<Json<GeocodeResponse>> {
    if let Some(error_msg) = query.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let location = state.geocoder.resolve(query.lat, query.lon).await;
    Ok(Json(GeocodeResponse {
        lat: query.lat,
        lon: query.lon,
        location,
    }))
}

/// Handler for DELETE /geocode/cache
pub async fn geocode_clear_handler(State(state): State<AppState>) -> Json<ClearResponse> {
    let removed = state.geocoder.clear().await;
    info!(removed, "geocode memo cleared via API");
    Json(ClearResponse::new("Geocode cache cleared"))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
