//! API Routes
//!
//! Configures the Axum router with all cache service endpoints.

use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    clear_handler, clear_location_handler, donation_handler, geocode_clear_handler,
    geocode_handler, health_handler, stats_handler, status_handler, toggle_handler, warm_handler,
    AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `GET /cache/status` / `PUT /cache/status` - Read or toggle the enabled flag
/// - `GET /cache/stats` - Cache statistics
/// - `POST /cache/warm` - Pre-populate common locations
/// - `DELETE /cache/clear` - Drop every entry
/// - `DELETE /cache/clear/location` - Drop the entry for one grid cell
/// - `POST /donations` - Match a donation to its nearest NGO
/// - `GET /geocode` / `DELETE /geocode/cache` - Reverse geocoding memo
/// - `GET /health` - Health check endpoint
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/cache/status", get(status_handler).put(toggle_handler))
        .route("/cache/stats", get(stats_handler))
        .route("/cache/warm", post(warm_handler))
        .route("/cache/clear", delete(clear_handler))
        .route("/cache/clear/location", delete(clear_location_handler))
        .route("/donations", post(donation_handler))
        .route("/geocode", get(geocode_handler))
        .route("/geocode/cache", delete(geocode_clear_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::geo::Coordinates;
    use crate::upstream::{NgoDirectory, ReverseGeocoder};
    use async_trait::async_trait;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use std::sync::Arc;
    use tower::util::ServiceExt;

    struct OfflineGeocoder;

    #[async_trait]
    impl ReverseGeocoder for OfflineGeocoder {
        async fn reverse_geocode(&self, _location: Coordinates) -> anyhow::Result<String> {
            anyhow::bail!("geocoder offline")
        }
    }

    fn create_test_app() -> Router {
        let state = AppState::new(
            &Config::default(),
            Arc::new(NgoDirectory::with_default_ngos(5.0)),
            Arc::new(OfflineGeocoder),
        )
        .unwrap();
        create_router(state)
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let app = create_test_app();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_stats_endpoint() {
        let app = create_test_app();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/cache/stats")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_toggle_requires_body() {
        let app = create_test_app();

        let response = app
            .oneshot(
                Request::builder()
                    .method("PUT")
                    .uri("/cache/status")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"enabled":"yes"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert!(response.status().is_client_error());
    }

    #[tokio::test]
    async fn test_clear_location_missing_query() {
        let app = create_test_app();

        let response = app
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri("/cache/clear/location?lat=12.97")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_geocode_failure_is_not_an_error() {
        let app = create_test_app();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/geocode?lat=12.97&lon=77.59")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let app = create_test_app();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/get/anything")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
