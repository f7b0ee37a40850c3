//! API Module
//!
//! HTTP handlers and routing for the candidate cache service.
//!
//! # Endpoints
//! - `/cache/*` - Cache administration (status, stats, warm, clear)
//! - `POST /donations` - Donation matching
//! - `/geocode` - Memoized reverse geocoding
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
