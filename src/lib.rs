//! NGO Cache - grid-keyed candidate cache for donation matching
//!
//! Caches the NGOs near a donation location per grid cell with TTL expiry,
//! LRU eviction under a memory budget, and single-flight population.

pub mod admin;
pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod flight;
pub mod geo;
pub mod geocode;
pub mod matching;
pub mod models;
pub mod tasks;
pub mod upstream;

pub use api::{create_router, AppState};
pub use cache::CandidateCache;
pub use config::Config;
pub use error::{CacheError, ConfigError, ResolveError};
pub use tasks::spawn_sweep_task;
