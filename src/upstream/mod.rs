//! Upstream Collaborators
//!
//! The expensive, fallible calls the caches sit in front of: nearest-NGO
//! resolution and reverse geocoding. Both are consumed through traits so
//! the caches can be driven by any implementation.

mod directory;
mod nominatim;

pub use directory::{Ngo, NgoDirectory};
pub use nominatim::{GeocodeError, NominatimGeocoder};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::geo::Coordinates;

// == NGO Reference ==
/// One candidate NGO as returned by a resolver, ordered by distance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NgoRef {
    pub id: String,
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    pub distance_km: f64,
}

/// Resolves the NGOs eligible for a donation at a location.
///
/// Implementations return candidates nearest first; callers never re-sort.
#[async_trait]
pub trait CandidateResolver: Send + Sync {
    async fn resolve_candidates(&self, location: Coordinates) -> anyhow::Result<Vec<NgoRef>>;
}

/// Turns a location into a human-readable address.
#[async_trait]
pub trait ReverseGeocoder: Send + Sync {
    async fn reverse_geocode(&self, location: Coordinates) -> anyhow::Result<String>;
}
