//! In-process NGO directory resolver.

use async_trait::async_trait;
use tracing::debug;

use super::{CandidateResolver, NgoRef};
use crate::geo::Coordinates;

/// A registered NGO with its fixed location.
#[derive(Debug, Clone, PartialEq)]
pub struct Ngo {
    pub id: String,
    pub name: String,
    pub location: Coordinates,
}

impl Ngo {
    pub fn new(id: impl Into<String>, name: impl Into<String>, lat: f64, lon: f64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            location: Coordinates::new(lat, lon),
        }
    }
}

/// Resolver that scans a static NGO list and keeps those within a radius.
#[derive(Debug, Clone)]
pub struct NgoDirectory {
    ngos: Vec<Ngo>,
    radius_km: f64,
}

impl NgoDirectory {
    pub fn new(ngos: Vec<Ngo>, radius_km: f64) -> Self {
        Self { ngos, radius_km }
    }

    /// The built-in Bangalore directory.
    pub fn with_default_ngos(radius_km: f64) -> Self {
        Self::new(
            vec![
                Ngo::new("ngo001", "Helping Hands", 12.933, 77.610),
                Ngo::new("ngo002", "Food For All", 12.920, 77.600),
                Ngo::new("ngo003", "Kindness Kitchen", 13.000, 77.700),
            ],
            radius_km,
        )
    }

    /// NGOs within the radius of `location`, nearest first.
    pub fn within_radius(&self, location: Coordinates) -> Vec<NgoRef> {
        let mut found: Vec<NgoRef> = self
            .ngos
            .iter()
            .filter_map(|ngo| {
                let distance_km = location.distance_km(&ngo.location);
                (distance_km <= self.radius_km).then(|| NgoRef {
                    id: ngo.id.clone(),
                    name: ngo.name.clone(),
                    lat: ngo.location.lat,
                    lon: ngo.location.lon,
                    distance_km,
                })
            })
            .collect();

        found.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
        found
    }
}

#[async_trait]
impl CandidateResolver for NgoDirectory {
    async fn resolve_candidates(&self, location: Coordinates) -> anyhow::Result<Vec<NgoRef>> {
        let candidates = self.within_radius(location);
        debug!(
            lat = location.lat,
            lon = location.lon,
            found = candidates.len(),
            "directory lookup"
        );
        Ok(candidates)
    }
}
