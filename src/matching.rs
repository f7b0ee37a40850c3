//! Matching Orchestrator
//!
//! Turns a donation event into a match record for the nearest NGO, using the
//! candidate cache and falling back to an uncached lookup when population fails.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::cache::{CandidateCache, Candidates};
use crate::geo::Coordinates;

/// A donation as received from the intake side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DonationEvent {
    pub donation_id: String,
    pub donor_id: String,
    pub lat: f64,
    pub lon: f64,
    pub quantity: u32,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub description: Option<String>,
}

impl DonationEvent {
    pub fn location(&self) -> Coordinates {
        Coordinates::new(self.lat, self.lon)
    }
}

/// A donation paired with the NGO it was matched to.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchRecord {
    pub donation_id: String,
    pub donor_id: String,
    pub ngo_id: String,
    pub ngo_name: String,
    pub lat: f64,
    pub lon: f64,
    pub quantity: u32,
    pub timestamp: DateTime<Utc>,
    pub ngo_lat: f64,
    pub ngo_lon: f64,
    pub distance_km: f64,
}

// == Matching Orchestrator ==
#[derive(Clone)]
pub struct MatchingOrchestrator {
    cache: CandidateCache,
}

impl MatchingOrchestrator {
    pub fn new(cache: CandidateCache) -> Self {
        Self { cache }
    }

    /// Candidates for a location, nearest first.
    ///
    /// A failed population is retried once as a direct, uncached lookup; if
    /// that fails too the location is treated as having no candidates.
    pub async fn candidates_for(&self, location: Coordinates) -> Option<Candidates> {
        match self.cache.get_or_resolve(location).await {
            Ok(candidates) => Some(candidates),
            Err(e) => {
                warn!(error = %e, "cached resolution failed, falling back to direct lookup");
                match self.cache.resolve_direct(location).await {
                    Ok(candidates) => Some(candidates),
                    Err(e) => {
                        warn!(error = %e, "direct resolution failed");
                        None
                    }
                }
            }
        }
    }

    // == Handle Donation ==
    /// Matches a donation to its nearest candidate, if any.
    pub async fn handle_donation(&self, donation: &DonationEvent) -> Option<MatchRecord> {
        info!(
            donation_id = %donation.donation_id,
            donor_id = %donation.donor_id,
            lat = donation.lat,
            lon = donation.lon,
            "received donation"
        );

        let candidates = self.candidates_for(donation.location()).await?;
        let Some(nearest) = candidates.first() else {
            info!(donation_id = %donation.donation_id, "no nearby NGO found");
            return None;
        };

        info!(
            donation_id = %donation.donation_id,
            ngo_id = %nearest.id,
            ngo_name = %nearest.name,
            "matched donation"
        );

        Some(MatchRecord {
            donation_id: donation.donation_id.clone(),
            donor_id: donation.donor_id.clone(),
            ngo_id: nearest.id.clone(),
            ngo_name: nearest.name.clone(),
            lat: donation.lat,
            lon: donation.lon,
            quantity: donation.quantity,
            timestamp: donation.timestamp,
            ngo_lat: nearest.lat,
            ngo_lon: nearest.lon,
            distance_km: nearest.distance_km,
        })
    }
}
