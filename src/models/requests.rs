//! Request DTOs for the cache service API
//!
//! Defines the structure of incoming HTTP request bodies and query strings.

use serde::Deserialize;

use crate::geo::Coordinates;

/// Request body for POST /cache/warm. Both the body and `locations` are optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WarmRequest {
    #[serde(default)]
    pub locations: Option<Vec<Coordinates>>,
}

/// Request body for PUT /cache/status
#[derive(Debug, Clone, Deserialize)]
pub struct ToggleRequest {
    pub enabled: bool,
}

/// Query string for the location endpoints (`?lat=..&lon=..`)
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct LocationQuery {
    pub lat: f64,
    pub lon: f64,
}

impl LocationQuery {
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if !self.lat.is_finite() || !self.lon.is_finite() {
            return Some("lat and lon must be finite numbers".to_string());
        }
        None
    }

    pub fn coordinates(&self) -> Coordinates {
        Coordinates::new(self.lat, self.lon)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_warm_request_without_locations() {
        let req: WarmRequest = serde_json::from_str("{}").unwrap();
        assert!(req.locations.is_none());
    }

    #[test]
    fn test_warm_request_with_locations() {
        let json = r#"{"locations":[{"lat":12.97,"lon":77.59},{"lat":13.0,"lon":77.7}]}"#;
        let req: WarmRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.locations.unwrap().len(), 2);
    }

    #[test]
    fn test_location_query_validate() {
        assert!(LocationQuery { lat: 12.9, lon: 77.6 }.validate().is_none());
        assert!(LocationQuery { lat: f64::NAN, lon: 77.6 }.validate().is_some());
    }
}
