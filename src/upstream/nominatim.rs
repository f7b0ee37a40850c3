//! Nominatim reverse-geocoding client
//!
//! Fetches a `City, State` style label for a coordinate pair from an
//! OpenStreetMap Nominatim instance.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;

use super::ReverseGeocoder;
use crate::geo::Coordinates;

/// Identifies this service to Nominatim, which rejects anonymous clients
const USER_AGENT: &str = concat!("ngo_cache/", env!("CARGO_PKG_VERSION"));

/// Errors that can occur when reverse geocoding
#[derive(Debug, Error)]
pub enum GeocodeError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// Failed to parse JSON response
    #[error("Failed to parse JSON response: {0}")]
    ParseError(#[from] serde_json::Error),

    /// Response carried no address block
    #[error("No address found for {lat},{lon}")]
    NoAddress { lat: f64, lon: f64 },
}

#[derive(Debug, Deserialize)]
struct ReverseResponse {
    address: Option<Address>,
}

#[derive(Debug, Deserialize)]
struct Address {
    city: Option<String>,
    town: Option<String>,
    village: Option<String>,
    county: Option<String>,
    state: Option<String>,
}

impl Address {
    fn label(self) -> String {
        let place = self
            .city
            .or(self.town)
            .or(self.village)
            .or(self.county)
            .unwrap_or_else(|| "Unknown".to_string());

        match self.state.filter(|s| !s.trim().is_empty()) {
            Some(state) => format!("{}, {}", place, state),
            None => place,
        }
    }
}

/// Client for a Nominatim `/reverse` endpoint
#[derive(Debug, Clone)]
pub struct NominatimGeocoder {
    client: Client,
    base_url: String,
}

impl NominatimGeocoder {
    /// Builds the HTTP client. Fails if the TLS backend cannot be set up.
    pub fn new(base_url: impl Into<String>) -> Result<Self, GeocodeError> {
        let client = Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Fetch the address label for the given coordinates
    pub async fn lookup(&self, location: Coordinates) -> Result<String, GeocodeError> {
        let url = format!(
            "{}/reverse?format=json&lat={}&lon={}&zoom=10&addressdetails=1",
            self.base_url, location.lat, location.lon
        );

        let text = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        parse_label(&text, location)
    }
}

fn parse_label(body: &str, location: Coordinates) -> Result<String, GeocodeError> {
    let response: ReverseResponse = serde_json::from_str(body)?;
    response
        .address
        .map(Address::label)
        .ok_or(GeocodeError::NoAddress {
            lat: location.lat,
            lon: location.lon,
        })
}

#[async_trait]
impl ReverseGeocoder for NominatimGeocoder {
    async fn reverse_geocode(&self, location: Coordinates) -> anyhow::Result<String> {
        Ok(self.lookup(location).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HERE: Coordinates = Coordinates {
        lat: 12.9716,
        lon: 77.5946,
    };

    #[test]
    fn test_city_and_state() {
        let body = r#"{"address":{"city":"Bengaluru","state":"Karnataka"}}"#;
        assert_eq!(parse_label(body, HERE).unwrap(), "Bengaluru, Karnataka");
    }

    #[test]
    fn test_falls_back_through_place_kinds() {
        let body = r#"{"address":{"village":"Hoskote","county":"Bangalore Rural"}}"#;
        assert_eq!(parse_label(body, HERE).unwrap(), "Hoskote");

        let body = r#"{"address":{"state":"Karnataka"}}"#;
        assert_eq!(parse_label(body, HERE).unwrap(), "Unknown, Karnataka");
    }

    #[test]
    fn test_missing_address_is_an_error() {
        let body = r#"{"error":"Unable to geocode"}"#;
        assert!(matches!(
            parse_label(body, HERE),
            Err(GeocodeError::NoAddress { .. })
        ));
    }

    #[test]
    fn test_malformed_body() {
        assert!(matches!(
            parse_label("not json", HERE),
            Err(GeocodeError::ParseError(_))
        ));
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let geocoder = NominatimGeocoder::new("http://localhost:8080/").unwrap();
        assert_eq!(geocoder.base_url, "http://localhost:8080");
    }
}
