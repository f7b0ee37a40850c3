//! Configuration Module
//!
//! Handles loading and validating service configuration from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;
use crate::geo::{Coordinates, LocationKeyEncoder};

/// Service configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
/// A value that is set but malformed is a startup error, never silently defaulted.
#[derive(Debug, Clone)]
pub struct Config {
    /// Quantization grid cell size in degrees
    pub grid_resolution: f64,
    /// TTL in seconds for candidate entries
    pub candidate_ttl: u64,
    /// Soft memory budget for the candidate cache, in estimated bytes
    pub max_memory_bytes: usize,
    /// Background expiry sweep interval in seconds
    pub sweep_interval: u64,
    /// Upper bound on any single upstream call, in milliseconds
    pub upstream_timeout_ms: u64,
    /// How long an administration operation waits for the store lock, in milliseconds
    pub admin_lock_timeout_ms: u64,
    /// HTTP server port
    pub server_port: u16,
    /// Radius used by the built-in NGO directory resolver
    pub search_radius_km: f64,
    /// Whether the cache starts enabled
    pub cache_enabled: bool,
    /// Base URL of the reverse-geocoding service
    pub geocoder_url: String,
    /// Locations pre-populated by a warm request without a body
    pub warm_locations: Vec<Coordinates>,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `GRID_RESOLUTION` - Grid cell size in degrees (default: 0.01)
    /// - `CANDIDATE_TTL` - Candidate TTL in seconds (default: 1800)
    /// - `MAX_MEMORY_BYTES` - Memory budget (default: 16 MiB)
    /// - `SWEEP_INTERVAL` - Expiry sweep frequency in seconds (default: 60)
    /// - `UPSTREAM_TIMEOUT_MS` - Upstream call timeout (default: 2000)
    /// - `ADMIN_LOCK_TIMEOUT_MS` - Admin lock wait (default: 500)
    /// - `SERVER_PORT` - HTTP server port (default: 8082)
    /// - `SEARCH_RADIUS_KM` - NGO search radius (default: 5.0)
    /// - `CACHE_ENABLED` - Initial cache state (default: true)
    /// - `GEOCODER_URL` - Reverse geocoder base URL (default: Nominatim)
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let config = Self {
            grid_resolution: env_or("GRID_RESOLUTION", defaults.grid_resolution)?,
            candidate_ttl: env_or("CANDIDATE_TTL", defaults.candidate_ttl)?,
            max_memory_bytes: env_or("MAX_MEMORY_BYTES", defaults.max_memory_bytes)?,
            sweep_interval: env_or("SWEEP_INTERVAL", defaults.sweep_interval)?,
            upstream_timeout_ms: env_or("UPSTREAM_TIMEOUT_MS", defaults.upstream_timeout_ms)?,
            admin_lock_timeout_ms: env_or("ADMIN_LOCK_TIMEOUT_MS", defaults.admin_lock_timeout_ms)?,
            server_port: env_or("SERVER_PORT", defaults.server_port)?,
            search_radius_km: env_or("SEARCH_RADIUS_KM", defaults.search_radius_km)?,
            cache_enabled: env_or("CACHE_ENABLED", defaults.cache_enabled)?,
            geocoder_url: env_or("GEOCODER_URL", defaults.geocoder_url)?,
            warm_locations: defaults.warm_locations,
        };
        config.validate()?;
        Ok(config)
    }

    /// Rejects configurations the cache cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        LocationKeyEncoder::new(self.grid_resolution)?;
        if self.max_memory_bytes == 0 {
            return Err(invalid("MAX_MEMORY_BYTES", "must be greater than zero"));
        }
        if self.candidate_ttl == 0 {
            return Err(invalid("CANDIDATE_TTL", "must be greater than zero"));
        }
        if self.sweep_interval == 0 {
            return Err(invalid("SWEEP_INTERVAL", "must be greater than zero"));
        }
        if self.upstream_timeout_ms == 0 {
            return Err(invalid("UPSTREAM_TIMEOUT_MS", "must be greater than zero"));
        }
        if !self.search_radius_km.is_finite() || self.search_radius_km <= 0.0 {
            return Err(invalid("SEARCH_RADIUS_KM", "must be a positive distance"));
        }
        Ok(())
    }

    pub fn candidate_ttl(&self) -> Duration {
        Duration::from_secs(self.candidate_ttl)
    }

    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_millis(self.upstream_timeout_ms)
    }

    pub fn admin_lock_timeout(&self) -> Duration {
        Duration::from_millis(self.admin_lock_timeout_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            grid_resolution: 0.01,
            candidate_ttl: 30 * 60,
            max_memory_bytes: 16 * 1024 * 1024,
            sweep_interval: 60,
            upstream_timeout_ms: 2000,
            admin_lock_timeout_ms: 500,
            server_port: 8082,
            search_radius_km: 5.0,
            cache_enabled: true,
            geocoder_url: "https://nominatim.openstreetmap.org".to_string(),
            warm_locations: vec![
                Coordinates::new(12.9716, 77.5946),
                Coordinates::new(12.920, 77.600),
                Coordinates::new(13.000, 77.700),
                Coordinates::new(12.933, 77.610),
            ],
        }
    }
}

fn env_or<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Unparseable { name, value }),
        Err(_) => Ok(default),
    }
}

fn invalid(name: &'static str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        name,
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.grid_resolution, 0.01);
        assert_eq!(config.candidate_ttl, 1800);
        assert_eq!(config.server_port, 8082);
        assert_eq!(config.warm_locations.len(), 4);
        assert!(config.cache_enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_grid_resolution() {
        for resolution in [0.0, -0.5, f64::NAN, f64::INFINITY, 120.0] {
            let config = Config {
                grid_resolution: resolution,
                ..Config::default()
            };
            assert!(
                matches!(config.validate(), Err(ConfigError::Invalid { name: "GRID_RESOLUTION", .. })),
                "resolution {} should be rejected",
                resolution
            );
        }
    }

    #[test]
    fn test_rejects_zero_memory_budget() {
        let config = Config {
            max_memory_bytes: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_env_or_parsing() {
        env::set_var("NGO_CACHE_TEST_PORT", "9000");
        env::set_var("NGO_CACHE_TEST_BAD", "nine");
        env::remove_var("NGO_CACHE_TEST_MISSING");

        assert_eq!(env_or::<u16>("NGO_CACHE_TEST_PORT", 1).unwrap(), 9000);
        assert_eq!(env_or::<u16>("NGO_CACHE_TEST_MISSING", 7).unwrap(), 7);
        assert!(matches!(
            env_or::<u16>("NGO_CACHE_TEST_BAD", 1),
            Err(ConfigError::Unparseable { .. })
        ));
    }
}
