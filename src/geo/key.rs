//! Location Key Encoder
//!
//! Reduces continuous coordinates to a bounded set of grid-cell cache keys.

use std::fmt;

use serde::Serialize;

use crate::error::ConfigError;

/// Small nudge so values sitting exactly on a cell boundary do not fall
/// into the lower cell through floating-point division error.
const BOUNDARY_EPSILON: f64 = 1e-9;

// == Cache Key ==
/// Opaque key of one quantization grid cell, formatted `latCell:lonCell`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Length in bytes, used by memory estimates.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CacheKey {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

// == Location Key Encoder ==
/// Quantizes coordinates onto a fixed grid of `resolution`-degree cells.
#[derive(Debug, Clone, Copy)]
pub struct LocationKeyEncoder {
    resolution: f64,
}

impl LocationKeyEncoder {
    /// Creates an encoder for the given cell size in degrees.
    ///
    /// Fails for non-finite, non-positive or over-large resolutions so the
    /// service never runs with undefined quantization.
    pub fn new(resolution: f64) -> Result<Self, ConfigError> {
        if !resolution.is_finite() || resolution <= 0.0 || resolution > 90.0 {
            return Err(ConfigError::Invalid {
                name: "GRID_RESOLUTION",
                reason: format!("{} is not in (0, 90] degrees", resolution),
            });
        }
        Ok(Self { resolution })
    }

    // == Encode ==
    /// Maps a coordinate pair to the key of its grid cell.
    ///
    /// Out-of-range values are clamped and NaN is treated as 0, so this
    /// never fails.
    pub fn encode(&self, lat: f64, lon: f64) -> CacheKey {
        let lat_cell = self.cell(sanitize(lat, 90.0));
        let lon_cell = self.cell(sanitize(lon, 180.0));
        CacheKey(format!("{}:{}", lat_cell, lon_cell))
    }

    /// Upper bound on the number of distinct keys this encoder can produce.
    #[cfg(test)]
    fn key_space(&self) -> u64 {
        let lat_cells = (180.0 / self.resolution).floor() as u64 + 1;
        let lon_cells = (360.0 / self.resolution).floor() as u64 + 1;
        lat_cells.saturating_mul(lon_cells)
    }

    fn cell(&self, value: f64) -> i64 {
        (value / self.resolution + BOUNDARY_EPSILON).floor() as i64
    }
}

fn sanitize(value: f64, limit: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(-limit, limit)
    }
}
