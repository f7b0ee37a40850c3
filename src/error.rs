//! Error types for the candidate cache service
//!
//! Provides unified error handling using thiserror.

use std::time::Duration;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::flight::FlightAborted;

// == Cache Error Enum ==
/// Errors surfaced by the cache and its administration surface.
///
/// A cache miss is never an error; lookups return `Option`.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// A single write whose estimated size is larger than the whole budget
    #[error("Entry of ~{size} bytes exceeds memory budget of {budget} bytes")]
    EntryTooLarge { size: usize, budget: usize },

    /// The store could not be locked within the administration deadline
    #[error("Timed out after {0:?} waiting for the cache store")]
    LockTimeout(Duration),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            CacheError::EntryTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            CacheError::LockTimeout(_) => StatusCode::SERVICE_UNAVAILABLE,
            CacheError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

// == Resolve Error ==
/// Failure of a time-bounded upstream call.
///
/// Cloneable so every caller waiting on the same in-flight resolution
/// observes the same outcome.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// The upstream did not answer within the configured timeout
    #[error("upstream timed out after {0:?}")]
    Timeout(Duration),

    /// The upstream answered with an error
    #[error("upstream failed: {0}")]
    Upstream(String),

    /// The task resolving the key died before producing a result
    #[error(transparent)]
    Aborted(#[from] FlightAborted),
}

// == Config Error ==
/// Invalid startup configuration. Always fatal.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// An environment variable was set but could not be parsed
    #[error("environment variable {name} has unparseable value {value:?}")]
    Unparseable { name: &'static str, value: String },

    /// A value parsed but is outside its allowed range
    #[error("invalid {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

// == Result Type Alias ==
/// Convenience Result type for the cache service.
pub type Result<T> = std::result::Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        let cases = [
            (
                CacheError::InvalidRequest("bad".into()),
                StatusCode::BAD_REQUEST,
            ),
            (
                CacheError::EntryTooLarge { size: 10, budget: 5 },
                StatusCode::PAYLOAD_TOO_LARGE,
            ),
            (
                CacheError::LockTimeout(Duration::from_millis(10)),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                CacheError::Internal("boom".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (error, expected) in cases {
            assert_eq!(error.into_response().status(), expected);
        }
    }

    #[test]
    fn test_resolve_error_is_comparable() {
        let err = ResolveError::Timeout(Duration::from_secs(2));
        assert_eq!(err.clone(), err);
        assert!(err.to_string().contains("timed out"));
    }
}
