//! Error types for the cache
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;

// == Cache Error Enum ==
/// Unified error type for the cache.
///
/// Errors are `Clone` because a single coalesced load hands the same
/// outcome to every caller waiting on that key.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// Malformed request, e.g. an empty key
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The source of truth has no value for the key
    #[error("Key not found: {0}")]
    NotFound(String),

    /// The loader failed to reach the source of truth
    #[error("Source unavailable: {0}")]
    SourceUnavailable(String),

    /// A remote peer could not serve the request
    #[error("Peer unavailable: {0}")]
    PeerUnavailable(String),

    /// Programming or deployment fault: duplicate group, double peer
    /// registration, lookup on an empty hash ring
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            CacheError::InvalidArgument(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            CacheError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            CacheError::SourceUnavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg.clone()),
            CacheError::PeerUnavailable(msg) => (StatusCode::BAD_GATEWAY, msg.clone()),
            CacheError::Configuration(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
            CacheError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = Json(ErrorResponse::new(message));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache.
pub type Result<T> = std::result::Result<T, CacheError>;
