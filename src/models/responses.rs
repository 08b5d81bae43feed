//! Response DTOs for the HTTP API
//!
//! Defines the structure of outgoing admin response bodies.

use serde::Serialize;

use crate::group::GroupStats;

/// Response body for the pre-warm operation (PUT /_admin/set/:group)
#[derive(Debug, Clone, Serialize)]
pub struct SetResponse {
    /// Success message
    pub message: String,
    /// The group written to
    pub group: String,
    /// The key that was set
    pub key: String,
}

impl SetResponse {
    /// Creates a new SetResponse
    pub fn new(group: impl Into<String>, key: impl Into<String>) -> Self {
        let group = group.into();
        let key = key.into();
        Self {
            message: format!("Key '{}' set in group '{}'", key, group),
            group,
            key,
        }
    }
}

/// Response body for the membership endpoints (/_admin/peers)
#[derive(Debug, Clone, Serialize)]
pub struct PeersResponse {
    /// This node's own address
    pub self_addr: String,
    /// Current ring members
    pub peers: Vec<String>,
}

/// Response body for the stats endpoint (GET /stats/:group)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    #[serde(flatten)]
    pub stats: GroupStats,
    /// Fraction of gets served from the local cache
    pub hit_rate: f64,
    /// Share of the local byte budget in use
    pub fill_ratio: f64,
}

impl StatsResponse {
    pub fn new(stats: GroupStats) -> Self {
        let hit_rate = if stats.gets > 0 {
            stats.cache_hits as f64 / stats.gets as f64
        } else {
            0.0
        };
        let fill_ratio = stats.cache.fill_ratio();
        Self {
            stats,
            hit_rate,
            fill_ratio,
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error message describing what went wrong
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
