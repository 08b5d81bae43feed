//! Request DTOs for the HTTP API
//!
//! Defines the structure of incoming admin request bodies.

use serde::Deserialize;

/// Request body for pre-warming a key (PUT /_admin/set/:group)
#[derive(Debug, Clone, Deserialize)]
pub struct SetRequest {
    /// The cache key
    pub key: String,
    /// The value to store
    pub value: String,
}

impl SetRequest {
    /// Validates the request data
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if self.key.is_empty() {
            return Some("Key cannot be empty".to_string());
        }
        None
    }
}

/// Request body for replacing ring membership (PUT /_admin/peers)
#[derive(Debug, Clone, Deserialize)]
pub struct PeersRequest {
    /// Base URLs of every peer, this node included
    pub peers: Vec<String>,
}

impl PeersRequest {
    pub fn validate(&self) -> Option<String> {
        if self.peers.is_empty() {
            return Some("Peer list cannot be empty".to_string());
        }
        if self.peers.iter().any(|p| p.trim().is_empty()) {
            return Some("Peer address cannot be blank".to_string());
        }
        None
    }
}
