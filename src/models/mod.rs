//! Request and Response models for the HTTP API
//!
//! This module defines the DTOs (Data Transfer Objects) used for
//! serializing/deserializing the JSON bodies of the admin endpoints.
//! Peer-to-peer value transfers are raw bytes and have no model.

pub mod requests;
pub mod responses;

// Re-export commonly used types
pub use requests::{PeersRequest, SetRequest};
pub use responses::{ErrorResponse, HealthResponse, PeersResponse, SetResponse, StatsResponse};
