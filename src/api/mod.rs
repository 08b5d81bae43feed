//! API Module
//!
//! HTTP handlers and routing: the peer endpoint other nodes fetch from,
//! plus admin endpoints for pre-warming, membership and stats.
//!
//! # Endpoints
//! - `GET /_cache/:group/:key` - Fetch a value as raw bytes
//! - `PUT /_admin/set/:group` - Pre-warm a key
//! - `GET|PUT /_admin/peers` - Read or replace ring membership
//! - `GET /stats/:group` - Group statistics
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
