//! API Routes
//!
//! Configures the Axum router with the peer and admin endpoints.

use axum::{
    routing::{get, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    cache_handler, empty_key_handler, get_peers_handler, health_handler, set_handler,
    set_peers_handler, stats_handler, AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `GET /_cache/:group/:key` - Fetch a value (used by peers)
/// - `GET /_cache/:group/` - Rejects the empty key
/// - `PUT /_admin/set/:group` - Pre-warm a key
/// - `GET /_admin/peers` - Current ring membership
/// - `PUT /_admin/peers` - Replace ring membership
/// - `GET /stats/:group` - Group statistics
/// - `GET /health` - Health check endpoint
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/_cache/:group/", get(empty_key_handler))
        .route("/_cache/:group/:key", get(cache_handler))
        .route("/_admin/set/:group", put(set_handler))
        .route("/_admin/peers", get(get_peers_handler).put(set_peers_handler))
        .route("/stats/:group", get(stats_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
