//! API Handlers
//!
//! HTTP request handlers for the peer and admin endpoints.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::header,
    response::IntoResponse,
    Json,
};

use crate::cache::ByteView;
use crate::error::{CacheError, Result};
use crate::group::{Group, GroupRegistry};
use crate::models::{
    HealthResponse, PeersRequest, PeersResponse, SetRequest, SetResponse, StatsResponse,
};
use crate::peers::HttpPool;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Every group served by this node
    pub registry: Arc<GroupRegistry>,
    /// Ring membership, when this node takes part in a cluster
    pub pool: Option<Arc<HttpPool>>,
}

impl AppState {
    /// Creates a new AppState for a standalone node.
    pub fn new(registry: Arc<GroupRegistry>) -> Self {
        Self {
            registry,
            pool: None,
        }
    }

    /// Attaches the peer pool managed through `/_admin/peers`.
    pub fn with_pool(mut self, pool: Arc<HttpPool>) -> Self {
        self.pool = Some(pool);
        self
    }

    fn group(&self, name: &str) -> Result<Group> {
        self.registry
            .get_group(name)
            .ok_or_else(|| CacheError::NotFound(format!("no such group: {}", name)))
    }

    fn pool(&self) -> Result<&Arc<HttpPool>> {
        self.pool
            .as_ref()
            .ok_or_else(|| CacheError::Configuration("node has no peer pool".to_string()))
    }
}

/// Handler for GET /_cache/:group/:key
///
/// Serves the raw value bytes to peers (and any other client).
pub async fn cache_handler(
    State(state): State<AppState>,
    Path((group, key)): Path<(String, String)>,
) -> Result<impl IntoResponse> {
    let view = state.group(&group)?.get(&key).await?;

    Ok((
        [(header::CONTENT_TYPE, "application/octet-stream")],
        view.bytes(),
    ))
}

/// Handler for GET /_cache/:group/
///
/// A trailing slash with nothing after it is an empty key, not a missing route.
pub async fn empty_key_handler(
    State(state): State<AppState>,
    Path(group): Path<String>,
) -> CacheError {
    match state.group(&group) {
        Ok(_) => CacheError::InvalidArgument("key is required".to_string()),
        Err(err) => err,
    }
}

/// Handler for PUT /_admin/set/:group
///
/// Pre-warms a key in the group's local cache.
pub async fn set_handler(
    State(state): State<AppState>,
    Path(group): Path<String>,
    Json(req): Json<SetRequest>,
) -> Result<Json<SetResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidArgument(error_msg));
    }

    state
        .group(&group)?
        .set(&req.key, ByteView::from(req.value))?;

    Ok(Json(SetResponse::new(group, req.key)))
}

/// Handler for GET /_admin/peers
pub async fn get_peers_handler(State(state): State<AppState>) -> Result<Json<PeersResponse>> {
    let pool = state.pool()?;
    Ok(Json(PeersResponse {
        self_addr: pool.self_addr().to_string(),
        peers: pool.peers(),
    }))
}

/// Handler for PUT /_admin/peers
///
/// Replaces ring membership.
pub async fn set_peers_handler(
    State(state): State<AppState>,
    Json(req): Json<PeersRequest>,
) -> Result<Json<PeersResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidArgument(error_msg));
    }

    let pool = state.pool()?;
    pool.set_peers(req.peers.iter().map(|p| p.trim().trim_end_matches('/')));

    Ok(Json(PeersResponse {
        self_addr: pool.self_addr().to_string(),
        peers: pool.peers(),
    }))
}

/// Handler for GET /stats/:group
pub async fn stats_handler(
    State(state): State<AppState>,
    Path(group): Path<String>,
) -> Result<Json<StatsResponse>> {
    let stats = state.group(&group)?.stats();
    Ok(Json(StatsResponse::new(stats)))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
