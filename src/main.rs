//! Distcache node
//!
//! Serves one group over HTTP and shares its key space with the peers
//! listed in the configuration.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use distcache::{create_router, AppState, CacheError, Config, GroupRegistry, HttpPool, LoaderFn};

/// Stand-in for a slow backing store.
fn demo_source() -> Arc<HashMap<String, String>> {
    Arc::new(
        [("Tom", "630"), ("Jack", "589"), ("Sam", "567")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
    )
}

/// Main entry point for a cache node.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Create the group backed by the demo source
/// 4. Build the peer pool and register it with the group
/// 5. Serve the HTTP API until SIGINT/SIGTERM
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "distcache=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting distcache node");

    let config = Config::from_env();
    info!(
        "Configuration loaded: group={}, cache_bytes={}, port={}, self={}, peers={:?}",
        config.group_name, config.cache_bytes, config.server_port, config.self_addr, config.peers
    );

    let source = demo_source();
    let registry = Arc::new(GroupRegistry::new());
    let group = registry.new_group(
        &config.group_name,
        config.cache_bytes,
        LoaderFn(move |key: String| {
            let source = source.clone();
            async move {
                info!("[SlowDB] search key {}", key);
                source
                    .get(&key)
                    .map(|v| v.clone().into_bytes())
                    .ok_or(CacheError::NotFound(key))
            }
        }),
    )?;

    let pool = Arc::new(HttpPool::new(
        config.self_addr.clone(),
        config.replicas,
        Duration::from_millis(config.peer_timeout_ms),
    )?);
    pool.set_peers(config.peers.clone());
    group.register_peers(pool.clone())?;

    let app = create_router(AppState::new(registry).with_pool(pool));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    info!("Node listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving HTTP")?;

    info!("Node shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }
}
