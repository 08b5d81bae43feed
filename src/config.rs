//! Configuration Module
//!
//! Handles loading and managing node configuration from environment variables.

use std::env;

/// Default number of virtual nodes per peer on the hash ring.
pub const DEFAULT_REPLICAS: usize = 50;

/// Node configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Byte capacity of the group's local cache (0 = unbounded)
    pub cache_bytes: usize,
    /// Name of the group served by this node
    pub group_name: String,
    /// HTTP server port
    pub server_port: u16,
    /// Base URL other peers use to reach this node
    pub self_addr: String,
    /// Base URLs of every peer in the cluster, including this node
    pub peers: Vec<String>,
    /// Virtual nodes per peer on the hash ring
    pub replicas: usize,
    /// Timeout in milliseconds for a single remote fetch
    pub peer_timeout_ms: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_BYTES` - Local cache capacity in bytes (default: 1 MiB)
    /// - `GROUP_NAME` - Group served by this node (default: scores)
    /// - `SERVER_PORT` - HTTP server port (default: 8001)
    /// - `SELF_ADDR` - This node's base URL (default: http://localhost:<port>)
    /// - `PEERS` - Comma separated peer base URLs (default: this node only)
    /// - `REPLICAS` - Virtual nodes per peer (default: 50)
    /// - `PEER_TIMEOUT_MS` - Remote fetch timeout (default: 2000)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let server_port = parse_var("SERVER_PORT").unwrap_or(defaults.server_port);
        let self_addr =
            env::var("SELF_ADDR").unwrap_or_else(|_| format!("http://localhost:{}", server_port));
        let peers = env::var("PEERS")
            .ok()
            .map(|v| parse_peer_list(&v))
            .filter(|list| !list.is_empty())
            .unwrap_or_else(|| vec![self_addr.clone()]);

        Self {
            cache_bytes: parse_var("CACHE_BYTES").unwrap_or(defaults.cache_bytes),
            group_name: env::var("GROUP_NAME").unwrap_or(defaults.group_name),
            server_port,
            self_addr,
            peers,
            replicas: parse_var("REPLICAS").unwrap_or(defaults.replicas),
            peer_timeout_ms: parse_var("PEER_TIMEOUT_MS").unwrap_or(defaults.peer_timeout_ms),
        }
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}

/// Splits a comma separated peer list, dropping blanks and trailing slashes.
pub fn parse_peer_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|p| p.trim().trim_end_matches('/'))
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_bytes: 1 << 20,
            group_name: "scores".to_string(),
            server_port: 8001,
            self_addr: "http://localhost:8001".to_string(),
            peers: vec!["http://localhost:8001".to_string()],
            replicas: DEFAULT_REPLICAS,
            peer_timeout_ms: 2000,
        }
    }
}
