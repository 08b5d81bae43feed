//! Group Module
//!
//! A group is a named cache namespace: one loader, one byte-bounded local
//! cache and one coalescer, optionally spread over peers.
//!
//! # Miss resolution
//! 1. Local cache hit: return it.
//! 2. Otherwise, inside the coalescer for the key:
//!    - if a peer picker is registered and names a remote owner, fetch from
//!      it and return the bytes without caching them here;
//!    - on any peer failure, or when this node owns the key, call the
//!      loader and populate the local cache.

mod loader;
mod registry;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::cache::{ByteView, CacheStats, ConcurrentCache};
use crate::coalesce::Coalescer;
use crate::error::{CacheError, Result};
use crate::peers::{PeerGetter, PeerPicker};

pub use loader::{Loader, LoaderFn};
pub use registry::GroupRegistry;

// == Group Stats ==
/// Counters for one group.
#[derive(Debug, Clone, Serialize)]
pub struct GroupStats {
    pub name: String,
    /// Calls to `get` with a valid key
    pub gets: u64,
    /// Gets served straight from the local cache
    pub cache_hits: u64,
    /// Values produced by the local loader
    pub local_loads: u64,
    /// Values fetched from a remote owner
    pub peer_loads: u64,
    /// Remote fetches that failed and fell back to the loader
    pub peer_failures: u64,
    /// Local cache engine counters
    pub cache: CacheStats,
}

#[derive(Debug, Default)]
struct Counters {
    gets: AtomicU64,
    cache_hits: AtomicU64,
    local_loads: AtomicU64,
    peer_loads: AtomicU64,
    peer_failures: AtomicU64,
}

fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

struct GroupInner {
    name: String,
    loader: Box<dyn Loader>,
    cache: ConcurrentCache<ByteView>,
    peers: OnceLock<Arc<dyn PeerPicker>>,
    coalescer: Coalescer<ByteView>,
    counters: Counters,
}

// == Group ==
/// Handle to a named cache namespace. Cloning is cheap and shares state.
#[derive(Clone)]
pub struct Group {
    inner: Arc<GroupInner>,
}

impl Group {
    /// Builds a standalone group. Use [`GroupRegistry::new_group`] to make it
    /// reachable by name.
    pub(crate) fn new(name: impl Into<String>, cache_bytes: usize, loader: Box<dyn Loader>) -> Self {
        let name = name.into();
        let evict_log_name = name.clone();
        let cache = ConcurrentCache::with_eviction_callback(
            cache_bytes,
            Box::new(move |key: &str, value: &ByteView| {
                debug!(group = %evict_log_name, key, bytes = value.len(), "Evicted entry");
            }),
        );

        Self {
            inner: Arc::new(GroupInner {
                name,
                loader,
                cache,
                peers: OnceLock::new(),
                coalescer: Coalescer::new(),
                counters: Counters::default(),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    // == Get ==
    /// Returns the value for `key`, loading it on a miss.
    pub async fn get(&self, key: &str) -> Result<ByteView> {
        if key.is_empty() {
            return Err(CacheError::InvalidArgument("key is required".to_string()));
        }
        bump(&self.inner.counters.gets);

        if let Some(value) = self.inner.cache.get(key) {
            bump(&self.inner.counters.cache_hits);
            debug!(group = %self.inner.name, key, "Cache hit");
            return Ok(value);
        }

        let inner = self.inner.clone();
        let owned_key = key.to_string();
        self.inner
            .coalescer
            .run(key, move || async move { inner.load(&owned_key).await })
            .await
    }

    // == Register Peers ==
    /// Wires the peer picker used to route misses. Allowed once.
    pub fn register_peers(&self, peers: Arc<dyn PeerPicker>) -> Result<()> {
        self.inner.peers.set(peers).map_err(|_| {
            CacheError::Configuration(format!(
                "peers already registered for group {}",
                self.inner.name
            ))
        })
    }

    // == Set ==
    /// Writes a value straight into the local cache, bypassing the loader.
    pub fn set(&self, key: &str, value: ByteView) -> Result<()> {
        if key.is_empty() {
            return Err(CacheError::InvalidArgument("key is required".to_string()));
        }
        self.inner.cache.set(key, value);
        Ok(())
    }

    /// Whether `key` is currently held in this node's local cache.
    pub fn is_cached(&self, key: &str) -> bool {
        self.inner.cache.contains(key)
    }

    // == Stats ==
    pub fn stats(&self) -> GroupStats {
        let c = &self.inner.counters;
        GroupStats {
            name: self.inner.name.clone(),
            gets: c.gets.load(Ordering::Relaxed),
            cache_hits: c.cache_hits.load(Ordering::Relaxed),
            local_loads: c.local_loads.load(Ordering::Relaxed),
            peer_loads: c.peer_loads.load(Ordering::Relaxed),
            peer_failures: c.peer_failures.load(Ordering::Relaxed),
            cache: self.inner.cache.stats(),
        }
    }
}

impl GroupInner {
    async fn load(&self, key: &str) -> Result<ByteView> {
        if let Some(picker) = self.peers.get() {
            if let Some(peer) = picker.pick_peer(key)? {
                match self.get_from_peer(peer.as_ref(), key).await {
                    Ok(value) => return Ok(value),
                    Err(err) => {
                        bump(&self.counters.peer_failures);
                        warn!(group = %self.name, key, error = %err, "Failed to get from peer, loading locally");
                    }
                }
            }
        }

        self.get_locally(key).await
    }

    async fn get_from_peer(&self, peer: &dyn PeerGetter, key: &str) -> Result<ByteView> {
        let bytes = peer.get(&self.name, key).await?;
        bump(&self.counters.peer_loads);
        Ok(ByteView::from_vec(bytes))
    }

    async fn get_locally(&self, key: &str) -> Result<ByteView> {
        let bytes = self.loader.load(key).await?;
        let value = ByteView::copy_from_slice(&bytes);
        bump(&self.counters.local_loads);
        info!(group = %self.name, key, bytes = value.len(), "Loaded from source");

        self.cache.set(key, value.clone());
        Ok(value)
    }
}
