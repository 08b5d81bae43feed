//! Peers Module
//!
//! Capabilities the group uses to route a miss to the peer owning the key,
//! plus the HTTP implementations of them.

mod client;
mod pool;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;

pub use client::{HttpPeer, CACHE_PATH};
pub use pool::HttpPool;

// == Peer Getter ==
/// Fetches a value for `(group, key)` from a remote node.
#[async_trait]
pub trait PeerGetter: Send + Sync {
    async fn get(&self, group: &str, key: &str) -> Result<Vec<u8>>;
}

// == Peer Picker ==
/// Chooses the peer that owns a key.
pub trait PeerPicker: Send + Sync {
    /// Returns the remote owner of `key`, or `None` when this node owns it.
    ///
    /// Fails with a configuration error if no membership has been set.
    fn pick_peer(&self, key: &str) -> Result<Option<Arc<dyn PeerGetter>>>;
}
