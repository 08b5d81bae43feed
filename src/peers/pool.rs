//! HTTP Peer Pool
//!
//! Picks the owner of a key on a consistent hash ring of peer base URLs.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use reqwest::Client;
use tracing::{debug, info};

use crate::error::{CacheError, Result};
use crate::peers::{HttpPeer, PeerGetter, PeerPicker};
use crate::ring::HashRing;

/// Ring plus clients for one membership list. Never mutated once built.
struct Membership {
    members: Vec<String>,
    ring: HashRing,
    getters: HashMap<String, Arc<HttpPeer>>,
}

// == HTTP Pool ==
/// Peer picker over HTTP peers.
///
/// Membership changes build a fresh ring and swap it in whole, so every
/// lookup runs against one consistent snapshot.
pub struct HttpPool {
    self_addr: String,
    replicas: usize,
    client: Client,
    membership: RwLock<Arc<Membership>>,
}

impl HttpPool {
    /// Creates a pool for the node reachable at `self_addr`, with no peers yet.
    pub fn new(self_addr: impl Into<String>, replicas: usize, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CacheError::Configuration(format!("building peer client: {}", e)))?;

        let pool = Self {
            self_addr: self_addr.into(),
            replicas,
            client,
            membership: RwLock::new(Arc::new(Membership {
                members: Vec::new(),
                ring: HashRing::new(replicas),
                getters: HashMap::new(),
            })),
        };
        Ok(pool)
    }

    pub fn self_addr(&self) -> &str {
        &self.self_addr
    }

    fn snapshot(&self) -> Arc<Membership> {
        self.membership
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn build(&self, mut members: Vec<String>) -> Membership {
        members.sort();
        members.dedup();

        let ring = HashRing::new(self.replicas);
        ring.add(&members);
        let getters = members
            .iter()
            .map(|m| (m.clone(), Arc::new(HttpPeer::new(m.clone(), self.client.clone()))))
            .collect();

        Membership {
            members,
            ring,
            getters,
        }
    }

    fn swap(&self, members: Vec<String>) {
        let next = Arc::new(self.build(members));
        info!(peers = ?next.members, "Peer membership updated");
        *self.membership.write().unwrap_or_else(PoisonError::into_inner) = next;
    }

    // == Membership ==
    /// Replaces the whole peer list.
    pub fn set_peers<I, S>(&self, peers: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.swap(peers.into_iter().map(Into::into).collect());
    }

    /// Adds peers to the current membership.
    pub fn add_peers<I, S>(&self, peers: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut members = self.snapshot().members.clone();
        members.extend(peers.into_iter().map(Into::into));
        self.swap(members);
    }

    /// Drops a peer from the current membership.
    pub fn remove_peer(&self, peer: &str) {
        let members = self
            .snapshot()
            .members
            .iter()
            .filter(|m| m.as_str() != peer)
            .cloned()
            .collect();
        self.swap(members);
    }

    /// Current members, sorted.
    pub fn peers(&self) -> Vec<String> {
        self.snapshot().members.clone()
    }

    /// The member owning `key`, which may be this node.
    pub fn owner(&self, key: &str) -> Result<String> {
        self.snapshot().ring.get(key)
    }
}

impl PeerPicker for HttpPool {
    fn pick_peer(&self, key: &str) -> Result<Option<Arc<dyn PeerGetter>>> {
        let membership = self.snapshot();
        let owner = membership.ring.get(key)?;
        if owner == self.self_addr {
            return Ok(None);
        }

        debug!(peer = %owner, key, "Pick peer");
        Ok(membership
            .getters
            .get(&owner)
            .map(|peer| peer.clone() as Arc<dyn PeerGetter>))
    }
}
