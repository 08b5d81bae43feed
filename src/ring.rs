//! Consistent Hash Ring
//!
//! Maps keys onto a dynamic set of node identifiers. Every node is placed on
//! the ring `replicas` times (virtual nodes) to smooth the distribution, and
//! adding or removing a node only remaps the keys adjacent to its points.
//!
//! # Known limitation
//! Two virtual nodes hashing to the same point collide: the mapping keeps
//! whichever node was inserted last. Removing either node hands the point
//! to whoever is left.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use tracing::debug;

use crate::error::{CacheError, Result};

/// Pure mapping from bytes to a point on the ring.
pub type HashFn = fn(&[u8]) -> u32;

#[derive(Debug, Default)]
struct RingState {
    /// Real nodes in insertion order
    nodes: Vec<String>,
    /// Sorted virtual node hashes
    points: Vec<u32>,
    /// Virtual node hash -> real node
    owners: HashMap<u32, String>,
}

// == Hash Ring ==
#[derive(Debug)]
pub struct HashRing {
    hash: HashFn,
    replicas: usize,
    state: RwLock<RingState>,
}

impl HashRing {
    /// Creates an empty ring hashing with CRC-32 (IEEE).
    pub fn new(replicas: usize) -> Self {
        Self::with_hasher(replicas, crc32fast::hash)
    }

    /// Creates an empty ring with a custom hash function.
    pub fn with_hasher(replicas: usize, hash: HashFn) -> Self {
        Self {
            hash,
            replicas,
            state: RwLock::new(RingState::default()),
        }
    }

    fn virtual_hash(&self, replica: usize, node: &str) -> u32 {
        (self.hash)(format!("{}{}", replica, node).as_bytes())
    }

    fn place(&self, state: &mut RingState, node: &str) {
        for i in 0..self.replicas {
            let point = self.virtual_hash(i, node);
            state.points.push(point);
            state.owners.insert(point, node.to_string());
        }
    }

    // == Add ==
    /// Places each node on the ring `replicas` times.
    pub fn add<I, S>(&self, nodes: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        for node in nodes {
            let node = node.as_ref();
            self.place(&mut state, node);
            state.nodes.push(node.to_string());
            debug!(node, replicas = self.replicas, "Added node to hash ring");
        }
        state.points.sort_unstable();
    }

    // == Remove ==
    /// Takes every virtual node of `node` off the ring.
    ///
    /// The remaining nodes are placed again in their original order, so a
    /// point that `node` shared with another node goes back to that node.
    pub fn remove(&self, node: &str) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let before = state.nodes.len();
        state.nodes.retain(|n| n != node);
        if state.nodes.len() == before {
            return;
        }

        let nodes = std::mem::take(&mut state.nodes);
        state.points.clear();
        state.owners.clear();
        for n in &nodes {
            self.place(&mut state, n);
        }
        state.nodes = nodes;
        state.points.sort_unstable();
        debug!(node, "Removed node from hash ring");
    }

    // == Get ==
    /// Returns the node owning `key`: the first virtual node clockwise from
    /// the key's hash, wrapping past the largest point.
    ///
    /// Querying an empty ring is a configuration fault.
    pub fn get(&self, key: &str) -> Result<String> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        if state.points.is_empty() {
            return Err(CacheError::Configuration(
                "hash ring has no nodes".to_string(),
            ));
        }

        let hash = (self.hash)(key.as_bytes());
        let idx = state.points.partition_point(|&p| p < hash);
        let point = state.points[idx % state.points.len()];

        state
            .owners
            .get(&point)
            .cloned()
            .ok_or_else(|| CacheError::Internal(format!("ring point {} has no owner", point)))
    }

    /// Number of virtual nodes currently on the ring.
    pub fn len(&self) -> usize {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .points
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn replicas(&self) -> usize {
        self.replicas
    }
}
