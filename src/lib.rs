//! Distcache - an embeddable distributed read-through cache
//!
//! A [`Group`] answers a key from its byte-bounded LRU cache, from the peer
//! owning the key on a consistent hash ring, or from an application loader,
//! collapsing concurrent misses for the same key into one load.

pub mod api;
pub mod cache;
pub mod coalesce;
pub mod config;
pub mod error;
pub mod group;
pub mod models;
pub mod peers;
pub mod ring;

pub use api::{create_router, AppState};
pub use cache::ByteView;
pub use config::Config;
pub use error::{CacheError, Result};
pub use group::{Group, GroupRegistry, Loader, LoaderFn};
pub use peers::{HttpPool, PeerGetter, PeerPicker};
pub use ring::HashRing;
