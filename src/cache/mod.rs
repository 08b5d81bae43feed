//! Cache Module
//!
//! Provides the byte-bounded LRU engine, its thread-safe wrapper and the
//! immutable `ByteView` values handed out to callers.

mod byteview;
mod concurrent;
mod lru;
mod stats;
mod store;


// Re-export public types
pub use byteview::ByteView;
pub use concurrent::ConcurrentCache;
pub use lru::{LruTracker, NodeId};
pub use stats::CacheStats;
pub use store::{EvictionCallback, LruCache};

// == Sized Value ==
/// Anything stored in the cache must report how many bytes it occupies.
///
/// The engine charges `key.len() + value.size()` per entry against its
/// capacity.
pub trait SizedValue {
    /// Size of the value in bytes.
    fn size(&self) -> usize;
}

impl SizedValue for String {
    fn size(&self) -> usize {
        self.len()
    }
}

impl SizedValue for Vec<u8> {
    fn size(&self) -> usize {
        self.len()
    }
}
