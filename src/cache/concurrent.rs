//! Concurrent Cache Module
//!
//! Thread-safe, lazily allocated wrapper around [`LruCache`].

use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::cache::{CacheStats, EvictionCallback, LruCache, SizedValue};

struct Inner<V: SizedValue> {
    lru: Option<LruCache<V>>,
    on_evicted: Option<EvictionCallback<V>>,
}

// == Concurrent Cache ==
/// Serializes every access to the underlying engine behind one mutex.
///
/// `get` reorders the recency list, so reads take the same exclusive lock
/// as writes. The engine itself is only allocated on the first `set`.
pub struct ConcurrentCache<V: SizedValue> {
    inner: Mutex<Inner<V>>,
    max_bytes: usize,
}

impl<V: SizedValue + Clone> ConcurrentCache<V> {
    /// Creates a wrapper for a cache of `max_bytes` bytes (0 = unbounded).
    pub fn new(max_bytes: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                lru: None,
                on_evicted: None,
            }),
            max_bytes,
        }
    }

    /// Like [`new`](Self::new), handing `callback` to the engine once it is built.
    pub fn with_eviction_callback(max_bytes: usize, callback: EvictionCallback<V>) -> Self {
        let cache = Self::new(max_bytes);
        cache.lock().on_evicted = Some(callback);
        cache
    }

    // A panic inside an eviction callback must not wedge the cache for good.
    fn lock(&self) -> MutexGuard<'_, Inner<V>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // == Get ==
    /// Returns a clone of the cached value, if present.
    pub fn get(&self, key: &str) -> Option<V> {
        let mut inner = self.lock();
        inner.lru.as_mut()?.get(key).cloned()
    }

    /// Whether `key` is cached, without counting a lookup or promoting it.
    pub fn contains(&self, key: &str) -> bool {
        self.lock().lru.as_ref().is_some_and(|lru| lru.contains(key))
    }

    // == Set ==
    pub fn set(&self, key: impl Into<String>, value: V) {
        let mut inner = self.lock();
        let Inner { lru, on_evicted } = &mut *inner;
        let lru = lru.get_or_insert_with(|| match on_evicted.take() {
            Some(callback) => LruCache::with_eviction_callback(self.max_bytes, callback),
            None => LruCache::new(self.max_bytes),
        });
        lru.set(key, value);
    }

    // == Remove ==
    pub fn remove(&self, key: &str) -> Option<V> {
        self.lock().lru.as_mut()?.remove(key)
    }

    pub fn len(&self) -> usize {
        self.lock().lru.as_ref().map_or(0, LruCache::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the engine has been allocated yet.
    pub fn is_initialized(&self) -> bool {
        self.lock().lru.is_some()
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    // == Stats ==
    pub fn stats(&self) -> CacheStats {
        match self.lock().lru.as_ref() {
            Some(lru) => lru.stats(),
            None => CacheStats {
                max_bytes: self.max_bytes,
                ..CacheStats::default()
            },
        }
    }
}
