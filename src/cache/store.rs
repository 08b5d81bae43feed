//! Cache Store Module
//!
//! Byte-bounded LRU engine combining a HashMap index with the LRU tracker.

use std::collections::HashMap;
use std::fmt;

use crate::cache::{CacheStats, LruTracker, NodeId, SizedValue};

/// Observer invoked with every entry that leaves the cache through
/// eviction or [`LruCache::remove`].
///
/// Runs while the owning cache is borrowed mutably (and, inside
/// [`ConcurrentCache`](crate::cache::ConcurrentCache), while its lock is
/// held). It must not call back into the same cache.
pub type EvictionCallback<V> = Box<dyn Fn(&str, &V) + Send + Sync>;

struct Slot<V> {
    value: V,
    node: NodeId,
}

// == LRU Cache ==
/// Key-value store bounded by total bytes, evicting least recently used
/// entries on overflow.
///
/// Each entry is charged `key.len() + value.size()` bytes. A capacity of 0
/// means unbounded.
pub struct LruCache<V: SizedValue> {
    /// Key-value storage
    entries: HashMap<String, Slot<V>>,
    /// LRU access tracker
    lru: LruTracker,
    /// Performance statistics
    stats: CacheStats,
    /// Maximum bytes allowed (0 = unbounded)
    max_bytes: usize,
    /// Bytes currently charged
    used_bytes: usize,
    on_evicted: Option<EvictionCallback<V>>,
}

impl<V: SizedValue> LruCache<V> {
    // == Constructor ==
    /// Creates a new LruCache holding at most `max_bytes` bytes.
    pub fn new(max_bytes: usize) -> Self {
        Self {
            entries: HashMap::new(),
            lru: LruTracker::new(),
            stats: CacheStats::new(),
            max_bytes,
            used_bytes: 0,
            on_evicted: None,
        }
    }

    /// Creates a cache that reports evicted and removed entries to `callback`.
    pub fn with_eviction_callback(max_bytes: usize, callback: EvictionCallback<V>) -> Self {
        let mut cache = Self::new(max_bytes);
        cache.on_evicted = Some(callback);
        cache
    }

    // == Get ==
    /// Looks up a key, marking it most recently used.
    pub fn get(&mut self, key: &str) -> Option<&V> {
        match self.entries.get(key) {
            Some(slot) => {
                self.lru.touch(slot.node);
                self.stats.record_hit();
                Some(&slot.value)
            }
            None => {
                self.stats.record_miss();
                None
            }
        }
    }

    /// Membership check that leaves recency and stats untouched.
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    // == Set ==
    /// Inserts or replaces a value, then evicts until within capacity.
    pub fn set(&mut self, key: impl Into<String>, value: V) {
        let key = key.into();
        match self.entries.get_mut(&key) {
            Some(slot) => {
                self.used_bytes = self.used_bytes + value.size() - slot.value.size();
                slot.value = value;
                self.lru.touch(slot.node);
            }
            None => {
                self.used_bytes += key.len() + value.size();
                let node = self.lru.push_front(key.clone());
                self.entries.insert(key, Slot { value, node });
            }
        }

        while self.max_bytes != 0 && self.used_bytes > self.max_bytes {
            if !self.remove_oldest() {
                break;
            }
        }
    }

    // == Remove ==
    /// Deletes an entry, reporting it to the eviction callback.
    ///
    /// Returns the removed value, if any.
    pub fn remove(&mut self, key: &str) -> Option<V> {
        let slot = self.entries.remove(key)?;
        self.lru.remove(slot.node);
        self.used_bytes -= key.len() + slot.value.size();
        if let Some(callback) = &self.on_evicted {
            callback(key, &slot.value);
        }
        Some(slot.value)
    }

    fn remove_oldest(&mut self) -> bool {
        let Some(key) = self.lru.evict_oldest() else {
            return false;
        };
        if let Some(slot) = self.entries.remove(&key) {
            self.used_bytes -= key.len() + slot.value.size();
            self.stats.record_eviction();
            if let Some(callback) = &self.on_evicted {
                callback(&key, &slot.value);
            }
        }
        true
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            total_entries: self.entries.len(),
            used_bytes: self.used_bytes,
            max_bytes: self.max_bytes,
            ..self.stats.clone()
        }
    }

    // == Length ==
    /// Returns the current number of entries in the cache.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Bytes currently charged against the capacity.
    pub fn used_bytes(&self) -> usize {
        self.used_bytes
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// Keys from most to least recently used.
    pub fn keys(&self) -> Vec<&str> {
        self.lru.keys()
    }

    #[cfg(test)]
    pub(crate) fn assert_consistent(&self) {
        assert_eq!(self.entries.len(), self.lru.len());
        let mut expected = 0;
        for key in self.lru.keys() {
            let slot = self.entries.get(key).expect("tracked key missing from index");
            expected += key.len() + slot.value.size();
        }
        assert_eq!(expected, self.used_bytes);
    }
}

impl<V: SizedValue> fmt::Debug for LruCache<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LruCache")
            .field("len", &self.entries.len())
            .field("used_bytes", &self.used_bytes)
            .field("max_bytes", &self.max_bytes)
            .finish()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_contains_does_not_touch() {
        let mut cache = LruCache::new(0);
        cache.set("a", "1".to_string());
        cache.set("b", "2".to_string());

        assert!(cache.contains("a"));
        assert!(!cache.contains("z"));
        assert_eq!(cache.keys(), vec!["b", "a"]);
        assert_eq!(cache.stats().lookups(), 0);
    }

    #[test]
    fn test_store_get() {
        let mut cache = LruCache::new(0);
        cache.set("1", "val1".to_string());

        assert_eq!(cache.get("1").map(String::as_str), Some("val1"));
        assert_eq!(cache.get("2"), None);
    }

    #[test]
    fn test_store_overwrite_adjusts_size() {
        let mut cache = LruCache::new(0);
        cache.set("k1", "val1".to_string());
        cache.set("k2", "val2".to_string());
        assert_eq!(cache.used_bytes(), 12);

        cache.set("k1", "longer-val".to_string());

        assert_eq!(cache.get("k1").map(String::as_str), Some("longer-val"));
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.used_bytes(), 18);
        cache.assert_consistent();
    }

    #[test]
    fn test_store_evicts_oldest() {
        let (k1, k2, k3) = ("k1", "k2", "k3");
        let (v1, v2, v3) = ("val1", "val2", "val3");
        let cap = k1.len() + k2.len() + v1.len() + v2.len();

        let mut cache = LruCache::new(cap);
        cache.set(k1, v1.to_string());
        cache.set(k2, v2.to_string());
        cache.set(k3, v3.to_string());

        assert!(cache.get(k1).is_none());
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn test_store_get_protects_from_eviction() {
        let mut cache = LruCache::new(12);
        cache.set("k1", "val1".to_string());
        cache.set("k2", "val2".to_string());

        // k1 becomes most recently used, so k2 goes first
        cache.get("k1");
        cache.set("k3", "val3".to_string());

        assert!(cache.get("k1").is_some());
        assert!(cache.get("k2").is_none());
    }

    #[test]
    fn test_store_eviction_callback() {
        let evicted = Arc::new(Mutex::new(Vec::new()));
        let sink = evicted.clone();
        let mut cache = LruCache::with_eviction_callback(
            10,
            Box::new(move |key: &str, _: &String| sink.lock().unwrap().push(key.to_string())),
        );

        cache.set("key1", "123456".to_string());
        cache.set("k2", "k2".to_string());
        cache.set("k3", "k3".to_string());
        cache.set("k4", "k4".to_string());

        assert_eq!(*evicted.lock().unwrap(), vec!["key1", "k2"]);
    }

    #[test]
    fn test_store_remove_invokes_callback() {
        let evicted = Arc::new(Mutex::new(Vec::new()));
        let sink = evicted.clone();
        let mut cache = LruCache::with_eviction_callback(
            0,
            Box::new(move |key: &str, value: &String| {
                sink.lock().unwrap().push(format!("{}={}", key, value))
            }),
        );

        cache.set("a", "1".to_string());
        assert_eq!(cache.remove("a"), Some("1".to_string()));
        assert_eq!(cache.remove("a"), None);

        assert!(cache.is_empty());
        assert_eq!(cache.used_bytes(), 0);
        assert_eq!(*evicted.lock().unwrap(), vec!["a=1"]);
        // explicit removal is not an eviction
        assert_eq!(cache.stats().evictions, 0);
    }

    #[test]
    fn test_store_unbounded_never_evicts() {
        let mut cache = LruCache::new(0);
        for i in 0..1000 {
            cache.set(format!("key{}", i), "x".repeat(100));
        }

        assert_eq!(cache.len(), 1000);
        assert_eq!(cache.stats().evictions, 0);
    }

    #[test]
    fn test_store_oversized_entry_is_dropped() {
        let mut cache = LruCache::new(8);
        cache.set("big", "way too large".to_string());

        assert!(cache.is_empty());
        assert_eq!(cache.used_bytes(), 0);
    }

    #[test]
    fn test_store_stats() {
        let mut cache = LruCache::new(100);

        cache.set("key1", "value1".to_string());
        cache.get("key1"); // hit
        cache.get("nonexistent"); // miss

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.total_entries, 1);
        assert_eq!(stats.used_bytes, 10);
        assert_eq!(stats.max_bytes, 100);
    }
}
