//! Eviction engine counters.

use serde::Serialize;

// == Cache Stats ==
/// Point-in-time view of one engine: lookup outcomes plus byte usage.
///
/// The engine owns the counters; `total_entries`, `used_bytes` and
/// `max_bytes` are filled in when the snapshot is taken.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Entries dropped to get back under `max_bytes`. Explicit removals
    /// are not counted.
    pub evictions: u64,
    pub total_entries: usize,
    /// Sum of key length plus value size over live entries
    pub used_bytes: usize,
    /// 0 means unbounded
    pub max_bytes: usize,
}

impl CacheStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lookups seen so far.
    pub fn lookups(&self) -> u64 {
        self.hits + self.misses
    }

    /// hits / lookups, 0.0 before the first lookup.
    pub fn hit_rate(&self) -> f64 {
        match self.lookups() {
            0 => 0.0,
            n => self.hits as f64 / n as f64,
        }
    }

    /// Share of the byte budget in use. Always 0.0 for an unbounded engine.
    pub fn fill_ratio(&self) -> f64 {
        if self.max_bytes == 0 {
            return 0.0;
        }
        self.used_bytes as f64 / self.max_bytes as f64
    }

    pub(crate) fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub(crate) fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub(crate) fn record_eviction(&mut self) {
        self.evictions += 1;
    }
}
