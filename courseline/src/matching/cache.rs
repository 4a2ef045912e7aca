//! Bounded cache of map-matching results.
//!
//! Keyed by the `"lat,lon"` string of the raw point. When the cache grows
//! past its maximum it drops the oldest insertions in one batch. This is
//! truncation by insertion age, not LRU: a hit does not refresh an entry.
//!
//! The cache is the only state shared between navigation sessions. Inserts
//! and evictions are serialized by a single mutex; statistics are atomics
//! so reading them never contends with writers.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tracing::debug;

use super::config::{DEFAULT_CACHE_EVICT_COUNT, DEFAULT_CACHE_MAX_ENTRIES};
use super::types::MatchedLocation;
use crate::geo::GeoPoint;

/// Cache key for a raw point.
pub fn cache_key(point: GeoPoint) -> String {
    point.to_string()
}

/// Snapshot of cache statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

impl CacheStats {
    /// Fraction of lookups served from the cache.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

struct Entries {
    map: HashMap<String, MatchedLocation>,
    /// Keys in insertion order, oldest first.
    order: VecDeque<String>,
}

/// Bounded map-matching cache.
pub struct MatchCache {
    entries: Mutex<Entries>,
    max_entries: usize,
    evict_count: usize,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl Default for MatchCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_MAX_ENTRIES, DEFAULT_CACHE_EVICT_COUNT)
    }
}

impl MatchCache {
    /// Create a cache that evicts `evict_count` entries once it holds more
    /// than `max_entries`.
    pub fn new(max_entries: usize, evict_count: usize) -> Self {
        Self {
            entries: Mutex::new(Entries {
                map: HashMap::new(),
                order: VecDeque::new(),
            }),
            max_entries,
            evict_count: evict_count.max(1),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// Look up the match for a raw point.
    pub fn get(&self, point: GeoPoint) -> Option<MatchedLocation> {
        let found = self.entries.lock().map.get(&cache_key(point)).cloned();
        if found.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
        found
    }

    /// Store the match for a raw point.
    pub fn insert(&self, point: GeoPoint, matched: MatchedLocation) {
        let key = cache_key(point);
        let mut guard = self.entries.lock();
        let entries = &mut *guard;

        if entries.map.insert(key.clone(), matched).is_none() {
            entries.order.push_back(key);
        }

        if entries.map.len() > self.max_entries {
            let count = self.evict_count.min(entries.order.len());
            for old in entries.order.drain(..count) {
                entries.map.remove(&old);
            }
            self.evictions.fetch_add(count as u64, Ordering::Relaxed);
            debug!(
                evicted = count,
                remaining = entries.map.len(),
                "Match cache truncated"
            );
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        let mut entries = self.entries.lock();
        entries.map.clear();
        entries.order.clear();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::LocationFix;
    use std::sync::Arc;

    fn point(i: usize) -> GeoPoint {
        GeoPoint::new(10.0 + i as f64 * 1e-4, 20.0)
    }

    fn matched(p: GeoPoint) -> MatchedLocation {
        MatchedLocation::unmatched(LocationFix::at(p))
    }

    #[test]
    fn test_get_and_stats() {
        let cache = MatchCache::default();
        assert!(cache.get(point(1)).is_none());

        cache.insert(point(1), matched(point(1)));
        assert_eq!(cache.get(point(1)).unwrap().snapped, point(1));

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.entries, 1);
        assert_eq!(stats.hit_rate(), 0.5);
    }

    #[test]
    fn test_overflow_keeps_at_most_501() {
        let cache = MatchCache::default();
        for i in 0..1001 {
            cache.insert(point(i), matched(point(i)));
        }
        assert!(cache.len() <= 501);
        assert_eq!(cache.stats().evictions, 500);

        // Oldest went first
        assert!(cache.get(point(0)).is_none());
        assert!(cache.get(point(1000)).is_some());
    }

    #[test]
    fn test_reinsert_does_not_grow() {
        let cache = MatchCache::new(2, 1);
        cache.insert(point(1), matched(point(1)));
        cache.insert(point(1), matched(point(2)));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(point(1)).unwrap().snapped, point(2));
    }

    #[test]
    fn test_concurrent_inserts_stay_bounded() {
        let cache = Arc::new(MatchCache::new(100, 50));
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || {
                    for i in 0..500 {
                        let p = point(t * 1000 + i);
                        cache.insert(p, matched(p));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert!(cache.len() <= 100);
    }

    #[test]
    fn test_clear() {
        let cache = MatchCache::default();
        cache.insert(point(1), matched(point(1)));
        cache.clear();
        assert!(cache.is_empty());
    }
}
