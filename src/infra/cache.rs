//! Caching layer for read-heavy catalog projections.
//!
//! A small LRU cache with TTL, owned by the caller and passed into the
//! services that use it (never a module-level singleton). Writers call the
//! invalidation hooks; stale entries also age out via the TTL.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

// ============================================================================
// LRU Cache
// ============================================================================

/// A simple LRU cache with TTL support.
pub struct LruCache<K, V> {
    /// Maximum number of entries
    max_entries: usize,
    /// Time-to-live for entries
    ttl: Duration,
    /// The cache entries
    entries: RwLock<HashMap<K, CacheEntry<V>>>,
    /// Cache statistics
    stats: CacheStats,
}

struct CacheEntry<V> {
    value: V,
    created_at: Instant,
    last_accessed: Instant,
}

/// Cache statistics.
#[derive(Default)]
pub struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    invalidations: AtomicU64,
}

impl CacheStats {
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    pub fn evictions(&self) -> u64 {
        self.evictions.load(Ordering::Relaxed)
    }

    pub fn invalidations(&self) -> u64 {
        self.invalidations.load(Ordering::Relaxed)
    }

    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits() as f64;
        let total = hits + self.misses() as f64;
        if total > 0.0 {
            hits / total
        } else {
            0.0
        }
    }
}

impl<K, V> LruCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Create a cache with the given capacity and TTL.
    pub fn new(max_entries: usize, ttl: Duration) -> Self {
        Self {
            max_entries,
            ttl,
            entries: RwLock::new(HashMap::new()),
            stats: CacheStats::default(),
        }
    }

    /// Get a value, refreshing its recency. Expired entries count as misses.
    pub async fn get(&self, key: &K) -> Option<V> {
        let mut entries = self.entries.write().await;
        match entries.get_mut(key) {
            Some(entry) if entry.created_at.elapsed() < self.ttl => {
                entry.last_accessed = Instant::now();
                self.stats.hits.fetch_add(1, Ordering::Relaxed);
                Some(entry.value.clone())
            }
            Some(_) => {
                entries.remove(key);
                self.stats.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
            None => {
                self.stats.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Insert a value, evicting the least recently used entry at capacity.
    pub async fn insert(&self, key: K, value: V) {
        let mut entries = self.entries.write().await;
        if entries.len() >= self.max_entries && !entries.contains_key(&key) {
            if let Some(lru_key) = entries
                .iter()
                .min_by_key(|(_, e)| e.last_accessed)
                .map(|(k, _)| k.clone())
            {
                entries.remove(&lru_key);
                self.stats.evictions.fetch_add(1, Ordering::Relaxed);
            }
        }
        let now = Instant::now();
        entries.insert(
            key,
            CacheEntry {
                value,
                created_at: now,
                last_accessed: now,
            },
        );
    }

    /// Invalidation hook for a single key.
    pub async fn invalidate(&self, key: &K) {
        let mut entries = self.entries.write().await;
        if entries.remove(key).is_some() {
            self.stats.invalidations.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Invalidation hook for everything (stock mutations touch aggregates).
    pub async fn invalidate_all(&self) {
        let mut entries = self.entries.write().await;
        let n = entries.len() as u64;
        entries.clear();
        self.stats.invalidations.fetch_add(n, Ordering::Relaxed);
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn get_after_insert_hits() {
        let cache: LruCache<&str, i64> = LruCache::new(4, Duration::from_secs(60));
        cache.insert("a", 1).await;
        assert_eq!(cache.get(&"a").await, Some(1));
        assert_eq!(cache.stats().hits(), 1);
    }

    #[tokio::test]
    async fn expired_entry_is_a_miss() {
        let cache: LruCache<&str, i64> = LruCache::new(4, Duration::from_millis(0));
        cache.insert("a", 1).await;
        assert_eq!(cache.get(&"a").await, None);
        assert_eq!(cache.stats().misses(), 1);
    }

    #[tokio::test]
    async fn capacity_evicts_least_recently_used() {
        let cache: LruCache<&str, i64> = LruCache::new(2, Duration::from_secs(60));
        cache.insert("a", 1).await;
        cache.insert("b", 2).await;
        let _ = cache.get(&"a").await;
        cache.insert("c", 3).await;
        assert_eq!(cache.get(&"b").await, None);
        assert_eq!(cache.get(&"a").await, Some(1));
        assert_eq!(cache.stats().evictions(), 1);
    }

    #[tokio::test]
    async fn invalidate_all_clears() {
        let cache: LruCache<&str, i64> = LruCache::new(4, Duration::from_secs(60));
        cache.insert("a", 1).await;
        cache.insert("b", 2).await;
        cache.invalidate_all().await;
        assert!(cache.is_empty().await);
        assert_eq!(cache.stats().invalidations(), 2);
    }
}
