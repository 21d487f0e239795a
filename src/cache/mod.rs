// Bounded response cache
//
// In-memory key -> value store with per-entry expiry and least-recently-used
// eviction. Holds short-lived query results (assignment statistics, file
// listing pages) so repeated dashboard requests do not rescan the store.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use indexmap::IndexMap;
use parking_lot::Mutex;
use serde::Serialize;

/// Default maximum number of live entries
pub const DEFAULT_CAPACITY: usize = 250;

/// Separator between the resource name and filter values in a cache key
pub const KEY_SEPARATOR: char = ':';

/// Builds a deterministic, namespaced cache key
///
/// The resource name comes first, followed by every present filter value in
/// the given order. `None` values are skipped, so the same query always maps
/// to the same key.
///
/// # Example
/// ```
/// use docdesk_api::cache::cache_key;
///
/// let key = cache_key("files", &[Some("paid"), None, Some("2")]);
/// assert_eq!(key, "files:paid:2");
/// ```
pub fn cache_key(resource: &str, filters: &[Option<&str>]) -> String {
    let mut key = resource.to_string();
    for value in filters.iter().flatten() {
        key.push(KEY_SEPARATOR);
        key.push_str(value);
    }
    key
}

struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Point-in-time view of cache counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub capacity: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

impl CacheStats {
    /// Hit rate in 0.0..=1.0, or 0.0 before any lookup
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Bounded TTL cache with LRU eviction
///
/// Entries are kept in an `IndexMap` ordered from least to most recently
/// used. Every successful `get` and every `set` moves the key to the back;
/// eviction pops from the front.
///
/// The cache is never a durability layer: a miss must always be recoverable
/// by recomputing from the store. Structural mutations are serialized by a
/// mutex, but eviction order under concurrent callers is best-effort.
///
/// # Example
/// ```
/// use std::time::Duration;
/// use docdesk_api::cache::ResponseCache;
///
/// let cache: ResponseCache<u32> = ResponseCache::new(2);
/// cache.set("assign:stats", 7, Duration::from_secs(30));
/// assert_eq!(cache.get("assign:stats"), Some(7));
/// ```
pub struct ResponseCache<V = serde_json::Value> {
    entries: Mutex<IndexMap<String, CacheEntry<V>>>,
    capacity: usize,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl<V: Clone> ResponseCache<V> {
    /// Creates an empty cache holding at most `capacity` live entries
    ///
    /// A capacity of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(IndexMap::new()),
            capacity: capacity.max(1),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// Returns the configured capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Looks up a key, treating expired entries as misses
    pub fn get(&self, key: &str) -> Option<V> {
        self.get_at(key, Instant::now())
    }

    /// Stores a value that expires `ttl` from now
    pub fn set(&self, key: impl Into<String>, value: V, ttl: Duration) {
        self.set_at(key.into(), value, ttl, Instant::now());
    }

    /// Removes a key; no-op if absent
    pub fn delete(&self, key: &str) -> bool {
        self.entries.lock().shift_remove(key).is_some()
    }

    /// Removes every key starting with `prefix` and returns how many were dropped
    pub fn delete_by_prefix(&self, prefix: &str) -> usize {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|key, _| !key.starts_with(prefix));
        before - entries.len()
    }

    /// Drops every entry
    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    /// Number of stored entries, including ones that expired but were not yet touched
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns true if the key is physically stored, without touching recency or expiry
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.lock().contains_key(key)
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.len(),
            capacity: self.capacity,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }

    pub(crate) fn get_at(&self, key: &str, now: Instant) -> Option<V> {
        let mut entries = self.entries.lock();
        let Some(idx) = entries.get_index_of(key) else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            return None;
        };

        let value = match entries.get_index(idx) {
            Some((_, entry)) if !entry.is_expired(now) => entry.value.clone(),
            _ => {
                // Lazy expiry: the lookup itself evicts the stale entry
                entries.shift_remove_index(idx);
                self.misses.fetch_add(1, Ordering::Relaxed);
                return None;
            }
        };

        let last = entries.len() - 1;
        entries.move_index(idx, last);
        self.hits.fetch_add(1, Ordering::Relaxed);
        Some(value)
    }

    pub(crate) fn set_at(&self, key: String, value: V, ttl: Duration, now: Instant) {
        let entry = CacheEntry {
            value,
            expires_at: now + ttl,
        };

        let mut entries = self.entries.lock();
        // shift_remove + insert puts the key at the most-recently-used end
        entries.shift_remove(&key);
        entries.insert(key, entry);

        while entries.len() > self.capacity {
            if entries.shift_remove_index(0).is_none() {
                break;
            }
            self.evictions.fetch_add(1, Ordering::Relaxed);
        }
    }
}

impl<V: Clone> Default for ResponseCache<V> {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl<V> std::fmt::Debug for ResponseCache<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseCache")
            .field("entries", &self.entries.lock().len())
            .field("capacity", &self.capacity)
            .finish()
    }
}
