//! Bounded in-process caches for content reads and analysis payloads.

use std::hash::Hash;
use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard, PoisonError};

use lru::LruCache;

/// At-most-N map with insertion-order eviction.
///
/// Lookups use `peek`, so reading an entry never extends its lifetime and
/// the entry evicted on overflow is always the oldest inserted. Insert and
/// eviction happen under one lock acquisition. A zero capacity disables
/// the cache.
pub struct BoundedCache<K: Hash + Eq, V: Clone> {
    inner: Option<Mutex<LruCache<K, V>>>,
}

impl<K: Hash + Eq + Clone, V: Clone> BoundedCache<K, V> {
    /// Create a cache holding at most `capacity` entries.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: NonZeroUsize::new(capacity).map(|cap| Mutex::new(LruCache::new(cap))),
        }
    }

    fn lock(cache: &Mutex<LruCache<K, V>>) -> MutexGuard<'_, LruCache<K, V>> {
        cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Cached value for `key`.
    pub fn get(&self, key: &K) -> Option<V> {
        self.inner.as_ref().and_then(|c| Self::lock(c).peek(key).cloned())
    }

    /// Insert a value, evicting the oldest entry if full.
    ///
    /// Returns the evicted key, if any.
    pub fn insert(&self, key: K, value: V) -> Option<K> {
        let cache = self.inner.as_ref()?;
        let mut guard = Self::lock(cache);
        guard.push(key.clone(), value).map(|(evicted, _)| evicted).filter(|evicted| *evicted != key)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.inner.as_ref().map_or(0, |c| Self::lock(c).len())
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of entries.
    pub fn capacity(&self) -> usize {
        self.inner.as_ref().map_or(0, |c| Self::lock(c).cap().get())
    }

    /// Keys from oldest to newest.
    pub fn keys(&self) -> Vec<K> {
        self.inner.as_ref().map_or_else(Vec::new, |c| {
            Self::lock(c).iter().rev().map(|(k, _)| k.clone()).collect()
        })
    }

    /// Remove every entry.
    pub fn clear(&self) {
        if let Some(cache) = &self.inner {
            Self::lock(cache).clear();
        }
    }
}

impl<K: Hash + Eq, V: Clone> std::fmt::Debug for BoundedCache<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundedCache").field("enabled", &self.inner.is_some()).finish()
    }
}
