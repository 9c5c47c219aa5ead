//! LruCache: thread-safe wrapper around the LRU list

use std::borrow::Borrow;
use std::fmt;
use std::hash::Hash;
use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::config::CacheConfig;
use crate::error::Result;
use crate::lru::{LruList, PutOutcome};
use crate::stats::CacheStats;

/// Fixed-capacity LRU cache safe to share between threads
///
/// The index and the recency list sit behind one mutex and every operation
/// holds it for its whole duration, so each call is linearized against every
/// other. Share an instance with `Arc<LruCache<K, V>>`.
pub struct LruCache<K, V> {
    /// Index + recency list, always updated together
    inner: Mutex<LruList<K, V>>,

    /// Cache statistics
    stats: CacheStats,

    /// Cache capacity
    capacity: usize,
}

impl<K, V> LruCache<K, V>
where
    K: Hash + Eq + Clone,
{
    /// Create a new cache holding at most `capacity` entries
    ///
    /// A capacity of 0 is allowed: every write is dropped and every read
    /// misses.
    pub fn new(capacity: usize) -> Self {
        Self::with_config(CacheConfig::new(capacity))
    }

    /// Create a new cache from a signed capacity
    ///
    /// # Returns
    /// * `Err(Error::InvalidCapacity)` - if `capacity` is negative
    /// * `Err(Error::CapacityTooLarge)` - if `capacity` overflows `usize`
    pub fn try_new(capacity: i64) -> Result<Self> {
        CacheConfig::from_signed(capacity).map(Self::with_config)
    }

    /// Create a new cache from a validated config
    pub fn with_config(config: CacheConfig) -> Self {
        debug!(capacity = config.capacity, "creating LRU cache");

        Self {
            inner: Mutex::new(LruList::new(config.capacity)),
            stats: CacheStats::new(),
            capacity: config.capacity,
        }
    }

    /// Get a copy of a value, marking the key as most recently used
    ///
    /// # Arguments
    /// * `key` - Key to look up
    ///
    /// # Returns
    /// * `Option<V>` - The value, or `None` if the key is absent
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        V: Clone,
    {
        let value = self.inner.lock().get(key).cloned();

        if value.is_some() {
            self.stats.record_hit();
        } else {
            self.stats.record_miss();
        }
        value
    }

    /// Insert or overwrite a value, marking the key as most recently used
    ///
    /// Evicts the least recently used entry if the insert pushes the cache
    /// past capacity. Does nothing when capacity is 0.
    pub fn set(&self, key: K, value: V) {
        let _ = self.put(key, value);
    }

    /// Same as [`set`](Self::set) but hands back the evicted entry, if any
    pub fn put(&self, key: K, value: V) -> Option<(K, V)> {
        let outcome = self.inner.lock().put(key, value);

        match outcome {
            PutOutcome::Inserted => {
                self.stats.record_insert();
                None
            }
            PutOutcome::Updated(_previous) => {
                self.stats.record_update();
                None
            }
            PutOutcome::Evicted(key, value) => {
                self.stats.record_insert();
                self.stats.record_eviction();
                trace!(capacity = self.capacity, "evicted least recently used entry");
                Some((key, value))
            }
            PutOutcome::Rejected => {
                trace!("capacity is 0, write dropped");
                None
            }
        }
    }

    /// Get a copy of a value without changing its recency
    pub fn peek<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        V: Clone,
    {
        self.inner.lock().peek(key).cloned()
    }

    /// Check whether a key is cached, without changing its recency
    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.inner.lock().contains(key)
    }

    /// Remove a key from the cache
    ///
    /// # Returns
    /// * `Option<V>` - The removed value, or `None` if the key was absent
    pub fn remove<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let removed = self.inner.lock().remove(key);

        removed.map(|(_, value)| {
            self.stats.record_removal();
            value
        })
    }

    /// Get current number of entries
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// Check if the cache is empty
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Get cache capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Drop every entry (statistics are kept)
    pub fn clear(&self) {
        let drained = {
            let mut inner = self.inner.lock();
            let len = inner.len();
            inner.clear();
            len
        };
        debug!(entries = drained, "cache cleared");
    }

    /// Snapshot of the cached keys, most recently used first
    pub fn keys(&self) -> Vec<K> {
        self.inner.lock().iter().map(|(k, _)| k.clone()).collect()
    }

    /// Get cache statistics
    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    /// Verify the index and recency list agree
    ///
    /// Walks the recency list both ways and checks it against the index and
    /// the slot arena, returning the first broken invariant.
    pub fn check_invariants(&self) -> Result<()> {
        self.inner.lock().check_invariants()
    }
}

impl<K, V> fmt::Debug for LruCache<K, V>
where
    K: Hash + Eq + Clone,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LruCache")
            .field("capacity", &self.capacity)
            .field("len", &self.len())
            .field("stats", &self.stats.snapshot())
            .finish()
    }
}
