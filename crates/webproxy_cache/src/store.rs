use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use bytes::Bytes;
use tracing::{debug, trace};
use webproxy_config::CacheLimits;

use crate::entry::CacheEntry;
use crate::policy;
use crate::stats::{CacheStats, Counters};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOutcome {
    /// Inserted as most recently used after evicting `evicted` entries.
    Stored { evicted: usize },
    /// Larger than the per-object ceiling; cache left untouched.
    TooLarge,
    /// Another writer got there first; the live entry is kept.
    AlreadyPresent,
}

#[derive(Debug, Default)]
struct CacheInner {
    entries: HashMap<String, CacheEntry>,
    current_size: usize,
    next_seq: u64,
}

impl CacheInner {
    /// Caller holds the write lock.
    fn evict_lru(&mut self) -> Option<(String, usize)> {
        let key = self
            .entries
            .iter()
            .min_by_key(|(_, entry)| entry.recency())
            .map(|(key, _)| key.clone())?;
        let entry = self.entries.remove(&key)?;
        self.current_size -= entry.size();
        Some((key, entry.size()))
    }
}

/// =======================================================
/// OBJECT CACHE
/// =======================================================
///
/// Shared between every connection worker behind an `Arc`.
///
/// - `find` takes the read lock, so lookups run side by side.
///   A hit bumps the entry's atomic recency stamp and clones the
///   payload handle before the lock is released.
/// - `store` / `evict_one` take the write lock, so an entry is never
///   seen half inserted or half removed.
///
/// Invariant after every mutation: `current_size <= max_cache_size`.
#[derive(Debug)]
pub struct ObjectCache {
    limits: CacheLimits,
    inner: RwLock<CacheInner>,
    clock: AtomicU64,
    counters: Counters,
}

impl Default for ObjectCache {
    fn default() -> Self {
        Self::new(CacheLimits::default())
    }
}

impl ObjectCache {
    pub fn new(limits: CacheLimits) -> Self {
        Self {
            limits,
            inner: RwLock::new(CacheInner::default()),
            clock: AtomicU64::new(0),
            counters: Counters::default(),
        }
    }

    pub fn limits(&self) -> CacheLimits {
        self.limits
    }

    fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::Relaxed) + 1
    }

    // Every mutation leaves the map and size consistent before anything
    // that could panic, so a poisoned lock is still usable.
    fn read(&self) -> RwLockReadGuard<'_, CacheInner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, CacheInner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Looks up `key`, marking it most recently used on a hit.
    pub fn find(&self, key: &str) -> Option<Bytes> {
        let inner = self.read();
        match inner.entries.get(key) {
            Some(entry) => {
                entry.touch(self.tick());
                let payload = entry.payload.clone();
                drop(inner);
                self.counters.hit();
                trace!(target: "webproxy::cache", cache_key = %key, size = payload.len(), "Cache hit");
                Some(payload)
            }
            None => {
                drop(inner);
                self.counters.miss();
                trace!(target: "webproxy::cache", cache_key = %key, "Cache miss");
                None
            }
        }
    }

    /// Inserts `payload` under `key`, evicting LRU entries until it fits.
    pub fn store(&self, key: &str, payload: Bytes) -> StoreOutcome {
        let size = payload.len();
        if !policy::admits(&self.limits, size) {
            debug!(
                target: "webproxy::cache",
                cache_key = %key,
                size,
                max_object_size = self.limits.max_object_size(),
                "Object too large to cache"
            );
            return StoreOutcome::TooLarge;
        }

        let mut inner = self.write();
        if inner.entries.contains_key(key) {
            debug!(target: "webproxy::cache", cache_key = %key, "Already cached; keeping first copy");
            return StoreOutcome::AlreadyPresent;
        }

        let mut evicted = 0;
        while !policy::fits(&self.limits, inner.current_size, size) {
            let Some((old_key, old_size)) = inner.evict_lru() else {
                break;
            };
            evicted += 1;
            self.counters.evicted();
            debug!(
                target: "webproxy::cache",
                evicted_key = %old_key,
                evicted_size = old_size,
                "Evicted least recently used object"
            );
        }

        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner
            .entries
            .insert(key.to_string(), CacheEntry::new(payload, seq, self.tick()));
        inner.current_size += size;
        let current_size = inner.current_size;
        drop(inner);

        self.counters.stored();
        debug!(
            target: "webproxy::cache",
            cache_key = %key,
            size,
            current_size,
            evicted,
            "Stored object"
        );

        StoreOutcome::Stored { evicted }
    }

    /// Removes the least recently used entry and returns its key.
    pub fn evict_one(&self) -> Option<String> {
        let (key, size) = self.write().evict_lru()?;
        self.counters.evicted();
        debug!(
            target: "webproxy::cache",
            evicted_key = %key,
            evicted_size = size,
            "Evicted least recently used object"
        );
        Some(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.read().entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn current_size(&self) -> usize {
        self.read().current_size
    }

    pub fn stats(&self) -> CacheStats {
        let inner = self.read();
        CacheStats::from_counters(&self.counters, inner.entries.len(), inner.current_size)
    }
}
