use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;

/// One cached response. Only the recency stamp changes after insertion.
#[derive(Debug)]
pub(crate) struct CacheEntry {
    pub(crate) payload: Bytes,
    /// Insertion order; breaks ties between equal stamps.
    pub(crate) seq: u64,
    last_used: AtomicU64,
}

impl CacheEntry {
    pub(crate) fn new(payload: Bytes, seq: u64, stamp: u64) -> Self {
        Self {
            payload,
            seq,
            last_used: AtomicU64::new(stamp),
        }
    }

    pub(crate) fn size(&self) -> usize {
        self.payload.len()
    }

    /// Safe under a shared lock: stamps only ever move forward.
    pub(crate) fn touch(&self, stamp: u64) {
        self.last_used.fetch_max(stamp, Ordering::Relaxed);
    }

    /// Ordering key for eviction, oldest first.
    pub(crate) fn recency(&self) -> (u64, u64) {
        (self.last_used.load(Ordering::Relaxed), self.seq)
    }
}
