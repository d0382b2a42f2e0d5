//! Cache Statistics Module
//!
//! Tracks lookup results and the fate of expiration watchers.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

// == Cache Stats ==
/// Point-in-time snapshot of cache metrics.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheStats {
    /// Number of successful lookups
    pub hits: u64,
    /// Number of lookups that found nothing
    pub misses: u64,
    /// Number of writes
    pub sets: u64,
    /// Entries deleted by their watcher
    pub expirations: u64,
    /// Watchers that fired after a newer write took over their key
    pub superseded_watchers: u64,
    /// Watchers that exited because expiration was stopped
    pub cancelled_watchers: u64,
    /// Current number of entries in the cache
    pub total_entries: usize,
    /// Watchers still waiting for their deadline
    pub pending_watchers: usize,
    /// Whether expiration has been stopped
    pub expiration_stopped: bool,
}

impl CacheStats {
    // == Hit Rate ==
    /// Calculates the cache hit rate.
    ///
    /// Returns hits / (hits + misses), or 0.0 if no requests have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

// == Cache Counters ==
/// Lock-free counters shared by the cache and its watchers.
///
/// Lookups only hold the shared lock, so counting cannot rely on `&mut`.
#[derive(Debug, Default)]
pub struct CacheCounters {
    hits: AtomicU64,
    misses: AtomicU64,
    sets: AtomicU64,
    expirations: AtomicU64,
    superseded: AtomicU64,
    cancelled: AtomicU64,
}

impl CacheCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_set(&self) {
        self.sets.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_expiration(&self) {
        self.expirations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_superseded(&self) {
        self.superseded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cancelled(&self) {
        self.cancelled.fetch_add(1, Ordering::Relaxed);
    }

    // == Snapshot ==
    /// Copies the counters into a [`CacheStats`]. Gauges are left at their
    /// defaults for the caller to fill in.
    pub fn snapshot(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            sets: self.sets.load(Ordering::Relaxed),
            expirations: self.expirations.load(Ordering::Relaxed),
            superseded_watchers: self.superseded.load(Ordering::Relaxed),
            cancelled_watchers: self.cancelled.load(Ordering::Relaxed),
            ..CacheStats::default()
        }
    }
}
