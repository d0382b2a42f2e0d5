//! Cache Module
//!
//! Provides the in-process key-value cache with per-write TTL expiration.

mod entry;
mod stats;
mod store;
mod ttl_cache;


// Re-export public types
pub use entry::CacheEntry;
pub use stats::{CacheCounters, CacheStats};
pub use store::{CacheStore, Removal};
pub use ttl_cache::TtlCache;
