//! TTL Cache - An in-process key-value cache with automatic expiration
//!
//! Every write arms a watcher task that removes the entry after a fixed TTL.
//! Expiration can be switched off for the whole cache at any time.

pub mod cache;
pub mod config;
pub mod error;
pub mod tasks;

pub use cache::{CacheStats, TtlCache};
pub use config::{Config, OverwritePolicy};
pub use error::{CacheError, Result};
