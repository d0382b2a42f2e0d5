//! Background Tasks Module
//!
//! Contains the tasks spawned by the cache while it is in use.
//!
//! # Tasks
//! - Expiration watcher: deletes one written entry once its TTL has elapsed

mod watcher;

pub use watcher::{
    drain_watchers, reap_finished, spawn_watcher, ExpirationWatcher, WatchOutcome,
};
