//! Cache Store Module
//!
//! Plain key-value storage with per-write generations. Callers provide the
//! locking; the store itself is not thread-safe.

use std::collections::HashMap;

use crate::cache::CacheEntry;

// == Removal Outcome ==
/// Result of a watcher-driven removal attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removal {
    /// The entry was deleted
    Removed,
    /// A later write owns the key; nothing was deleted
    Superseded,
    /// The key was not present
    Missing,
}

// == Cache Store ==
/// Key-value storage for the TTL cache.
#[derive(Debug)]
pub struct CacheStore<V> {
    /// Key-value storage
    entries: HashMap<String, CacheEntry<V>>,
    /// Generation handed to the next write
    next_generation: u64,
}

impl<V> Default for CacheStore<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> CacheStore<V> {
    // == Constructor ==
    /// Creates an empty store.
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            next_generation: 1,
        }
    }

    // == Insert ==
    /// Stores a key-value pair, replacing any previous value.
    ///
    /// Returns the generation assigned to this write. Generations strictly
    /// increase across the whole store.
    pub fn insert(&mut self, key: String, value: V) -> u64 {
        let generation = self.next_generation;
        self.next_generation += 1;
        self.entries.insert(key, CacheEntry::new(value, generation));
        generation
    }

    // == Get ==
    /// Looks up the entry for a key. Never mutates.
    pub fn get(&self, key: &str) -> Option<&CacheEntry<V>> {
        self.entries.get(key)
    }

    // == Contains ==
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    // == Remove ==
    /// Removes a key regardless of which write produced it.
    pub fn remove(&mut self, key: &str) -> Removal {
        match self.entries.remove(key) {
            Some(_) => Removal::Removed,
            None => Removal::Missing,
        }
    }

    // == Remove If Generation ==
    /// Removes a key only while it still holds the value of `generation`.
    pub fn remove_if_generation(&mut self, key: &str, generation: u64) -> Removal {
        match self.entries.get(key) {
            Some(entry) if entry.is_generation(generation) => {
                self.entries.remove(key);
                Removal::Removed
            }
            Some(_) => Removal::Superseded,
            None => Removal::Missing,
        }
    }

    // == Length ==
    /// Returns the current number of entries in the store.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    // == Is Empty ==
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
