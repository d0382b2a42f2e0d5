//! Cache Entry Module
//!
//! Defines the structure for individual cache entries.

// == Cache Entry ==
/// Represents a single cache entry with value and metadata.
///
/// The entry does not carry a deadline. Expiry is enforced by the watcher
/// armed for its `generation`.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    /// The stored value
    pub value: V,
    /// Write number that produced this entry, unique per store
    pub generation: u64,
}

impl<V> CacheEntry<V> {
    // == Constructor ==
    /// Creates a new cache entry for the given write.
    pub fn new(value: V, generation: u64) -> Self {
        Self { value, generation }
    }

    /// Returns true if this entry was produced by the given write.
    pub fn is_generation(&self, generation: u64) -> bool {
        self.generation == generation
    }
}
