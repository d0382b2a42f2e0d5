//! TTL Cache Module
//!
//! The public cache: a locked store, a fixed TTL, a one-way stop signal and
//! the registry of pending expiration watchers.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::{watch, RwLock};
use tokio::task::JoinSet;
use tracing::{debug, info, trace};

use crate::cache::{CacheCounters, CacheStats, CacheStore};
use crate::config::{Config, OverwritePolicy};
use crate::error::{CacheError, Result};
use crate::tasks::{drain_watchers, reap_finished, spawn_watcher, ExpirationWatcher, WatchOutcome};

// == TTL Cache ==
/// In-process key-value cache where every write expires after a fixed TTL.
///
/// Each `set` arms one watcher task that deletes the entry once the TTL has
/// elapsed. `get` never evaluates the TTL, so an entry stays visible until its
/// watcher has actually run.
///
/// Calling [`stop_expiration`](TtlCache::stop_expiration) disables every
/// pending and future watcher for the life of the cache. Dropping the cache
/// aborts all pending watchers.
///
/// `get` clones the value while holding the read lock, so writers wait for
/// that clone. Store large or expensive values as `Arc<T>` to keep reads
/// down to a reference-count bump.
///
/// `set` must be called from within a Tokio runtime because it spawns the
/// watcher task.
///
/// # Example
/// ```ignore
/// let cache = TtlCache::new(Duration::from_secs(5))?;
/// cache.set("k1", "v1".to_string()).await;
/// assert_eq!(cache.get("k1").await, Some("v1".to_string()));
/// cache.stop_expiration().await;
/// ```
pub struct TtlCache<V> {
    /// Entries; watchers only see this through a `Weak`
    store: Arc<RwLock<CacheStore<V>>>,
    ttl: Duration,
    policy: OverwritePolicy,
    /// Flipped to `true` exactly once by `stop_expiration`
    stop_tx: watch::Sender<bool>,
    /// In-flight watchers, aborted on drop
    watchers: Mutex<JoinSet<WatchOutcome>>,
    counters: Arc<CacheCounters>,
}

impl<V> TtlCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    // == Constructors ==
    /// Creates an empty cache using [`OverwritePolicy::RenewDeadline`].
    ///
    /// # Errors
    /// `CacheError::InvalidTtl` if `ttl` is zero.
    pub fn new(ttl: Duration) -> Result<Self> {
        Self::with_policy(ttl, OverwritePolicy::default())
    }

    /// Creates an empty cache with an explicit overwrite policy.
    pub fn with_policy(ttl: Duration, policy: OverwritePolicy) -> Result<Self> {
        if ttl.is_zero() {
            return Err(CacheError::InvalidTtl(format!("{:?}", ttl)));
        }

        let (stop_tx, _) = watch::channel(false);

        Ok(Self {
            store: Arc::new(RwLock::new(CacheStore::new())),
            ttl,
            policy,
            stop_tx,
            watchers: Mutex::new(JoinSet::new()),
            counters: Arc::new(CacheCounters::new()),
        })
    }

    /// Creates a cache from loaded configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::with_policy(config.ttl()?, config.overwrite_policy)
    }

    // == Get ==
    /// Returns a clone of the value stored under `key`, if any.
    ///
    /// The clone happens under the read lock; see the type-level docs on
    /// storing `Arc<T>`.
    pub async fn get(&self, key: &str) -> Option<V> {
        let store = self.store.read().await;
        match store.get(key) {
            Some(entry) => {
                self.counters.record_hit();
                Some(entry.value.clone())
            }
            None => {
                self.counters.record_miss();
                None
            }
        }
    }

    // == Set ==
    /// Stores `value` under `key` and arms a watcher for this write.
    ///
    /// Once expiration is stopped the value is stored permanently and no
    /// watcher is spawned. Earlier watchers for the same key are not
    /// cancelled; what they do when they fire depends on the
    /// [`OverwritePolicy`].
    pub async fn set(&self, key: impl Into<String>, value: V) {
        let key = key.into();
        let mut store = self.store.write().await;
        let generation = store.insert(key.clone(), value);
        self.counters.record_set();

        if self.is_expiration_stopped() {
            trace!(key = %key, generation, "Expiration stopped, entry is permanent");
            return;
        }

        let watcher = ExpirationWatcher {
            key,
            generation,
            ttl: self.ttl,
            policy: self.policy,
            store: Arc::downgrade(&self.store),
            stop: self.stop_tx.subscribe(),
            counters: Arc::clone(&self.counters),
        };

        // Spawned under the store lock so a concurrent stop cannot slip in between
        let mut watchers = self.lock_watchers();
        reap_finished(&mut watchers);
        spawn_watcher(&mut watchers, watcher);
    }

    // == Stop Expiration ==
    /// Permanently disables expiration for this cache.
    ///
    /// Safe to call any number of times, from any number of tasks. When it
    /// returns, no watcher will delete another entry.
    pub async fn stop_expiration(&self) {
        // Watchers re-check the signal under this lock before deleting
        let _store = self.store.write().await;
        let activated = self.stop_tx.send_if_modified(|stopped| {
            if *stopped {
                false
            } else {
                *stopped = true;
                true
            }
        });

        if activated {
            info!(
                ttl_ms = self.ttl.as_millis() as u64,
                "Expiration stopped; cached entries are now permanent"
            );
        } else {
            debug!("Expiration already stopped");
        }
    }

    // == Shutdown ==
    /// Stops expiration and waits for every pending watcher to exit.
    ///
    /// Entries are left in place.
    pub async fn shutdown(&self) {
        self.stop_expiration().await;

        let mut pending = std::mem::take(&mut *self.lock_watchers());
        let joined = drain_watchers(&mut pending).await;

        info!(joined, "TTL cache shut down");
    }

    // == Accessors ==
    /// Returns true if `key` is currently stored. Not counted as a hit or miss.
    pub async fn contains_key(&self, key: &str) -> bool {
        self.store.read().await.contains_key(key)
    }

    /// Returns the current number of entries.
    pub async fn len(&self) -> usize {
        self.store.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.store.read().await.is_empty()
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn overwrite_policy(&self) -> OverwritePolicy {
        self.policy
    }

    pub fn is_expiration_stopped(&self) -> bool {
        *self.stop_tx.borrow()
    }

    /// Number of watchers that have not finished yet.
    pub fn pending_watchers(&self) -> usize {
        let mut watchers = self.lock_watchers();
        reap_finished(&mut watchers);
        watchers.len()
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub async fn stats(&self) -> CacheStats {
        let total_entries = self.len().await;
        CacheStats {
            total_entries,
            pending_watchers: self.pending_watchers(),
            expiration_stopped: self.is_expiration_stopped(),
            ..self.counters.snapshot()
        }
    }

    fn lock_watchers(&self) -> MutexGuard<'_, JoinSet<WatchOutcome>> {
        self.watchers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<V> fmt::Debug for TtlCache<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TtlCache")
            .field("ttl", &self.ttl)
            .field("policy", &self.policy)
            .field("expiration_stopped", &*self.stop_tx.borrow())
            .finish_non_exhaustive()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::sleep;

    const TTL: Duration = Duration::from_secs(1);

    fn cache() -> TtlCache<String> {
        TtlCache::new(TTL).unwrap()
    }

    #[test]
    fn test_new_rejects_zero_ttl() {
        let result = TtlCache::<String>::new(Duration::ZERO);
        assert!(matches!(result, Err(CacheError::InvalidTtl(_))));
    }

    #[test]
    fn test_from_config_rejects_negative_ttl() {
        let config = Config {
            ttl_ms: -1,
            ..Config::default()
        };
        let result = TtlCache::<String>::from_config(&config);
        assert_eq!(
            result.err(),
            Some(CacheError::InvalidTtl("-1ms".to_string()))
        );
    }

    #[test]
    fn test_from_config_applies_settings() {
        let config = Config {
            ttl_ms: 250,
            overwrite_policy: OverwritePolicy::KeepDeadline,
        };
        let cache = TtlCache::<String>::from_config(&config).unwrap();
        assert_eq!(cache.ttl(), Duration::from_millis(250));
        assert_eq!(cache.overwrite_policy(), OverwritePolicy::KeepDeadline);
        assert!(!cache.is_expiration_stopped());
    }

    #[test]
    fn test_usable_from_sync_code() {
        let cache = cache();
        let value = tokio_test::block_on(async {
            cache.set("k", "v".to_string()).await;
            cache.get("k").await
        });
        assert_eq!(value, Some("v".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_then_get() {
        let cache = cache();

        cache.set("key1", "value1".to_string()).await;

        assert_eq!(cache.get("key1").await, Some("value1".to_string()));
        assert_eq!(cache.get("missing").await, None);
        assert_eq!(cache.len().await, 1);
        assert_eq!(cache.pending_watchers(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_entry_visible_until_deadline_then_gone() {
        let cache = cache();
        cache.set("k", "v".to_string()).await;

        sleep(Duration::from_millis(900)).await;
        assert!(cache.contains_key("k").await);

        sleep(Duration::from_millis(200)).await;
        assert!(!cache.contains_key("k").await);
        assert!(cache.is_empty().await);
        assert_eq!(cache.pending_watchers(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_preserves_entries() {
        let cache = cache();
        cache.set("k", "v".to_string()).await;

        cache.stop_expiration().await;
        sleep(TTL * 10).await;

        assert_eq!(cache.get("k").await, Some("v".to_string()));
        assert!(cache.is_expiration_stopped());
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_after_stop_is_permanent() {
        let cache = cache();
        cache.stop_expiration().await;

        cache.set("late", "v".to_string()).await;
        assert_eq!(cache.pending_watchers(), 0);

        sleep(TTL * 3).await;
        assert!(cache.contains_key("late").await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_is_idempotent() {
        let cache = cache();

        // No watchers pending at all
        cache.stop_expiration().await;
        cache.stop_expiration().await;
        cache.stop_expiration().await;

        assert!(cache.is_expiration_stopped());
    }

    #[tokio::test(start_paused = true)]
    async fn test_renew_deadline_keeps_overwrite() {
        let cache = cache();
        cache.set("k", "v1".to_string()).await;

        sleep(Duration::from_millis(600)).await;
        cache.set("k", "v2".to_string()).await;

        // First watcher has fired by now
        sleep(Duration::from_millis(600)).await;
        assert_eq!(cache.get("k").await, Some("v2".to_string()));

        sleep(Duration::from_millis(500)).await;
        assert_eq!(cache.get("k").await, None);

        let stats = cache.stats().await;
        assert_eq!(stats.superseded_watchers, 1);
        assert_eq!(stats.expirations, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_keep_deadline_drops_overwrite_at_first_deadline() {
        let cache = TtlCache::with_policy(TTL, OverwritePolicy::KeepDeadline).unwrap();
        cache.set("k", "v1".to_string()).await;

        sleep(Duration::from_millis(600)).await;
        cache.set("k", "v2".to_string()).await;

        sleep(Duration::from_millis(600)).await;
        assert_eq!(cache.get("k").await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_joins_watchers() {
        let cache = cache();
        for i in 0..10 {
            cache.set(format!("k{}", i), "v".to_string()).await;
        }
        assert_eq!(cache.pending_watchers(), 10);

        cache.shutdown().await;

        assert_eq!(cache.pending_watchers(), 0);
        assert_eq!(cache.len().await, 10);
        assert_eq!(cache.stats().await.cancelled_watchers, 10);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_releases_store() {
        let cache = cache();
        cache.set("k", "v".to_string()).await;
        let store = Arc::downgrade(&cache.store);

        drop(cache);

        assert!(store.upgrade().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stats_track_lookups() {
        let cache = cache();
        cache.set("k", "v".to_string()).await;
        cache.get("k").await;
        cache.get("nope").await;

        let stats = cache.stats().await;
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.sets, 1);
        assert_eq!(stats.total_entries, 1);
        assert_eq!(stats.pending_watchers, 1);
        assert!(!stats.expiration_stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn test_arc_values_are_shared_not_copied() {
        let cache: TtlCache<Arc<Vec<u8>>> = TtlCache::new(TTL).unwrap();
        let blob = Arc::new(vec![7u8; 4096]);

        cache.set("blob", Arc::clone(&blob)).await;
        let first = cache.get("blob").await.unwrap();
        let second = cache.get("blob").await.unwrap();

        assert!(Arc::ptr_eq(&first, &blob));
        assert!(Arc::ptr_eq(&second, &blob));
        // Original, stored copy and two reads
        assert_eq!(Arc::strong_count(&blob), 4);
    }

    #[test]
    fn test_debug_output() {
        let cache = cache();
        let debug = format!("{:?}", cache);
        assert!(debug.contains("TtlCache"));
        assert!(debug.contains("RenewDeadline"));
    }
}
