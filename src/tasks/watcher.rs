//! Expiration Watcher Task
//!
//! One short-lived task per `set`. It sleeps for the TTL and then deletes the
//! entry it was armed for, unless the stop signal fires first.

use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::sync::{watch, RwLock};
use tokio::task::JoinSet;
use tracing::{debug, error};

use crate::cache::{CacheCounters, CacheStore, Removal};
use crate::config::OverwritePolicy;

// == Watch Outcome ==
/// How a watcher finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchOutcome {
    /// The TTL elapsed and the entry was deleted
    Expired,
    /// The TTL elapsed but a newer write owns the key
    Superseded,
    /// The TTL elapsed but the key was already gone
    Missing,
    /// Expiration was stopped before the watcher could delete anything
    Stopped,
    /// The cache was dropped while the watcher was pending
    Orphaned,
}

// == Expiration Watcher ==
/// Everything a watcher needs, without a reference to the cache itself.
pub struct ExpirationWatcher<V> {
    pub key: String,
    pub generation: u64,
    pub ttl: Duration,
    pub policy: OverwritePolicy,
    pub store: Weak<RwLock<CacheStore<V>>>,
    pub stop: watch::Receiver<bool>,
    pub counters: Arc<CacheCounters>,
}

impl<V> ExpirationWatcher<V>
where
    V: Send + Sync + 'static,
{
    /// Races the TTL against the stop signal and applies the result.
    pub async fn run(mut self) -> WatchOutcome {
        let signalled = tokio::select! {
            biased;
            stopped = stop_requested(&mut self.stop) => Some(stopped),
            _ = tokio::time::sleep(self.ttl) => None,
        };

        match signalled {
            Some(true) => return self.finish(WatchOutcome::Stopped),
            Some(false) => return self.finish(WatchOutcome::Orphaned),
            None => {}
        }

        let Some(store) = self.store.upgrade() else {
            return self.finish(WatchOutcome::Orphaned);
        };

        let removal = {
            let mut guard = store.write().await;
            // stop_expiration flips the signal under this lock
            let stopped = *self.stop.borrow();
            if stopped {
                None
            } else {
                Some(match self.policy {
                    OverwritePolicy::RenewDeadline => {
                        guard.remove_if_generation(&self.key, self.generation)
                    }
                    OverwritePolicy::KeepDeadline => guard.remove(&self.key),
                })
            }
        };

        let outcome = match removal {
            None => WatchOutcome::Stopped,
            Some(Removal::Removed) => WatchOutcome::Expired,
            Some(Removal::Superseded) => WatchOutcome::Superseded,
            Some(Removal::Missing) => WatchOutcome::Missing,
        };
        self.finish(outcome)
    }

    fn finish(&self, outcome: WatchOutcome) -> WatchOutcome {
        match outcome {
            WatchOutcome::Expired => {
                self.counters.record_expiration();
                debug!(key = %self.key, generation = self.generation, "Entry expired");
            }
            WatchOutcome::Superseded => {
                self.counters.record_superseded();
                debug!(
                    key = %self.key,
                    generation = self.generation,
                    "Entry rewritten since watcher was armed, leaving it"
                );
            }
            WatchOutcome::Missing => {
                debug!(key = %self.key, generation = self.generation, "Entry already gone");
            }
            WatchOutcome::Stopped => {
                self.counters.record_cancelled();
                debug!(key = %self.key, generation = self.generation, "Watcher stopped");
            }
            WatchOutcome::Orphaned => {
                debug!(key = %self.key, "Cache dropped before deadline");
            }
        }
        outcome
    }
}

/// Resolves once the stop signal is raised (`true`) or its sender is gone (`false`).
async fn stop_requested(stop: &mut watch::Receiver<bool>) -> bool {
    stop.wait_for(|stopped| *stopped).await.is_ok()
}

/// Spawns a watcher into the registry, which owns the task from then on.
pub fn spawn_watcher<V>(watchers: &mut JoinSet<WatchOutcome>, watcher: ExpirationWatcher<V>)
where
    V: Send + Sync + 'static,
{
    debug!(
        key = %watcher.key,
        generation = watcher.generation,
        ttl_ms = watcher.ttl.as_millis() as u64,
        "Watcher armed"
    );
    watchers.spawn(watcher.run());
}

/// Drops finished watchers from the registry without waiting.
///
/// Returns the number of tasks reaped.
pub fn reap_finished(watchers: &mut JoinSet<WatchOutcome>) -> usize {
    let mut reaped = 0;
    while let Some(result) = watchers.try_join_next() {
        log_join_failure(result);
        reaped += 1;
    }
    reaped
}

/// Waits for every watcher in the registry to finish.
///
/// Returns the number of tasks joined.
pub async fn drain_watchers(watchers: &mut JoinSet<WatchOutcome>) -> usize {
    let mut joined = 0;
    while let Some(result) = watchers.join_next().await {
        log_join_failure(result);
        joined += 1;
    }
    joined
}

fn log_join_failure(result: Result<WatchOutcome, tokio::task::JoinError>) {
    // A lost watcher only lets its entry outlive the TTL; log it, never retry
    if let Err(err) = result {
        if err.is_panic() {
            error!("Expiration watcher panicked: {}", err);
        }
    }
}
