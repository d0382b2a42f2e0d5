//! Configuration Module
//!
//! Handles loading cache configuration from environment variables.

use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{CacheError, Result};

// == Overwrite Policy ==
/// What a re-`set` of a live key does to the deadline armed by the earlier `set`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverwritePolicy {
    /// Only the watcher of the latest write may delete the key, so every
    /// overwrite gets a full TTL.
    #[default]
    RenewDeadline,
    /// Every watcher deletes the key when it fires. An overwrite is removed
    /// at the deadline of the first write.
    KeepDeadline,
}

impl FromStr for OverwritePolicy {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "renew" | "renew_deadline" => Ok(Self::RenewDeadline),
            "keep" | "keep_deadline" => Ok(Self::KeepDeadline),
            other => Err(CacheError::InvalidConfig(format!(
                "unknown overwrite policy '{}' (expected 'renew' or 'keep')",
                other
            ))),
        }
    }
}

impl fmt::Display for OverwritePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RenewDeadline => f.write_str("renew"),
            Self::KeepDeadline => f.write_str("keep"),
        }
    }
}

/// Cache configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// TTL in milliseconds. Signed so that negative input reaches validation.
    pub ttl_ms: i64,
    /// Behaviour of watchers when a key is overwritten
    pub overwrite_policy: OverwritePolicy,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_TTL_MS` - Entry TTL in milliseconds (default: 5000)
    /// - `CACHE_OVERWRITE_POLICY` - `renew` or `keep` (default: renew)
    pub fn from_env() -> Self {
        Self {
            ttl_ms: env::var("CACHE_TTL_MS")
                .ok()
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(5000),
            overwrite_policy: env::var("CACHE_OVERWRITE_POLICY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or_default(),
        }
    }

    // == TTL ==
    /// Returns the configured TTL, rejecting non-positive values.
    pub fn ttl(&self) -> Result<Duration> {
        if self.ttl_ms <= 0 {
            return Err(CacheError::InvalidTtl(format!("{}ms", self.ttl_ms)));
        }
        Ok(Duration::from_millis(self.ttl_ms as u64))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ttl_ms: 5000,
            overwrite_policy: OverwritePolicy::default(),
        }
    }
}
