//! TTL Cache demo
//!
//! Writes two keys, stops expiration, waits past the TTL and shows that both
//! keys survived.

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ttl_cache::{Config, TtlCache};

/// Main entry point for the TTL cache demo.
///
/// # Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Create the cache and write `key1` and `key2`
/// 4. Stop expiration, then sleep past the TTL
/// 5. Report which keys survived and print stats as JSON
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ttl_cache=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    info!(
        "Configuration loaded: ttl={}ms, overwrite_policy={}",
        config.ttl_ms, config.overwrite_policy
    );

    let cache: TtlCache<String> =
        TtlCache::from_config(&config).context("failed to create cache")?;

    cache.set("key1", "value1".to_string()).await;
    cache.set("key2", "value2".to_string()).await;

    match cache.get("key1").await {
        Some(value) => info!("Value for key1: {}", value),
        None => warn!("key1 not found in cache"),
    }

    cache.stop_expiration().await;

    let wait = cache.ttl() + std::time::Duration::from_secs(1);
    info!("Sleeping {:?} to outlast the TTL", wait);
    tokio::time::sleep(wait).await;

    for key in ["key1", "key2"] {
        match cache.get(key).await {
            Some(value) => info!("{} still cached after TTL: {}", key, value),
            None => warn!("{} expired from cache", key),
        }
    }

    cache.shutdown().await;

    let stats = serde_json::to_string_pretty(&cache.stats().await)
        .context("failed to serialize cache stats")?;
    println!("{}", stats);

    Ok(())
}
