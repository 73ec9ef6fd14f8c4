//! Cassandra Cache - Sample walkthrough
//!
//! Stores, reads and removes a single entry through the distributed cache
//! capability. Built with the `scylla` feature it talks to the configured
//! cluster; otherwise it runs against the in-memory session.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cassandra_cache::{
    CacheServices, CassandraCacheOptions, CqlSession, DistributedCache, EntryOptions, SessionConfig,
};

const SAMPLE_KEY: &str = "myKey";
const SAMPLE_VALUE: &str = "Hello, World!";

/// Main entry point for the sample.
///
/// # Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load connection settings from environment variables
/// 3. Open a session and register the cache
/// 4. Set, get, remove, then get the sample key again
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" for this crate, can be overridden with RUST_LOG
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cassandra_cache=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = SessionConfig::from_env();
    info!(
        "Configuration loaded: node={}, keyspace={}, read={}, write={}",
        config.node_address(),
        config.keyspace,
        config.read_consistency,
        config.write_consistency
    );

    #[cfg(feature = "scylla")]
    let session = Arc::new(cassandra_cache::session::ScyllaSession::connect(&config).await?);

    #[cfg(not(feature = "scylla"))]
    let session = {
        warn!("Built without the scylla feature, using the in-memory session");
        Arc::new(cassandra_cache::MemorySession::new())
    };

    run_sample(session, &config).await
}

async fn run_sample<S: CqlSession>(session: Arc<S>, config: &SessionConfig) -> anyhow::Result<()> {
    let config = config.clone();
    let mut services = CacheServices::new();
    services.add_distributed_cassandra_cache(Some(move |options: &mut CassandraCacheOptions<S>| {
        *options = CassandraCacheOptions::from_config(Arc::clone(&session), &config);
    }))?;

    let cache = services.resolve().await?;
    let token = CancellationToken::new();

    cache
        .set(SAMPLE_KEY, SAMPLE_VALUE.as_bytes(), &EntryOptions::default(), &token)
        .await?;
    info!("Stored {} = {}", SAMPLE_KEY, SAMPLE_VALUE);

    match cache.get(SAMPLE_KEY, &token).await? {
        Some(value) => info!("Read {} = {}", SAMPLE_KEY, String::from_utf8_lossy(&value)),
        None => warn!("{} was not found right after being stored", SAMPLE_KEY),
    }

    cache.remove(SAMPLE_KEY, &token).await?;
    info!("Removed {}", SAMPLE_KEY);

    let after = cache.get(SAMPLE_KEY, &token).await?;
    info!("Read {} after removal: {:?}", SAMPLE_KEY, after);

    Ok(())
}
