use nimbus::CacheFacade;
use shared::config::StoreConfig;
use shared::{TimeUnit, Ttl};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const PREFIX: &str = "nimbus-probe";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    info!("Starting Nimbus probe");

    // Load environment variables
    match dotenvy::dotenv() {
        Ok(_) => info!("Loaded environment variables from .env file"),
        Err(_) => info!("No .env file found, using system environment variables"),
    }

    let config = StoreConfig::from_env()?;
    info!(backend = ?config.backend, "Connecting to store");

    // One store handle for the whole process, released by shutdown below
    let store = storage_engine::connect(&config).await?;
    let cache = CacheFacade::new(store);

    tokio::select! {
        _ = run_probe(&cache) => info!("Probe finished"),
        _ = shutdown_signal() => info!("Shutdown signal received, probe interrupted"),
    }

    cleanup(&cache).await;
    cache.shutdown();
    info!("Nimbus probe shutting down");
    Ok(())
}

fn key(name: &str) -> String {
    format!("{PREFIX}:{name}")
}

async fn run_probe(cache: &CacheFacade) {
    probe_values(cache).await;
    probe_hashes(cache).await;
    probe_sets(cache).await;
    probe_lists(cache).await;
    probe_expiry(cache).await;
}

async fn probe_values(cache: &CacheFacade) {
    let greeting = key("greeting");
    let stored = cache.set(&greeting, "hello").await;
    let read: Option<String> = cache.get(&greeting).await;
    info!(stored, ?read, "value round-trip");

    let counter = key("counter");
    match cache.increment(&counter, 5).await {
        Ok(value) => info!(?value, "incremented counter"),
        Err(e) => warn!("increment rejected: {e}"),
    }
    if let Err(e) = cache.decrement(&counter, -1).await {
        info!("negative delta rejected as expected: {e}");
    }
}

async fn probe_hashes(cache: &CacheFacade) {
    let profile = key("profile");
    let fields = HashMap::from([("name", "ada"), ("lang", "en")]);
    let stored = cache.hash_set_all_with_ttl(&profile, fields, Ttl::minutes(10)).await;
    let visits = cache.hash_increment_field(&profile, "visits", 1.0).await;
    let all = cache.hash_get_all::<serde_json::Value>(&profile).await;
    info!(stored, ?visits, ?all, "hash round-trip");
}

async fn probe_sets(cache: &CacheFacade) {
    let tags = key("tags");
    let added = cache.set_add(&tags, ["rust", "cache", "rust"]).await;
    let size = cache.set_size(&tags).await;
    let contains = cache.set_contains(&tags, "cache").await;
    info!(?added, ?size, contains, "set round-trip");
}

async fn probe_lists(cache: &CacheFacade) {
    let queue = key("queue");
    let pushed = cache.list_right_push_all(&queue, ["a", "b", "a", "c", "a"]).await;
    let removed = cache.list_remove(&queue, -2, "a").await;
    let remaining = cache.list_range_all::<String>(&queue).await;
    info!(?pushed, ?removed, ?remaining, "list round-trip");
}

/// Writes a short-lived value, reads it, waits past its TTL and reads again.
async fn probe_expiry(cache: &CacheFacade) {
    let otp = key("otp");
    let stored = cache.set_with_ttl(&otp, "123", Ttl::seconds(5)).await;
    let before: Option<String> = cache.get(&otp).await;
    let ttl = cache.get_expire_in(&otp, TimeUnit::Seconds).await;
    info!(stored, ?before, ?ttl, "short-lived value written");

    tokio::time::sleep(Duration::from_secs(5)).await;

    let after: Option<String> = cache.get(&otp).await;
    let exists = cache.has_key(&otp).await;
    info!(?after, exists, "after expiry");
}

async fn cleanup(cache: &CacheFacade) {
    let keys = ["greeting", "counter", "profile", "tags", "queue", "otp"].map(key);
    match cache.delete(&keys).await {
        Ok(removed) => info!(removed, "probe keys removed"),
        Err(e) => warn!("{e}"),
    }
}

// Graceful shutdown handler
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received terminate signal");
        },
    }
}
