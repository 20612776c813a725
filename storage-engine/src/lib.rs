//! Store adapters behind the `nimbus` cache facade.

mod memory_store;
mod redis_store;

pub use memory_store::MemoryStore;
pub use redis_store::RedisStore;

use nimbus::ports::CacheStore;
use shared::Result;
use shared::config::{StoreBackend, StoreConfig};
use std::sync::Arc;
use tracing::info;

/// Opens the store selected by `config`. The returned handle is meant to be
/// acquired once per process and shared.
pub async fn connect(config: &StoreConfig) -> Result<Arc<dyn CacheStore>> {
    match config.backend {
        StoreBackend::Redis => Ok(Arc::new(RedisStore::connect(config).await?)),
        StoreBackend::Memory => {
            info!("using in-process memory store");
            let store = Arc::new(MemoryStore::new());
            store.spawn_sweeper(MemoryStore::SWEEP_INTERVAL);
            Ok(store)
        }
    }
}
