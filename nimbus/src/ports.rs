#![deny(clippy::all)]

use crate::domain::KeyTtl;
use async_trait::async_trait;
use bytes::Bytes;
use shared::Result;
use std::collections::HashMap;
use std::time::Duration;

// Ports are the pluggable extension points for the remote store behind the facade

/// Port for the key-value store the facade delegates to (e.g. Redis).
///
/// Every method is one round-trip. Implementations report wrong-shape access
/// as [`shared::Error::WrongType`] and never retry.
#[async_trait]
pub trait CacheStore: Send + Sync + 'static {
    // keys
    async fn exists(&self, key: &str) -> Result<bool>;
    async fn delete(&self, keys: &[String]) -> Result<u64>;
    /// `false` when the key does not exist.
    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool>;
    async fn ttl(&self, key: &str) -> Result<KeyTtl>;

    // scalars
    async fn get(&self, key: &str) -> Result<Option<Bytes>>;
    /// Writes the value and keeps any TTL the key already carries.
    async fn set(&self, key: &str, value: Bytes) -> Result<()>;
    async fn set_with_expiry(&self, key: &str, value: Bytes, ttl: Duration) -> Result<()>;
    async fn increment_by(&self, key: &str, delta: i64) -> Result<i64>;

    // hashes
    async fn hash_get(&self, key: &str, field: &str) -> Result<Option<Bytes>>;
    async fn hash_get_all(&self, key: &str) -> Result<HashMap<String, Bytes>>;
    async fn hash_set_many(&self, key: &str, entries: Vec<(String, Bytes)>) -> Result<()>;
    async fn hash_set(&self, key: &str, field: &str, value: Bytes) -> Result<()>;
    async fn hash_delete(&self, key: &str, fields: &[String]) -> Result<u64>;
    async fn hash_exists(&self, key: &str, field: &str) -> Result<bool>;
    async fn hash_increment_by_float(&self, key: &str, field: &str, amount: f64) -> Result<f64>;

    // sets
    async fn set_members(&self, key: &str) -> Result<Vec<Bytes>>;
    async fn set_is_member(&self, key: &str, member: Bytes) -> Result<bool>;
    async fn set_add(&self, key: &str, members: Vec<Bytes>) -> Result<u64>;
    async fn set_cardinality(&self, key: &str) -> Result<u64>;
    async fn set_remove(&self, key: &str, members: Vec<Bytes>) -> Result<u64>;

    // lists
    /// Inclusive range; negative indices count from the tail.
    async fn list_range(&self, key: &str, start: i64, end: i64) -> Result<Vec<Bytes>>;
    async fn list_len(&self, key: &str) -> Result<u64>;
    async fn list_index(&self, key: &str, index: i64) -> Result<Option<Bytes>>;
    /// Returns the new length.
    async fn list_push_back(&self, key: &str, values: Vec<Bytes>) -> Result<u64>;
    /// Pushes each value onto the head in turn. Returns the new length.
    async fn list_push_front(&self, key: &str, values: Vec<Bytes>) -> Result<u64>;
    async fn list_set(&self, key: &str, index: i64, value: Bytes) -> Result<()>;
    async fn list_remove(&self, key: &str, count: i64, value: Bytes) -> Result<u64>;
}
