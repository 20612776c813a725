use async_trait::async_trait;
use bytes::Bytes;
use nimbus::domain::KeyTtl;
use nimbus::ports::CacheStore;
use redis::aio::{ConnectionManager, ConnectionManagerConfig};
use redis::{Cmd, FromRedisValue, RedisError};
use shared::config::StoreConfig;
use shared::{Error, Result};
use std::collections::HashMap;
use std::fmt::Debug;
use std::time::Duration;
use tracing::info;

/// Redis-backed store over a single multiplexed connection.
///
/// The [`ConnectionManager`] reconnects on its own after a dropped
/// connection; individual commands are never retried here.
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
}

impl RedisStore {
    pub async fn connect(config: &StoreConfig) -> Result<Self> {
        let client = redis::Client::open(config.redis_url.as_str())
            .map_err(|e| Error::Config(format!("invalid redis url: {e}")))?;
        let manager_config = ConnectionManagerConfig::new()
            .set_connection_timeout(config.connect_timeout)
            .set_response_timeout(config.response_timeout);
        let conn = ConnectionManager::new_with_config(client, manager_config)
            .await
            .map_err(store_error)?;
        info!(url = %config.redis_url, "connected to redis");
        Ok(Self { conn })
    }

    async fn query<T: FromRedisValue>(&self, cmd: &Cmd) -> Result<T> {
        let mut conn = self.conn.clone();
        cmd.query_async(&mut conn).await.map_err(store_error)
    }
}

fn store_error(e: RedisError) -> Error {
    if e.is_io_error() || e.is_connection_dropped() || e.is_connection_refusal() || e.is_timeout() {
        Error::Connection(e.to_string())
    } else if e.code() == Some("WRONGTYPE") {
        Error::WrongType
    } else {
        Error::Store(e.to_string())
    }
}

fn millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1)
}

fn to_bytes(raw: Vec<Vec<u8>>) -> Vec<Bytes> {
    raw.into_iter().map(Bytes::from).collect()
}

#[async_trait]
impl CacheStore for RedisStore {
    async fn exists(&self, key: &str) -> Result<bool> {
        self.query(redis::cmd("EXISTS").arg(key)).await
    }

    async fn delete(&self, keys: &[String]) -> Result<u64> {
        self.query(redis::cmd("DEL").arg(keys)).await
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool> {
        self.query(redis::cmd("PEXPIRE").arg(key).arg(millis(ttl))).await
    }

    async fn ttl(&self, key: &str) -> Result<KeyTtl> {
        let remaining: i64 = self.query(redis::cmd("PTTL").arg(key)).await?;
        Ok(match remaining {
            -2 => KeyTtl::Missing,
            -1 => KeyTtl::Persistent,
            ms => KeyTtl::Expires(Duration::from_millis(ms.max(0) as u64)),
        })
    }

    async fn get(&self, key: &str) -> Result<Option<Bytes>> {
        let raw: Option<Vec<u8>> = self.query(redis::cmd("GET").arg(key)).await?;
        Ok(raw.map(Bytes::from))
    }

    async fn set(&self, key: &str, value: Bytes) -> Result<()> {
        // KEEPTTL needs Redis 6.0+
        self.query(redis::cmd("SET").arg(key).arg(value.as_ref()).arg("KEEPTTL"))
            .await
    }

    async fn set_with_expiry(&self, key: &str, value: Bytes, ttl: Duration) -> Result<()> {
        self.query(
            redis::cmd("SET")
                .arg(key)
                .arg(value.as_ref())
                .arg("PX")
                .arg(millis(ttl)),
        )
        .await
    }

    async fn increment_by(&self, key: &str, delta: i64) -> Result<i64> {
        self.query(redis::cmd("INCRBY").arg(key).arg(delta)).await
    }

    async fn hash_get(&self, key: &str, field: &str) -> Result<Option<Bytes>> {
        let raw: Option<Vec<u8>> = self.query(redis::cmd("HGET").arg(key).arg(field)).await?;
        Ok(raw.map(Bytes::from))
    }

    async fn hash_get_all(&self, key: &str) -> Result<HashMap<String, Bytes>> {
        let raw: HashMap<String, Vec<u8>> = self.query(redis::cmd("HGETALL").arg(key)).await?;
        Ok(raw
            .into_iter()
            .map(|(field, value)| (field, Bytes::from(value)))
            .collect())
    }

    async fn hash_set_many(&self, key: &str, entries: Vec<(String, Bytes)>) -> Result<()> {
        let mut cmd = redis::cmd("HSET");
        cmd.arg(key);
        for (field, value) in &entries {
            cmd.arg(field).arg(value.as_ref());
        }
        let _: u64 = self.query(&cmd).await?;
        Ok(())
    }

    async fn hash_set(&self, key: &str, field: &str, value: Bytes) -> Result<()> {
        let _: u64 = self
            .query(redis::cmd("HSET").arg(key).arg(field).arg(value.as_ref()))
            .await?;
        Ok(())
    }

    async fn hash_delete(&self, key: &str, fields: &[String]) -> Result<u64> {
        self.query(redis::cmd("HDEL").arg(key).arg(fields)).await
    }

    async fn hash_exists(&self, key: &str, field: &str) -> Result<bool> {
        self.query(redis::cmd("HEXISTS").arg(key).arg(field)).await
    }

    async fn hash_increment_by_float(&self, key: &str, field: &str, amount: f64) -> Result<f64> {
        self.query(redis::cmd("HINCRBYFLOAT").arg(key).arg(field).arg(amount))
            .await
    }

    async fn set_members(&self, key: &str) -> Result<Vec<Bytes>> {
        let raw: Vec<Vec<u8>> = self.query(redis::cmd("SMEMBERS").arg(key)).await?;
        Ok(to_bytes(raw))
    }

    async fn set_is_member(&self, key: &str, member: Bytes) -> Result<bool> {
        self.query(redis::cmd("SISMEMBER").arg(key).arg(member.as_ref()))
            .await
    }

    async fn set_add(&self, key: &str, members: Vec<Bytes>) -> Result<u64> {
        let mut cmd = redis::cmd("SADD");
        cmd.arg(key);
        for member in &members {
            cmd.arg(member.as_ref());
        }
        self.query(&cmd).await
    }

    async fn set_cardinality(&self, key: &str) -> Result<u64> {
        self.query(redis::cmd("SCARD").arg(key)).await
    }

    async fn set_remove(&self, key: &str, members: Vec<Bytes>) -> Result<u64> {
        let mut cmd = redis::cmd("SREM");
        cmd.arg(key);
        for member in &members {
            cmd.arg(member.as_ref());
        }
        self.query(&cmd).await
    }

    async fn list_range(&self, key: &str, start: i64, end: i64) -> Result<Vec<Bytes>> {
        let raw: Vec<Vec<u8>> = self
            .query(redis::cmd("LRANGE").arg(key).arg(start).arg(end))
            .await?;
        Ok(to_bytes(raw))
    }

    async fn list_len(&self, key: &str) -> Result<u64> {
        self.query(redis::cmd("LLEN").arg(key)).await
    }

    async fn list_index(&self, key: &str, index: i64) -> Result<Option<Bytes>> {
        let raw: Option<Vec<u8>> = self.query(redis::cmd("LINDEX").arg(key).arg(index)).await?;
        Ok(raw.map(Bytes::from))
    }

    async fn list_push_back(&self, key: &str, values: Vec<Bytes>) -> Result<u64> {
        let mut cmd = redis::cmd("RPUSH");
        cmd.arg(key);
        for value in &values {
            cmd.arg(value.as_ref());
        }
        self.query(&cmd).await
    }

    async fn list_push_front(&self, key: &str, values: Vec<Bytes>) -> Result<u64> {
        let mut cmd = redis::cmd("LPUSH");
        cmd.arg(key);
        for value in &values {
            cmd.arg(value.as_ref());
        }
        self.query(&cmd).await
    }

    async fn list_set(&self, key: &str, index: i64, value: Bytes) -> Result<()> {
        self.query(redis::cmd("LSET").arg(key).arg(index).arg(value.as_ref()))
            .await
    }

    async fn list_remove(&self, key: &str, count: i64, value: Bytes) -> Result<u64> {
        self.query(redis::cmd("LREM").arg(key).arg(count).arg(value.as_ref()))
            .await
    }
}

impl Debug for RedisStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStore")
            .field("conn", &"<redis::aio::ConnectionManager>")
            .finish()
    }
}
