use super::{CacheFacade, settle};
use crate::codec;
use crate::domain::Soft;
use bytes::Bytes;
use serde::Serialize;
use serde::de::DeserializeOwned;
use shared::Ttl;
use std::collections::HashMap;

impl CacheFacade {
    pub async fn hash_get_field<V: DeserializeOwned>(&self, key: &str, field: &str) -> Option<V> {
        let outcome = async {
            match self.store.hash_get(key, field).await? {
                Some(raw) => codec::decode(&raw).map(Some),
                None => Ok(None),
            }
        }
        .await;
        settle("hash_get_field", key, outcome).ok().flatten()
    }

    /// Every field of the hash; empty for an absent key. Fails as a whole if
    /// any field does not decode as `V`.
    pub async fn hash_get_all<V: DeserializeOwned>(&self, key: &str) -> Soft<HashMap<String, V>> {
        let outcome = async {
            self.store
                .hash_get_all(key)
                .await?
                .into_iter()
                .map(|(field, raw)| -> shared::Result<(String, V)> {
                    Ok((field, codec::decode(&raw)?))
                })
                .collect::<shared::Result<HashMap<_, _>>>()
        }
        .await;
        settle("hash_get_all", key, outcome)
    }

    /// Writes all entries into the hash, creating it if needed. An empty set
    /// of entries writes nothing.
    pub async fn hash_set_all<I, F, V>(&self, key: &str, entries: I) -> bool
    where
        I: IntoIterator<Item = (F, V)>,
        F: Into<String>,
        V: Serialize,
    {
        let outcome = async {
            let entries = entries
                .into_iter()
                .map(|(field, value)| -> shared::Result<(String, Bytes)> {
                    Ok((field.into(), codec::encode(&value)?))
                })
                .collect::<shared::Result<Vec<_>>>()?;
            if entries.is_empty() {
                return Ok(());
            }
            self.store.hash_set_many(key, entries).await
        }
        .await;
        settle("hash_set_all", key, outcome).is_ok()
    }

    /// [`CacheFacade::hash_set_all`] followed by a separate expire call.
    ///
    /// The two calls are not atomic: if the expire fails the fields stay
    /// written without the TTL and this returns `false`.
    pub async fn hash_set_all_with_ttl<I, F, V>(
        &self,
        key: &str,
        entries: I,
        ttl: impl Into<Ttl>,
    ) -> bool
    where
        I: IntoIterator<Item = (F, V)>,
        F: Into<String>,
        V: Serialize,
    {
        self.hash_set_all(key, entries).await && self.expire_after_write(key, ttl.into()).await
    }

    pub async fn hash_set_field<V: Serialize + ?Sized>(
        &self,
        key: &str,
        field: &str,
        value: &V,
    ) -> bool {
        let outcome = async {
            let raw = codec::encode(value)?;
            self.store.hash_set(key, field, raw).await
        }
        .await;
        settle("hash_set_field", key, outcome).is_ok()
    }

    /// [`CacheFacade::hash_set_field`] followed by a separate expire call;
    /// same non-atomic contract as [`CacheFacade::hash_set_all_with_ttl`].
    pub async fn hash_set_field_with_ttl<V: Serialize + ?Sized>(
        &self,
        key: &str,
        field: &str,
        value: &V,
        ttl: impl Into<Ttl>,
    ) -> bool {
        self.hash_set_field(key, field, value).await
            && self.expire_after_write(key, ttl.into()).await
    }

    /// Removes the given fields and returns how many existed.
    pub async fn hash_delete_fields<I>(&self, key: &str, fields: I) -> Soft<u64>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let fields: Vec<String> = fields.into_iter().map(|f| f.as_ref().to_owned()).collect();
        if fields.is_empty() {
            return Ok(0);
        }
        settle("hash_delete_fields", key, self.store.hash_delete(key, &fields).await)
    }

    pub async fn hash_field_exists(&self, key: &str, field: &str) -> bool {
        settle("hash_field_exists", key, self.store.hash_exists(key, field).await).unwrap_or(false)
    }

    /// Adds `amount` to a numeric field, creating it at zero if needed.
    pub async fn hash_increment_field(&self, key: &str, field: &str, amount: f64) -> Soft<f64> {
        settle(
            "hash_increment_field",
            key,
            self.store.hash_increment_by_float(key, field, amount).await,
        )
    }

    /// Increments by `-amount`. Unlike the scalar path the sign is not
    /// checked, so a negative amount increases the field.
    pub async fn hash_decrement_field(&self, key: &str, field: &str, amount: f64) -> Soft<f64> {
        self.hash_increment_field(key, field, -amount).await
    }

    async fn expire_after_write(&self, key: &str, ttl: Ttl) -> bool {
        let Some(duration) = ttl.duration() else {
            return true;
        };
        match settle("expire", key, self.store.expire(key, duration).await) {
            Ok(applied) => applied,
            Err(_) => {
                tracing::warn!(key, "hash written without its TTL");
                false
            }
        }
    }
}
