use super::{CacheFacade, settle};
use crate::codec;
use crate::domain::Soft;
use serde::Serialize;
use serde::de::DeserializeOwned;
use shared::{Error, Result, Ttl};

impl CacheFacade {
    /// Writes the value, keeping any TTL the key already has.
    pub async fn set<V: Serialize + ?Sized>(&self, key: &str, value: &V) -> bool {
        let outcome = async { self.store.set(key, codec::encode(value)?).await }.await;
        settle("set", key, outcome).is_ok()
    }

    /// Writes the value and its TTL in one store call. With a non-positive
    /// TTL this is exactly [`CacheFacade::set`].
    pub async fn set_with_ttl<V: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &V,
        ttl: impl Into<Ttl>,
    ) -> bool {
        let ttl: Ttl = ttl.into();
        let Some(duration) = ttl.duration() else {
            return self.set(key, value).await;
        };
        let outcome = async {
            let raw = codec::encode(value)?;
            self.store.set_with_expiry(key, raw, duration).await
        }
        .await;
        settle("set", key, outcome).is_ok()
    }

    /// `None` when the key is empty (no store call), absent, holds something
    /// that does not decode as `V`, or the store fails.
    pub async fn get<V: DeserializeOwned>(&self, key: &str) -> Option<V> {
        if key.is_empty() {
            return None;
        }
        let outcome = async {
            match self.store.get(key).await? {
                Some(raw) => codec::decode(&raw).map(Some),
                None => Ok(None),
            }
        }
        .await;
        settle("get", key, outcome).ok().flatten()
    }

    /// Atomically adds `delta` and returns the new value; an absent key starts
    /// at zero.
    ///
    /// A negative `delta` is a caller bug and fails with
    /// [`Error::InvalidArgument`] before the store is contacted. Store
    /// failures arrive as the inner soft failure.
    pub async fn increment(&self, key: &str, delta: i64) -> Result<Soft<i64>> {
        if delta < 0 {
            return Err(Error::InvalidArgument(format!(
                "increment delta must be non-negative, got {delta}"
            )));
        }
        Ok(settle("increment", key, self.store.increment_by(key, delta).await))
    }

    /// Atomically subtracts `delta`; same contract as [`CacheFacade::increment`].
    pub async fn decrement(&self, key: &str, delta: i64) -> Result<Soft<i64>> {
        if delta < 0 {
            return Err(Error::InvalidArgument(format!(
                "decrement delta must be non-negative, got {delta}"
            )));
        }
        Ok(settle("decrement", key, self.store.increment_by(key, -delta).await))
    }
}

#[cfg(test)]
mod tests {
    use crate::domain::SoftFailure;
    use crate::facade::CacheFacade;
    use crate::facade::testing::OfflineStore;
    use shared::{Error, Ttl};
    use std::sync::Arc;

    fn offline() -> (Arc<OfflineStore>, CacheFacade) {
        let store = Arc::new(OfflineStore::default());
        (store.clone(), CacheFacade::new(store))
    }

    #[tokio::test]
    async fn test_negative_delta_rejected_without_store_call() {
        let (store, cache) = offline();

        let result = cache.increment("counter", -1).await;
        assert!(matches!(result, Err(Error::InvalidArgument(_))));

        let result = cache.decrement("counter", -7).await;
        assert!(matches!(result, Err(Error::InvalidArgument(_))));

        assert_eq!(store.calls(), 0);
    }

    #[tokio::test]
    async fn test_empty_key_get_skips_store() {
        let (store, cache) = offline();
        assert_eq!(cache.get::<String>("").await, None);
        assert_eq!(store.calls(), 0);
    }

    #[tokio::test]
    async fn test_outage_is_suppressed() {
        let (store, cache) = offline();

        assert!(!cache.set("greeting", "hello").await);
        assert!(!cache.set_with_ttl("greeting", "hello", Ttl::seconds(5)).await);
        assert!(!cache.set_with_ttl("greeting", "hello", 0).await);
        assert_eq!(cache.get::<String>("greeting").await, None);
        assert_eq!(
            cache.increment("counter", 1).await,
            Ok(Err(SoftFailure::new("increment")))
        );
        assert_eq!(
            cache.decrement("counter", 1).await,
            Ok(Err(SoftFailure::new("decrement")))
        );
        assert_eq!(store.calls(), 6);
    }
}
