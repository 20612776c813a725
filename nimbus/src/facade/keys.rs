use super::{CacheFacade, settle};
use crate::domain::Soft;
use shared::{TimeUnit, Ttl};

impl CacheFacade {
    /// Sets the key's time-to-live. A bare integer is read as minutes.
    ///
    /// A non-positive TTL leaves the key as it is and reports success without
    /// contacting the store. Returns `false` if the key does not exist or the
    /// store call fails.
    pub async fn expire(&self, key: &str, ttl: impl Into<Ttl>) -> bool {
        let ttl: Ttl = ttl.into();
        let Some(duration) = ttl.duration() else {
            return true;
        };
        settle("expire", key, self.store.expire(key, duration).await).unwrap_or(false)
    }

    /// Remaining lifetime in seconds. `0` means no expiration is set and `-2`
    /// means the key does not exist.
    pub async fn get_expire(&self, key: &str) -> Soft<i64> {
        self.get_expire_in(key, TimeUnit::Seconds).await
    }

    /// Remaining lifetime in `unit`, rounded up.
    pub async fn get_expire_in(&self, key: &str, unit: TimeUnit) -> Soft<i64> {
        settle("get_expire", key, self.store.ttl(key).await).map(|ttl| ttl.in_unit(unit))
    }

    /// `false` both when the key is absent and when the store cannot be asked.
    pub async fn has_key(&self, key: &str) -> bool {
        settle("has_key", key, self.store.exists(key).await).unwrap_or(false)
    }

    /// Deletes every given key in one store call and returns how many existed.
    pub async fn delete<I>(&self, keys: I) -> Soft<u64>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let keys: Vec<String> = keys.into_iter().map(|k| k.as_ref().to_owned()).collect();
        if keys.is_empty() {
            return Ok(0);
        }
        let label = keys.join(",");
        settle("delete", &label, self.store.delete(&keys).await)
    }
}

#[cfg(test)]
mod tests {
    use crate::domain::SoftFailure;
    use crate::facade::CacheFacade;
    use crate::facade::testing::OfflineStore;
    use shared::{TimeUnit, Ttl};
    use std::sync::Arc;

    fn offline() -> (Arc<OfflineStore>, CacheFacade) {
        let store = Arc::new(OfflineStore::default());
        (store.clone(), CacheFacade::new(store))
    }

    #[tokio::test]
    async fn test_non_positive_expire_is_local_success() {
        let (store, cache) = offline();
        assert!(cache.expire("session", 0).await);
        assert!(cache.expire("session", Ttl::seconds(-10)).await);
        assert_eq!(store.calls(), 0);
    }

    #[tokio::test]
    async fn test_empty_delete_skips_store() {
        let (store, cache) = offline();
        assert_eq!(cache.delete(Vec::<String>::new()).await, Ok(0));
        assert_eq!(store.calls(), 0);
    }

    #[tokio::test]
    async fn test_outage_is_suppressed() {
        let (store, cache) = offline();
        assert!(!cache.expire("session", 5).await);
        assert!(!cache.has_key("session").await);
        assert_eq!(
            cache.get_expire_in("session", TimeUnit::Minutes).await,
            Err(SoftFailure::new("get_expire"))
        );
        assert_eq!(
            cache.delete(["a", "b"]).await,
            Err(SoftFailure::new("delete"))
        );
        assert_eq!(store.calls(), 4);
    }
}
