use super::{CacheFacade, settle};
use crate::codec;
use crate::domain::Soft;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashSet;
use std::hash::Hash;

impl CacheFacade {
    pub async fn set_members<V>(&self, key: &str) -> Soft<HashSet<V>>
    where
        V: DeserializeOwned + Eq + Hash,
    {
        let outcome = async {
            self.store
                .set_members(key)
                .await?
                .iter()
                .map(|raw| codec::decode(raw))
                .collect::<shared::Result<HashSet<V>>>()
        }
        .await;
        settle("set_members", key, outcome)
    }

    pub async fn set_contains<V: Serialize + ?Sized>(&self, key: &str, value: &V) -> bool {
        let outcome = async { self.store.set_is_member(key, codec::encode(value)?).await }.await;
        settle("set_contains", key, outcome).unwrap_or(false)
    }

    /// Adds the values and returns how many were not already members.
    pub async fn set_add<I>(&self, key: &str, values: I) -> Soft<u64>
    where
        I: IntoIterator,
        I::Item: Serialize,
    {
        let outcome = async { self.store.set_add(key, codec::encode_all(values)?).await }.await;
        settle("set_add", key, outcome)
    }

    pub async fn set_size(&self, key: &str) -> Soft<u64> {
        settle("set_size", key, self.store.set_cardinality(key).await)
    }

    /// Removes the values and returns how many were members.
    pub async fn set_remove<I>(&self, key: &str, values: I) -> Soft<u64>
    where
        I: IntoIterator,
        I::Item: Serialize,
    {
        let outcome = async { self.store.set_remove(key, codec::encode_all(values)?).await }.await;
        settle("set_remove", key, outcome)
    }
}

#[cfg(test)]
mod tests {
    use crate::domain::SoftFailure;
    use crate::facade::CacheFacade;
    use crate::facade::testing::OfflineStore;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_outage_is_suppressed() {
        let store = Arc::new(OfflineStore::default());
        let cache = CacheFacade::new(store.clone());

        assert_eq!(
            cache.set_members::<String>("tags").await,
            Err(SoftFailure::new("set_members"))
        );
        assert!(!cache.set_contains("tags", "rust").await);
        assert_eq!(
            cache.set_add("tags", ["rust", "cache"]).await,
            Err(SoftFailure::new("set_add"))
        );
        assert_eq!(cache.set_size("tags").await, Err(SoftFailure::new("set_size")));
        assert_eq!(
            cache.set_remove("tags", ["rust"]).await,
            Err(SoftFailure::new("set_remove"))
        );
        assert_eq!(store.calls(), 5);
    }
}
