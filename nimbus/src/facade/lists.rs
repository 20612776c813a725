use super::{CacheFacade, settle};
use crate::codec;
use crate::domain::Soft;
use serde::Serialize;
use serde::de::DeserializeOwned;

impl CacheFacade {
    /// Elements `start..=end`; negative indices count from the tail, so
    /// `(0, -1)` is the whole list.
    pub async fn list_range<V: DeserializeOwned>(
        &self,
        key: &str,
        start: i64,
        end: i64,
    ) -> Soft<Vec<V>> {
        let outcome = async {
            self.store
                .list_range(key, start, end)
                .await?
                .iter()
                .map(|raw| codec::decode(raw))
                .collect::<shared::Result<Vec<V>>>()
        }
        .await;
        settle("list_range", key, outcome)
    }

    pub async fn list_range_all<V: DeserializeOwned>(&self, key: &str) -> Soft<Vec<V>> {
        self.list_range(key, 0, -1).await
    }

    pub async fn list_size(&self, key: &str) -> Soft<u64> {
        settle("list_size", key, self.store.list_len(key).await)
    }

    pub async fn list_get_at<V: DeserializeOwned>(&self, key: &str, index: i64) -> Option<V> {
        let outcome = async {
            match self.store.list_index(key, index).await? {
                Some(raw) => codec::decode(&raw).map(Some),
                None => Ok(None),
            }
        }
        .await;
        settle("list_get_at", key, outcome).ok().flatten()
    }

    /// Appends to the tail and returns the new length.
    pub async fn list_right_push<V: Serialize + ?Sized>(&self, key: &str, value: &V) -> Soft<u64> {
        let outcome = async {
            let raw = codec::encode(value)?;
            self.store.list_push_back(key, vec![raw]).await
        }
        .await;
        settle("list_right_push", key, outcome)
    }

    pub async fn list_right_push_all<I>(&self, key: &str, values: I) -> Soft<u64>
    where
        I: IntoIterator,
        I::Item: Serialize,
    {
        let outcome =
            async { self.store.list_push_back(key, codec::encode_all(values)?).await }.await;
        settle("list_right_push_all", key, outcome)
    }

    /// Prepends to the head and returns the new length.
    pub async fn list_left_push<V: Serialize + ?Sized>(&self, key: &str, value: &V) -> Soft<u64> {
        let outcome = async {
            let raw = codec::encode(value)?;
            self.store.list_push_front(key, vec![raw]).await
        }
        .await;
        settle("list_left_push", key, outcome)
    }

    /// Pushes each value onto the head in turn, so they end up in reverse
    /// order in front of the existing elements.
    pub async fn list_left_push_all<I>(&self, key: &str, values: I) -> Soft<u64>
    where
        I: IntoIterator,
        I::Item: Serialize,
    {
        let outcome =
            async { self.store.list_push_front(key, codec::encode_all(values)?).await }.await;
        settle("list_left_push_all", key, outcome)
    }

    /// `false` when the index is out of range or the list does not exist.
    pub async fn list_set_at<V: Serialize + ?Sized>(&self, key: &str, index: i64, value: &V) -> bool {
        let outcome = async {
            let raw = codec::encode(value)?;
            self.store.list_set(key, index, raw).await
        }
        .await;
        settle("list_set_at", key, outcome).is_ok()
    }

    /// Removes elements equal to `value`: up to `count` from the head when
    /// `count > 0`, up to `-count` from the tail when `count < 0`, all of
    /// them when `count == 0`. Returns how many were removed.
    pub async fn list_remove<V: Serialize + ?Sized>(
        &self,
        key: &str,
        count: i64,
        value: &V,
    ) -> Soft<u64> {
        let outcome = async {
            let raw = codec::encode(value)?;
            self.store.list_remove(key, count, raw).await
        }
        .await;
        settle("list_remove", key, outcome)
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
            cache.list_range::<String>("queue", 0, 10).await,
            Err(SoftFailure::new("list_range"))
        );
        assert_eq!(
            cache.list_range_all::<String>("queue").await,
            Err(SoftFailure::new("list_range"))
        );
        assert_eq!(cache.list_size("queue").await, Err(SoftFailure::new("list_size")));
        assert_eq!(cache.list_get_at::<String>("queue", 0).await, None);
        assert_eq!(
            cache.list_right_push("queue", "job-1").await,
            Err(SoftFailure::new("list_right_push"))
        );
        assert_eq!(
            cache.list_right_push_all("queue", vec!["job-2", "job-3"]).await,
            Err(SoftFailure::new("list_right_push_all"))
        );
        assert_eq!(
            cache.list_left_push("queue", "job-0").await,
            Err(SoftFailure::new("list_left_push"))
        );
        assert_eq!(
            cache.list_left_push_all("queue", ["a", "b"]).await,
            Err(SoftFailure::new("list_left_push_all"))
        );
        assert!(!cache.list_set_at("queue", 0, "job-9").await);
        assert_eq!(
            cache.list_remove("queue", 0, "job-1").await,
            Err(SoftFailure::new("list_remove"))
        );
        assert_eq!(store.calls(), 10);
    }
}
