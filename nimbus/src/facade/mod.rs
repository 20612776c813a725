//! The cache facade: uniform operations over scalars, hashes, sets and lists
//! held by a remote store.
//!
//! Store, transport and serialization errors never escape. Each operation
//! logs the cause and answers with its failure shape instead:
//!
//! * boolean operations answer `false`;
//! * single-value reads answer `None` (absent and failed look the same);
//! * counts and collections answer `Err(SoftFailure)`.
//!
//! The only hard error is a negative delta passed to
//! [`CacheFacade::increment`] or [`CacheFacade::decrement`], which is
//! rejected before the store is contacted.

mod hashes;
mod keys;
mod lists;
mod sets;
mod values;

use crate::domain::{Soft, SoftFailure};
use crate::ports::CacheStore;
use std::sync::Arc;
use tracing::{info, warn};

/// Application-facing cache API over a single shared store handle.
#[derive(Clone)]
pub struct CacheFacade {
    store: Arc<dyn CacheStore>,
}

impl CacheFacade {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self { store }
    }

    /// Releases this facade's hold on the store handle. The connection closes
    /// once the last clone is shut down or dropped.
    pub fn shutdown(self) {
        let owners = Arc::strong_count(&self.store);
        drop(self.store);
        info!(remaining_owners = owners - 1, "cache facade shut down");
    }
}

impl std::fmt::Debug for CacheFacade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheFacade")
            .field("store", &"<dyn CacheStore>")
            .finish()
    }
}

/// Converts a store outcome into the facade's soft-failure shape, logging the
/// cause.
fn settle<T>(op: &'static str, key: &str, result: shared::Result<T>) -> Soft<T> {
    result.map_err(|error| {
        warn!(op, key, %error, "cache operation failed, returning soft failure");
        SoftFailure::new(op)
    })
}

#[cfg(test)]
pub(crate) mod testing {
    use crate::domain::KeyTtl;
    use crate::ports::CacheStore;
    use async_trait::async_trait;
    use bytes::Bytes;
    use shared::{Error, Result};
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    type Fields = HashMap<(String, String), Bytes>;

    /// A store whose every call fails as if the server were unreachable,
    /// unless built with [`OfflineStore::hashes_only`].
    #[derive(Default)]
    pub struct OfflineStore {
        calls: AtomicUsize,
        hashes: Option<Mutex<Fields>>,
        expire_outcome: Option<Result<bool>>,
    }

    impl OfflineStore {
        /// Hash reads and writes succeed and `expire` answers with
        /// `expire_outcome`; everything else is still refused.
        pub fn hashes_only(expire_outcome: Result<bool>) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                hashes: Some(Mutex::default()),
                expire_outcome: Some(expire_outcome),
            }
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn refuse<T>(&self) -> Result<T> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(Error::Connection("connection refused".into()))
        }

        fn with_hashes<T>(&self, f: impl FnOnce(&mut Fields) -> T) -> Result<T> {
            let Some(hashes) = &self.hashes else {
                return self.refuse();
            };
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(f(&mut hashes.lock().unwrap()))
        }
    }

    #[async_trait]
    impl CacheStore for OfflineStore {
        async fn exists(&self, _key: &str) -> Result<bool> {
            self.refuse()
        }
        async fn delete(&self, _keys: &[String]) -> Result<u64> {
            self.refuse()
        }
        async fn expire(&self, _key: &str, _ttl: Duration) -> Result<bool> {
            match &self.expire_outcome {
                Some(outcome) => {
                    self.calls.fetch_add(1, Ordering::SeqCst);
                    outcome.clone()
                }
                None => self.refuse(),
            }
        }
        async fn ttl(&self, _key: &str) -> Result<KeyTtl> {
            self.refuse()
        }
        async fn get(&self, _key: &str) -> Result<Option<Bytes>> {
            self.refuse()
        }
        async fn set(&self, _key: &str, _value: Bytes) -> Result<()> {
            self.refuse()
        }
        async fn set_with_expiry(&self, _key: &str, _value: Bytes, _ttl: Duration) -> Result<()> {
            self.refuse()
        }
        async fn increment_by(&self, _key: &str, _delta: i64) -> Result<i64> {
            self.refuse()
        }
        async fn hash_get(&self, key: &str, field: &str) -> Result<Option<Bytes>> {
            self.with_hashes(|hashes| hashes.get(&(key.to_owned(), field.to_owned())).cloned())
        }
        async fn hash_get_all(&self, _key: &str) -> Result<HashMap<String, Bytes>> {
            self.refuse()
        }
        async fn hash_set_many(&self, key: &str, entries: Vec<(String, Bytes)>) -> Result<()> {
            self.with_hashes(|hashes| {
                for (field, value) in entries {
                    hashes.insert((key.to_owned(), field), value);
                }
            })
        }
        async fn hash_set(&self, key: &str, field: &str, value: Bytes) -> Result<()> {
            self.with_hashes(|hashes| {
                hashes.insert((key.to_owned(), field.to_owned()), value);
            })
        }
        async fn hash_delete(&self, _key: &str, _fields: &[String]) -> Result<u64> {
            self.refuse()
        }
        async fn hash_exists(&self, _key: &str, _field: &str) -> Result<bool> {
            self.refuse()
        }
        async fn hash_increment_by_float(&self, _key: &str, _field: &str, _amount: f64) -> Result<f64> {
            self.refuse()
        }
        async fn set_members(&self, _key: &str) -> Result<Vec<Bytes>> {
            self.refuse()
        }
        async fn set_is_member(&self, _key: &str, _member: Bytes) -> Result<bool> {
            self.refuse()
        }
        async fn set_add(&self, _key: &str, _members: Vec<Bytes>) -> Result<u64> {
            self.refuse()
        }
        async fn set_cardinality(&self, _key: &str) -> Result<u64> {
            self.refuse()
        }
        async fn set_remove(&self, _key: &str, _members: Vec<Bytes>) -> Result<u64> {
            self.refuse()
        }
        async fn list_range(&self, _key: &str, _start: i64, _end: i64) -> Result<Vec<Bytes>> {
            self.refuse()
        }
        async fn list_len(&self, _key: &str) -> Result<u64> {
            self.refuse()
        }
        async fn list_index(&self, _key: &str, _index: i64) -> Result<Option<Bytes>> {
            self.refuse()
        }
        async fn list_push_back(&self, _key: &str, _values: Vec<Bytes>) -> Result<u64> {
            self.refuse()
        }
        async fn list_push_front(&self, _key: &str, _values: Vec<Bytes>) -> Result<u64> {
            self.refuse()
        }
        async fn list_set(&self, _key: &str, _index: i64, _value: Bytes) -> Result<()> {
            self.refuse()
        }
        async fn list_remove(&self, _key: &str, _count: i64, _value: Bytes) -> Result<u64> {
            self.refuse()
        }
    }
}
