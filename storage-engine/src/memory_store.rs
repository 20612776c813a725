use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry as Slot;
use nimbus::domain::KeyTtl;
use nimbus::ports::CacheStore;
use shared::{Error, Result};
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::debug;

/// In-process store with the same observable behaviour as the remote one:
/// typed keys, TTL expiry, store-side errors, and collections that vanish
/// once emptied.
///
/// Expired keys are dropped when next touched. Keys that are never touched
/// again are only reclaimed by [`MemoryStore::spawn_sweeper`].
pub struct MemoryStore {
    entries: DashMap<String, Entry>,
}

struct Entry {
    value: Value,
    expires_at: Option<Instant>,
}

enum Value {
    Scalar(Bytes),
    Hash(HashMap<String, Bytes>),
    Set(HashSet<Bytes>),
    List(VecDeque<Bytes>),
}

impl Entry {
    fn persistent(value: Value) -> Self {
        Self {
            value,
            expires_at: None,
        }
    }

    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|deadline| deadline <= now)
    }
}

impl Value {
    fn is_empty_collection(&self) -> bool {
        match self {
            Value::Scalar(_) => false,
            Value::Hash(hash) => hash.is_empty(),
            Value::Set(set) => set.is_empty(),
            Value::List(list) => list.is_empty(),
        }
    }

    fn scalar(&self) -> Result<&Bytes> {
        match self {
            Value::Scalar(raw) => Ok(raw),
            _ => Err(Error::WrongType),
        }
    }

    fn hash(&self) -> Result<&HashMap<String, Bytes>> {
        match self {
            Value::Hash(hash) => Ok(hash),
            _ => Err(Error::WrongType),
        }
    }

    fn hash_mut(&mut self) -> Result<&mut HashMap<String, Bytes>> {
        match self {
            Value::Hash(hash) => Ok(hash),
            _ => Err(Error::WrongType),
        }
    }

    fn set(&self) -> Result<&HashSet<Bytes>> {
        match self {
            Value::Set(set) => Ok(set),
            _ => Err(Error::WrongType),
        }
    }

    fn set_mut(&mut self) -> Result<&mut HashSet<Bytes>> {
        match self {
            Value::Set(set) => Ok(set),
            _ => Err(Error::WrongType),
        }
    }

    fn list(&self) -> Result<&VecDeque<Bytes>> {
        match self {
            Value::List(list) => Ok(list),
            _ => Err(Error::WrongType),
        }
    }

    fn list_mut(&mut self) -> Result<&mut VecDeque<Bytes>> {
        match self {
            Value::List(list) => Ok(list),
            _ => Err(Error::WrongType),
        }
    }
}

impl MemoryStore {
    pub const SWEEP_INTERVAL: Duration = Duration::from_secs(30);

    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Drops every expired key and returns how many were removed.
    pub fn purge_all_expired(&self) -> usize {
        let now = Instant::now();
        let mut purged = 0;
        self.entries.retain(|_, entry| {
            let expired = entry.is_expired(now);
            purged += usize::from(expired);
            !expired
        });
        purged
    }

    /// Purges expired keys every `period` on a background task. The task
    /// holds only a weak handle and ends once the store is dropped.
    pub fn spawn_sweeper(self: &Arc<Self>, period: Duration) -> JoinHandle<()> {
        let store = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                let Some(store) = store.upgrade() else {
                    break;
                };
                let purged = store.purge_all_expired();
                if purged > 0 {
                    debug!(purged, "expired keys swept");
                }
            }
        })
    }

    fn purge_expired(&self, key: &str) {
        let now = Instant::now();
        self.entries.remove_if(key, |_, entry| entry.is_expired(now));
    }

    /// Runs `f` against a live key; `None` when the key is absent.
    fn read<T>(&self, key: &str, f: impl FnOnce(&Value) -> Result<T>) -> Result<Option<T>> {
        self.purge_expired(key);
        match self.entries.get(key) {
            Some(entry) => f(&entry.value).map(Some),
            None => Ok(None),
        }
    }

    /// Mutates a live key in place and drops it if that emptied a collection.
    fn modify<T>(&self, key: &str, f: impl FnOnce(&mut Value) -> Result<T>) -> Result<Option<T>> {
        self.purge_expired(key);
        let outcome = match self.entries.get_mut(key) {
            Some(mut entry) => f(&mut entry.value).map(Some),
            None => return Ok(None),
        };
        self.entries
            .remove_if(key, |_, entry| entry.value.is_empty_collection());
        outcome
    }

    /// Mutates a key, creating it from `empty` first if it is absent.
    fn upsert<T>(
        &self,
        key: &str,
        empty: fn() -> Value,
        f: impl FnOnce(&mut Value) -> Result<T>,
    ) -> Result<T> {
        self.purge_expired(key);
        let outcome = {
            let mut entry = self
                .entries
                .entry(key.to_owned())
                .or_insert_with(|| Entry::persistent(empty()));
            f(&mut entry.value)
        };
        self.entries
            .remove_if(key, |_, entry| entry.value.is_empty_collection());
        outcome
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn require_arguments<T>(values: &[T], command: &str) -> Result<()> {
    if values.is_empty() {
        return Err(Error::Store(format!(
            "wrong number of arguments for '{command}' command"
        )));
    }
    Ok(())
}

fn parse_integer(raw: &[u8]) -> Result<i64> {
    std::str::from_utf8(raw)
        .ok()
        .and_then(|text| text.parse::<i64>().ok())
        .ok_or_else(|| Error::Store("value is not an integer or out of range".into()))
}

fn parse_float(raw: &[u8]) -> Result<f64> {
    std::str::from_utf8(raw)
        .ok()
        .and_then(|text| text.parse::<f64>().ok())
        .ok_or_else(|| Error::Store("hash value is not a float".into()))
}

/// Resolves a possibly negative index against a list length.
fn resolve_index(len: usize, index: i64) -> Option<usize> {
    let len = i64::try_from(len).ok()?;
    let index = if index < 0 { len + index } else { index };
    (0..len).contains(&index).then(|| index as usize)
}

/// Clamps an inclusive, possibly negative range; `None` when it selects nothing.
fn resolve_range(len: usize, start: i64, end: i64) -> Option<(usize, usize)> {
    let len = i64::try_from(len).ok()?;
    let start = if start < 0 { (len + start).max(0) } else { start };
    let end = if end < 0 { len + end } else { end.min(len - 1) };
    if start > end || start >= len {
        return None;
    }
    Some((start as usize, end as usize))
}

fn remove_matching(list: &mut VecDeque<Bytes>, count: i64, value: &Bytes) -> u64 {
    let limit = match count {
        0 => usize::MAX,
        n => usize::try_from(n.unsigned_abs()).unwrap_or(usize::MAX),
    };
    let mut removed = 0;
    if count >= 0 {
        let mut i = 0;
        while i < list.len() && removed < limit {
            if list[i] == *value {
                list.remove(i);
                removed += 1;
            } else {
                i += 1;
            }
        }
    } else {
        let mut i = list.len();
        while i > 0 && removed < limit {
            i -= 1;
            if list[i] == *value {
                list.remove(i);
                removed += 1;
            }
        }
    }
    removed as u64
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn exists(&self, key: &str) -> Result<bool> {
        self.purge_expired(key);
        Ok(self.entries.contains_key(key))
    }

    async fn delete(&self, keys: &[String]) -> Result<u64> {
        let mut removed = 0;
        for key in keys {
            self.purge_expired(key);
            if self.entries.remove(key).is_some() {
                removed += 1;
            }
        }
        Ok(removed)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool> {
        self.purge_expired(key);
        match self.entries.get_mut(key) {
            Some(mut entry) => {
                entry.expires_at = Some(Instant::now() + ttl);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn ttl(&self, key: &str) -> Result<KeyTtl> {
        self.purge_expired(key);
        let now = Instant::now();
        Ok(match self.entries.get(key) {
            None => KeyTtl::Missing,
            Some(entry) => match entry.expires_at {
                None => KeyTtl::Persistent,
                Some(deadline) => KeyTtl::Expires(deadline.saturating_duration_since(now)),
            },
        })
    }

    async fn get(&self, key: &str) -> Result<Option<Bytes>> {
        self.read(key, |value| value.scalar().cloned())
    }

    async fn set(&self, key: &str, value: Bytes) -> Result<()> {
        self.purge_expired(key);
        match self.entries.entry(key.to_owned()) {
            Slot::Occupied(mut slot) => slot.get_mut().value = Value::Scalar(value),
            Slot::Vacant(slot) => {
                slot.insert(Entry::persistent(Value::Scalar(value)));
            }
        }
        Ok(())
    }

    async fn set_with_expiry(&self, key: &str, value: Bytes, ttl: Duration) -> Result<()> {
        let entry = Entry {
            value: Value::Scalar(value),
            expires_at: Some(Instant::now() + ttl),
        };
        self.entries.insert(key.to_owned(), entry);
        Ok(())
    }

    async fn increment_by(&self, key: &str, delta: i64) -> Result<i64> {
        self.upsert(
            key,
            || Value::Scalar(Bytes::from_static(b"0")),
            |value| {
                let current = parse_integer(value.scalar()?)?;
                let next = current.checked_add(delta).ok_or_else(|| {
                    Error::Store("increment or decrement would overflow".into())
                })?;
                *value = Value::Scalar(Bytes::from(next.to_string()));
                Ok(next)
            },
        )
    }

    async fn hash_get(&self, key: &str, field: &str) -> Result<Option<Bytes>> {
        Ok(self
            .read(key, |value| Ok(value.hash()?.get(field).cloned()))?
            .flatten())
    }

    async fn hash_get_all(&self, key: &str) -> Result<HashMap<String, Bytes>> {
        Ok(self
            .read(key, |value| Ok(value.hash()?.clone()))?
            .unwrap_or_default())
    }

    async fn hash_set_many(&self, key: &str, entries: Vec<(String, Bytes)>) -> Result<()> {
        require_arguments(&entries, "hset")?;
        self.upsert(key, || Value::Hash(HashMap::new()), |value| {
            value.hash_mut()?.extend(entries);
            Ok(())
        })
    }

    async fn hash_set(&self, key: &str, field: &str, value: Bytes) -> Result<()> {
        self.hash_set_many(key, vec![(field.to_owned(), value)]).await
    }

    async fn hash_delete(&self, key: &str, fields: &[String]) -> Result<u64> {
        require_arguments(fields, "hdel")?;
        Ok(self
            .modify(key, |value| {
                let hash = value.hash_mut()?;
                Ok(fields.iter().filter(|f| hash.remove(*f).is_some()).count() as u64)
            })?
            .unwrap_or(0))
    }

    async fn hash_exists(&self, key: &str, field: &str) -> Result<bool> {
        Ok(self
            .read(key, |value| Ok(value.hash()?.contains_key(field)))?
            .unwrap_or(false))
    }

    async fn hash_increment_by_float(&self, key: &str, field: &str, amount: f64) -> Result<f64> {
        self.upsert(key, || Value::Hash(HashMap::new()), |value| {
            let hash = value.hash_mut()?;
            let current = match hash.get(field) {
                Some(raw) => parse_float(raw)?,
                None => 0.0,
            };
            let next = current + amount;
            if !next.is_finite() {
                return Err(Error::Store(
                    "increment would produce NaN or Infinity".into(),
                ));
            }
            hash.insert(field.to_owned(), Bytes::from(next.to_string()));
            Ok(next)
        })
    }

    async fn set_members(&self, key: &str) -> Result<Vec<Bytes>> {
        Ok(self
            .read(key, |value| Ok(value.set()?.iter().cloned().collect()))?
            .unwrap_or_default())
    }

    async fn set_is_member(&self, key: &str, member: Bytes) -> Result<bool> {
        Ok(self
            .read(key, |value| Ok(value.set()?.contains(&member)))?
            .unwrap_or(false))
    }

    async fn set_add(&self, key: &str, members: Vec<Bytes>) -> Result<u64> {
        require_arguments(&members, "sadd")?;
        self.upsert(key, || Value::Set(HashSet::new()), |value| {
            let set = value.set_mut()?;
            Ok(members.into_iter().filter(|m| set.insert(m.clone())).count() as u64)
        })
    }

    async fn set_cardinality(&self, key: &str) -> Result<u64> {
        Ok(self
            .read(key, |value| Ok(value.set()?.len() as u64))?
            .unwrap_or(0))
    }

    async fn set_remove(&self, key: &str, members: Vec<Bytes>) -> Result<u64> {
        require_arguments(&members, "srem")?;
        Ok(self
            .modify(key, |value| {
                let set = value.set_mut()?;
                Ok(members.iter().filter(|m| set.remove(*m)).count() as u64)
            })?
            .unwrap_or(0))
    }

    async fn list_range(&self, key: &str, start: i64, end: i64) -> Result<Vec<Bytes>> {
        Ok(self
            .read(key, |value| {
                let list = value.list()?;
                Ok(match resolve_range(list.len(), start, end) {
                    Some((from, to)) => list.range(from..=to).cloned().collect(),
                    None => Vec::new(),
                })
            })?
            .unwrap_or_default())
    }

    async fn list_len(&self, key: &str) -> Result<u64> {
        Ok(self
            .read(key, |value| Ok(value.list()?.len() as u64))?
            .unwrap_or(0))
    }

    async fn list_index(&self, key: &str, index: i64) -> Result<Option<Bytes>> {
        Ok(self
            .read(key, |value| {
                let list = value.list()?;
                Ok(resolve_index(list.len(), index).map(|i| list[i].clone()))
            })?
            .flatten())
    }

    async fn list_push_back(&self, key: &str, values: Vec<Bytes>) -> Result<u64> {
        require_arguments(&values, "rpush")?;
        self.upsert(key, || Value::List(VecDeque::new()), |value| {
            let list = value.list_mut()?;
            list.extend(values);
            Ok(list.len() as u64)
        })
    }

    async fn list_push_front(&self, key: &str, values: Vec<Bytes>) -> Result<u64> {
        require_arguments(&values, "lpush")?;
        self.upsert(key, || Value::List(VecDeque::new()), |value| {
            let list = value.list_mut()?;
            for item in values {
                list.push_front(item);
            }
            Ok(list.len() as u64)
        })
    }

    async fn list_set(&self, key: &str, index: i64, value: Bytes) -> Result<()> {
        self.modify(key, |current| {
            let list = current.list_mut()?;
            let slot = resolve_index(list.len(), index)
                .ok_or_else(|| Error::Store("index out of range".into()))?;
            list[slot] = value;
            Ok(())
        })?
        .ok_or_else(|| Error::Store("no such key".into()))
    }

    async fn list_remove(&self, key: &str, count: i64, value: Bytes) -> Result<u64> {
        Ok(self
            .modify(key, |current| Ok(remove_matching(current.list_mut()?, count, &value)))?
            .unwrap_or(0))
    }
}

impl Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("entry_count", &self.entries.len())
            .finish()
    }
}
