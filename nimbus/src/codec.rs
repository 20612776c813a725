//! Value encoding between caller types and the opaque bytes the store holds.
//!
//! Values are stored as JSON, so integers and floats land as plain decimal
//! text and stay usable by the store's numeric increments.

use bytes::Bytes;
use serde::Serialize;
use serde::de::DeserializeOwned;
use shared::{Error, Result};

pub fn encode<V: Serialize + ?Sized>(value: &V) -> Result<Bytes> {
    serde_json::to_vec(value)
        .map(Bytes::from)
        .map_err(|e| Error::Serialization(e.to_string()))
}

pub fn encode_all<I>(values: I) -> Result<Vec<Bytes>>
where
    I: IntoIterator,
    I::Item: Serialize,
{
    values.into_iter().map(|value| encode(&value)).collect()
}

pub fn decode<V: DeserializeOwned>(raw: &[u8]) -> Result<V> {
    serde_json::from_slice(raw).map_err(|e| Error::Serialization(e.to_string()))
}
