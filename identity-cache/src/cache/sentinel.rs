//! Nil-sentinel codec
//!
//! Most key-value stores report a miss only as "key absent", so an absent
//! application value cannot be cached as-is. Absent values are stored as
//! [`CACHED_NIL`] instead and mapped back on the way out. The token is not
//! valid JSON, so no serialized application value can ever equal it.

use crate::cache::types::CacheValue;
use crate::error::Result;
use serde::{de::DeserializeOwned, Serialize};

/// Reserved wire token meaning "computed, and the answer was nothing"
pub const CACHED_NIL: &str = "\u{0}idc:cached_nil";

/// Whether a stored value is the nil sentinel
pub fn is_cached_nil(value: &str) -> bool {
    value == CACHED_NIL
}

/// Map an absent value to the sentinel; present values pass through
pub fn map_cached_nil(value: Option<CacheValue>) -> CacheValue {
    value.unwrap_or_else(|| CACHED_NIL.to_string())
}

/// Map the sentinel back to an absent value; anything else passes through
pub fn unmap_cached_nil(value: CacheValue) -> Option<CacheValue> {
    if is_cached_nil(&value) {
        None
    } else {
        Some(value)
    }
}

/// Serialize an application value into its stored form
pub fn encode<T: Serialize>(value: Option<&T>) -> Result<CacheValue> {
    let raw = value.map(serde_json::to_string).transpose()?;
    Ok(map_cached_nil(raw))
}

/// Deserialize a stored value back into an application value
pub fn decode<T: DeserializeOwned>(value: CacheValue) -> Result<Option<T>> {
    match unmap_cached_nil(value) {
        Some(json) => Ok(Some(serde_json::from_str(&json)?)),
        None => Ok(None),
    }
}
