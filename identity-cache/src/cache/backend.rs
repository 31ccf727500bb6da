//! Backing key-value store interface
//!
//! The dispatcher talks to any store through [`CacheBackend`]. The trait is
//! object-safe so the active backend can be swapped at runtime behind an
//! `Arc<dyn CacheBackend>`.
//!
//! # Contract
//!
//! - `read` returns `None` only when the key is absent. A stored nil sentinel
//!   is returned like any other value.
//! - Values are opaque strings; implementations must store the sentinel token
//!   verbatim.
//! - Failures are reported as [`CacheError::BackendUnavailable`](crate::CacheError)
//!   and are never retried by the caller.

use crate::cache::types::{CacheKey, CacheValue};
use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;

/// Pluggable key-value store
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Short name used in logs and errors
    fn name(&self) -> &str;

    /// Read one key; `None` means the key is absent
    async fn read(&self, key: &str) -> Result<Option<CacheValue>>;

    /// Write one key
    async fn write(&self, key: &str, value: CacheValue) -> Result<()>;

    /// Read several keys in one round trip; absent keys are left out of the map
    async fn read_multi(&self, keys: &[CacheKey]) -> Result<HashMap<CacheKey, CacheValue>> {
        let mut found = HashMap::with_capacity(keys.len());
        for key in keys {
            if let Some(value) = self.read(key).await? {
                found.insert(key.clone(), value);
            }
        }
        Ok(found)
    }

    /// Write several keys in one round trip
    async fn write_multi(&self, entries: Vec<(CacheKey, CacheValue)>) -> Result<()> {
        for (key, value) in entries {
            self.write(&key, value).await?;
        }
        Ok(())
    }

    /// Remove one key, reporting whether it was present
    async fn delete(&self, key: &str) -> Result<bool>;

    /// Remove every key
    async fn clear(&self) -> Result<()>;
}
