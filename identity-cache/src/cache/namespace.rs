//! Versioned key namespace
//!
//! Every deployment writes under a prefix that encodes the stored format
//! version, so incompatible formats never collide under the same key.

use crate::cache::types::CacheKey;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Version of the stored value format
pub const CACHE_VERSION: u32 = 5;

/// Process-wide key prefix
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheNamespace(String);

impl CacheNamespace {
    /// Use `prefix` verbatim
    pub fn new(prefix: impl Into<String>) -> Self {
        Self(prefix.into())
    }

    /// Prefix of the form `IDC:<version>:`
    pub fn versioned(version: u32) -> Self {
        Self(format!("IDC:{}:", version))
    }

    /// The raw prefix
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Prefix `suffix` with this namespace
    pub fn key(&self, suffix: impl AsRef<str>) -> CacheKey {
        format!("{}{}", self.0, suffix.as_ref())
    }
}

impl Default for CacheNamespace {
    fn default() -> Self {
        Self::versioned(CACHE_VERSION)
    }
}

impl fmt::Display for CacheNamespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
