//! Stored entries for the in-process memory store

use crate::cache::types::{CacheKey, CacheValue};
use chrono::{DateTime, Utc};
use std::time::Duration;

/// A value held by [`MemoryStore`](crate::cache::MemoryStore) with its expiry
#[derive(Debug, Clone)]
pub struct StoredEntry {
    /// The cache key
    pub key: CacheKey,

    /// The stored wire value (may be the nil sentinel)
    pub value: CacheValue,

    /// When the entry expires
    pub expires_at: DateTime<Utc>,

    /// Position in the store's recency order; larger is more recent
    pub(crate) access_tick: u64,
}

impl StoredEntry {
    /// Create a new entry expiring after `ttl`
    pub fn new(key: CacheKey, value: CacheValue, ttl: Duration) -> Self {
        Self {
            key,
            value,
            expires_at: expiry_from(Utc::now(), ttl),
            access_tick: 0,
        }
    }

    /// Check if the entry has expired
    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }

    /// Replace the value and restart the TTL
    pub fn overwrite(&mut self, value: CacheValue, ttl: Duration) {
        self.value = value;
        self.expires_at = expiry_from(Utc::now(), ttl);
    }

    /// Approximate footprint: key + value + bookkeeping
    pub fn size_bytes(&self) -> usize {
        self.key.len() + self.value.len() + std::mem::size_of::<Self>()
    }
}

fn expiry_from(now: DateTime<Utc>, ttl: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(ttl)
        .ok()
        .and_then(|ttl| now.checked_add_signed(ttl))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn test_entry_creation() {
        let entry = StoredEntry::new(
            "test_key".to_string(),
            "\"test_value\"".to_string(),
            Duration::from_secs(3600),
        );

        assert_eq!(entry.key, "test_key");
        assert!(!entry.is_expired());
        assert!(entry.expires_at <= Utc::now() + chrono::Duration::seconds(3600));
    }

    #[test]
    fn test_entry_expiration() {
        let entry = StoredEntry::new(
            "test".to_string(),
            "1".to_string(),
            Duration::from_millis(100),
        );

        assert!(!entry.is_expired());
        sleep(Duration::from_millis(150));
        assert!(entry.is_expired());
    }

    #[test]
    fn test_overwrite_restarts_ttl() {
        let mut entry = StoredEntry::new(
            "test".to_string(),
            "1".to_string(),
            Duration::from_millis(50),
        );
        let first_expiry = entry.expires_at;

        entry.overwrite("2".to_string(), Duration::from_secs(60));

        assert_eq!(entry.value, "2");
        assert!(entry.expires_at > first_expiry);
    }

    #[test]
    fn test_huge_ttl_saturates() {
        let entry = StoredEntry::new("k".to_string(), "v".to_string(), Duration::MAX);
        assert_eq!(entry.expires_at, DateTime::<Utc>::MAX_UTC);
        assert!(!entry.is_expired());
    }

    #[test]
    fn test_size_bytes() {
        let entry = StoredEntry::new("key".to_string(), "value".to_string(), Duration::from_secs(1));
        assert!(entry.size_bytes() >= "key".len() + "value".len());
    }
}
