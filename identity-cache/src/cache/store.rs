//! In-process cache store with TTL expiry and LRU eviction
//!
//! [`MemoryStore`] is the backend the dispatcher falls back to when none has
//! been configured. It is a real [`CacheBackend`]: keys live until their TTL
//! runs out or they are evicted, and a stored nil sentinel is kept verbatim.

use crate::cache::{
    backend::CacheBackend,
    config::StoreConfig,
    entry::StoredEntry,
    types::{CacheKey, CacheStats, CacheValue},
};
use crate::error::{CacheError, Result};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Weak};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Thread-safe in-memory backend
///
/// This implementation provides:
/// - Async access via RwLock
/// - TTL-based expiration (checked on read and by [`start_auto_cleanup`])
/// - LRU eviction when entry-count or byte limits are reached
pub struct MemoryStore {
    /// Store configuration
    pub(crate) config: StoreConfig,

    /// Internal storage
    store: Arc<RwLock<StoreState>>,
}

/// Internal storage
struct StoreState {
    /// Main storage: key -> entry
    entries: HashMap<CacheKey, StoredEntry>,

    /// Recency index: access tick -> key, first entry is least recently used
    lru_order: BTreeMap<u64, CacheKey>,

    /// Next access tick to hand out
    next_tick: u64,

    /// Current store statistics
    stats: CacheStats,

    /// Total size of stored data in bytes
    current_size_bytes: usize,
}

impl StoreState {
    fn next_tick(&mut self) -> u64 {
        let tick = self.next_tick;
        self.next_tick += 1;
        tick
    }

    /// Move `key` to the most recently used position
    fn touch(&mut self, key: &str) {
        let tick = self.next_tick();
        if let Some(entry) = self.entries.get_mut(key) {
            self.lru_order.remove(&entry.access_tick);
            entry.access_tick = tick;
            self.lru_order.insert(tick, key.to_string());
        }
    }
}

impl MemoryStore {
    /// Create a new store with the given configuration
    pub fn new(config: StoreConfig) -> Self {
        info!("Initializing memory store with config: {:?}", config);

        let store = StoreState {
            entries: HashMap::new(),
            lru_order: BTreeMap::new(),
            next_tick: 0,
            stats: CacheStats::default(),
            current_size_bytes: 0,
        };

        Self {
            config,
            store: Arc::new(RwLock::new(store)),
        }
    }

    /// Remove all expired entries, returning how many were dropped
    pub async fn cleanup_expired(&self) -> usize {
        let mut store = self.store.write().await;

        let expired_keys: Vec<CacheKey> = store
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired())
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired_keys {
            Self::remove_entry(&mut store, key);
        }
        store.stats.evictions_ttl += expired_keys.len() as u64;

        if !expired_keys.is_empty() {
            debug!("Cleaned up {} expired entries", expired_keys.len());
        }
        expired_keys.len()
    }

    /// Get store statistics
    pub async fn stats(&self) -> CacheStats {
        let store = self.store.read().await;
        let mut stats = store.stats.clone();
        stats.entries = store.entries.len();
        stats.size_bytes = store.current_size_bytes;
        stats
    }

    /// Get current store size in bytes
    pub async fn size_bytes(&self) -> usize {
        self.store.read().await.current_size_bytes
    }

    /// Get number of entries in the store
    pub async fn len(&self) -> usize {
        self.store.read().await.entries.len()
    }

    /// Check if the store is empty
    pub async fn is_empty(&self) -> bool {
        self.store.read().await.entries.is_empty()
    }

    /// Check if a key is present (without touching LRU order or stats)
    pub async fn contains_key(&self, key: &str) -> bool {
        self.store.read().await.entries.contains_key(key)
    }

    /// Raw stored value, bypassing expiry, LRU and stats; used to inspect sentinels
    pub async fn peek(&self, key: &str) -> Option<CacheValue> {
        self.store
            .read()
            .await
            .entries
            .get(key)
            .map(|entry| entry.value.clone())
    }

    fn read_locked(&self, store: &mut StoreState, key: &str) -> Option<CacheValue> {
        let metrics = self.config.enable_metrics;
        let Some(entry) = store.entries.get(key) else {
            if metrics {
                store.stats.misses += 1;
            }
            return None;
        };

        if entry.is_expired() {
            debug!("Store entry expired: {}", key);
            if metrics {
                store.stats.misses += 1;
            }
            store.stats.evictions_ttl += 1;
            Self::remove_entry(store, key);
            return None;
        }

        let value = entry.value.clone();
        if metrics {
            store.stats.hits += 1;
        }

        if self.config.enable_lru_eviction {
            store.touch(key);
        }

        Some(value)
    }

    fn write_locked(&self, store: &mut StoreState, key: &str, value: CacheValue) -> Result<()> {
        let ttl = self.config.ttl_with_jitter();

        // An overwrite leaves the store first so it is sized and evicted for
        // like an insert, and never evicts itself. If it is rejected the key
        // stays absent.
        let (mut entry, previous_tick) = match Self::remove_entry(store, key) {
            Some(mut existing) => {
                let tick = existing.access_tick;
                existing.overwrite(value, ttl);
                (existing, Some(tick))
            }
            None => (StoredEntry::new(key.to_string(), value, ttl), None),
        };

        let size = entry.size_bytes();
        self.evict_if_needed(store, size)?;

        // without LRU the order is insertion order, which an overwrite keeps
        entry.access_tick = match previous_tick {
            Some(tick) if !self.config.enable_lru_eviction => tick,
            _ => store.next_tick(),
        };
        store.lru_order.insert(entry.access_tick, key.to_string());
        store.entries.insert(key.to_string(), entry);
        store.current_size_bytes += size;
        Ok(())
    }

    /// Internal: Remove an entry from the store
    fn remove_entry(store: &mut StoreState, key: &str) -> Option<StoredEntry> {
        let entry = store.entries.remove(key)?;
        store.lru_order.remove(&entry.access_tick);
        store.current_size_bytes = store.current_size_bytes.saturating_sub(entry.size_bytes());
        Some(entry)
    }

    /// Internal: Evict entries if needed to make room for a new entry
    fn evict_if_needed(&self, store: &mut StoreState, needed_size: usize) -> Result<()> {
        if needed_size > self.config.max_size_bytes {
            warn!("Entry of {} bytes can never fit the memory store", needed_size);
            return Err(CacheError::backend(
                "memory",
                format!(
                    "entry of {} bytes exceeds store limit of {} bytes",
                    needed_size, self.config.max_size_bytes
                ),
            ));
        }

        while store.entries.len() >= self.config.max_entries {
            match store.lru_order.pop_first() {
                Some((_, key)) => {
                    debug!("Evicting entry due to max_entries limit: {}", key);
                    Self::remove_entry(store, &key);
                    store.stats.evictions_size += 1;
                }
                None => break,
            }
        }

        while store.current_size_bytes.saturating_add(needed_size) > self.config.max_size_bytes {
            match store.lru_order.pop_first() {
                Some((_, key)) => {
                    debug!("Evicting entry due to size limit: {}", key);
                    Self::remove_entry(store, &key);
                    store.stats.evictions_size += 1;
                }
                None => {
                    warn!("Cannot evict more entries, store size limit exceeded");
                    return Err(CacheError::backend(
                        "memory",
                        format!(
                            "entry of {} bytes exceeds store limit of {} bytes",
                            needed_size, self.config.max_size_bytes
                        ),
                    ));
                }
            }
        }

        Ok(())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(StoreConfig::default())
    }
}

#[async_trait]
impl CacheBackend for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn read(&self, key: &str) -> Result<Option<CacheValue>> {
        let mut store = self.store.write().await;
        Ok(self.read_locked(&mut store, key))
    }

    async fn write(&self, key: &str, value: CacheValue) -> Result<()> {
        let mut store = self.store.write().await;
        self.write_locked(&mut store, key, value)
    }

    async fn read_multi(&self, keys: &[CacheKey]) -> Result<HashMap<CacheKey, CacheValue>> {
        let mut store = self.store.write().await;
        let mut found = HashMap::with_capacity(keys.len());
        for key in keys {
            if let Some(value) = self.read_locked(&mut store, key) {
                found.insert(key.clone(), value);
            }
        }
        Ok(found)
    }

    async fn write_multi(&self, entries: Vec<(CacheKey, CacheValue)>) -> Result<()> {
        let mut store = self.store.write().await;
        for (key, value) in entries {
            self.write_locked(&mut store, &key, value)?;
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let mut store = self.store.write().await;
        let removed = Self::remove_entry(&mut store, key).is_some();
        if removed {
            store.stats.invalidations += 1;
            debug!("Deleted store entry: {}", key);
        }
        Ok(removed)
    }

    async fn clear(&self) -> Result<()> {
        let mut store = self.store.write().await;

        let count = store.entries.len();
        store.entries.clear();
        store.lru_order.clear();
        store.current_size_bytes = 0;
        store.stats.invalidations += count as u64;

        info!("Cleared {} entries from memory store", count);
        Ok(())
    }
}

/// Background task for automatic expiry sweeps
///
/// Holds only a weak reference; the task ends at its next tick once the
/// store has been dropped.
pub async fn start_auto_cleanup(store: Weak<MemoryStore>) {
    let Some(interval) = store.upgrade().map(|s| s.config.cleanup_interval) else {
        return;
    };

    info!("Starting automatic store cleanup task (interval: {:?})", interval);

    loop {
        tokio::time::sleep(interval).await;
        let Some(live) = store.upgrade() else {
            debug!("Memory store dropped, stopping cleanup task");
            return;
        };
        let removed = live.cleanup_expired().await;
        if removed > 0 {
            debug!("Auto cleanup removed {} entries", removed);
        }
    }
}
