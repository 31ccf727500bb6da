//! Memoizing proxy in front of the backing store
//!
//! [`MemoizedCacheProxy`] owns the swappable backend reference. Every
//! operation takes an optional [`Memo`]: with one, reads are answered from the
//! memo when possible and every successful backend read or write is recorded
//! in it, so a unit of work never asks the backend twice for the same key and
//! always observes its own writes.
//!
//! Memos are owned by the caller's unit of work, never by the proxy. Swapping
//! the backend therefore leaves every in-flight memo intact.

use crate::cache::{
    backend::CacheBackend,
    types::{CacheKey, CacheValue, ProxyStats},
};
use crate::error::{CacheError, Result};
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

/// Per-unit-of-work record of backend results
///
/// `Some(value)` is a known stored value, `None` a known backend miss.
#[derive(Debug, Default)]
pub struct Memo {
    entries: Mutex<HashMap<CacheKey, Option<CacheValue>>>,
}

impl Memo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Memoized result for `key`, if the key was seen in this unit of work
    pub async fn get(&self, key: &str) -> Option<Option<CacheValue>> {
        self.entries.lock().await.get(key).cloned()
    }

    pub async fn insert(&self, key: CacheKey, value: Option<CacheValue>) {
        self.entries.lock().await.insert(key, value);
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }

    pub async fn clear(&self) {
        self.entries.lock().await.clear();
    }
}

#[derive(Debug, Default)]
struct Counters {
    memo_hits: AtomicU64,
    backend_reads: AtomicU64,
    backend_batch_reads: AtomicU64,
    backend_writes: AtomicU64,
    resolver_calls: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> ProxyStats {
        ProxyStats {
            memo_hits: self.memo_hits.load(Ordering::Relaxed),
            backend_reads: self.backend_reads.load(Ordering::Relaxed),
            backend_batch_reads: self.backend_batch_reads.load(Ordering::Relaxed),
            backend_writes: self.backend_writes.load(Ordering::Relaxed),
            resolver_calls: self.resolver_calls.load(Ordering::Relaxed),
        }
    }
}

/// Backend wrapper adding memoization and round-trip accounting
pub struct MemoizedCacheProxy {
    backend: RwLock<Arc<dyn CacheBackend>>,
    counters: Counters,
}

impl MemoizedCacheProxy {
    pub fn new(backend: Arc<dyn CacheBackend>) -> Self {
        info!("Creating memoized cache proxy over '{}' backend", backend.name());
        Self {
            backend: RwLock::new(backend),
            counters: Counters::default(),
        }
    }

    /// The active backend
    ///
    /// The reference is cloned out under the read lock so a swap never waits
    /// on backend I/O.
    pub async fn backend(&self) -> Arc<dyn CacheBackend> {
        Arc::clone(&*self.backend.read().await)
    }

    /// Replace the backend; memos held by callers are untouched
    pub async fn set_backend(&self, backend: Arc<dyn CacheBackend>) {
        let mut slot = self.backend.write().await;
        info!(
            "Swapping cache backend '{}' -> '{}'",
            slot.name(),
            backend.name()
        );
        *slot = backend;
    }

    /// Round-trip counters since creation
    pub fn stats(&self) -> ProxyStats {
        self.counters.snapshot()
    }

    /// Read one key
    pub async fn read(&self, memo: Option<&Memo>, key: &str) -> Result<Option<CacheValue>> {
        if let Some(memo) = memo {
            if let Some(hit) = memo.get(key).await {
                Counters::bump(&self.counters.memo_hits);
                debug!("Memo hit: {}", key);
                return Ok(hit);
            }
        }

        let value = self
            .backend()
            .await
            .read(key)
            .await
            .inspect_err(|e| warn!("Backend read failed for {}: {}", key, e))?;
        Counters::bump(&self.counters.backend_reads);
        debug!("Backend {}: {}", if value.is_some() { "hit" } else { "miss" }, key);

        if let Some(memo) = memo {
            memo.insert(key.to_string(), value.clone()).await;
        }
        Ok(value)
    }

    /// Write one key
    pub async fn write(&self, memo: Option<&Memo>, key: &str, value: CacheValue) -> Result<()> {
        self.backend()
            .await
            .write(key, value.clone())
            .await
            .inspect_err(|e| warn!("Backend write failed for {}: {}", key, e))?;
        Counters::bump(&self.counters.backend_writes);

        if let Some(memo) = memo {
            memo.insert(key.to_string(), Some(value)).await;
        }
        Ok(())
    }

    /// Read several keys; keys absent from the backend are left out
    ///
    /// Keys already memoized are not sent to the backend. The remaining keys
    /// go out in a single batched read.
    pub async fn read_multi(
        &self,
        memo: Option<&Memo>,
        keys: &[CacheKey],
    ) -> Result<HashMap<CacheKey, CacheValue>> {
        let mut result = HashMap::with_capacity(keys.len());
        let mut seen = HashSet::with_capacity(keys.len());
        let mut pending = Vec::with_capacity(keys.len());

        for key in keys {
            if !seen.insert(key.as_str()) {
                continue;
            }
            match memo {
                Some(memo) => match memo.get(key).await {
                    Some(hit) => {
                        Counters::bump(&self.counters.memo_hits);
                        if let Some(value) = hit {
                            result.insert(key.clone(), value);
                        }
                    }
                    None => pending.push(key.clone()),
                },
                None => pending.push(key.clone()),
            }
        }

        if pending.is_empty() {
            return Ok(result);
        }

        let found = self
            .backend()
            .await
            .read_multi(&pending)
            .await
            .inspect_err(|e| warn!("Backend batch read of {} keys failed: {}", pending.len(), e))?;
        Counters::bump(&self.counters.backend_batch_reads);
        debug!(
            "Backend batch read: {} requested, {} found",
            pending.len(),
            found.len()
        );

        if let Some(memo) = memo {
            for key in pending {
                let value = found.get(&key).cloned();
                memo.insert(key, value).await;
            }
        }

        result.extend(found);
        Ok(result)
    }

    /// Read-through fetch of one key
    ///
    /// On a hit the stored value is returned and `resolver` is dropped
    /// unused. On a miss `resolver` runs once and its value is written before
    /// being returned.
    pub async fn fetch<F, Fut>(&self, memo: Option<&Memo>, key: &str, resolver: F) -> Result<CacheValue>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<CacheValue>>,
    {
        if let Some(value) = self.read(memo, key).await? {
            return Ok(value);
        }

        Counters::bump(&self.counters.resolver_calls);
        let value = resolver().await?;
        self.write(memo, key, value.clone()).await?;
        Ok(value)
    }

    /// Read-through fetch of several keys
    ///
    /// `resolver` runs at most once, with exactly the keys that missed (each
    /// once, in first-seen order), and must return one value per key in the
    /// same order. Nothing is written unless the resolver succeeds.
    pub async fn fetch_multi<F, Fut>(
        &self,
        memo: Option<&Memo>,
        keys: &[CacheKey],
        resolver: F,
    ) -> Result<HashMap<CacheKey, CacheValue>>
    where
        F: FnOnce(Vec<CacheKey>) -> Fut,
        Fut: Future<Output = Result<Vec<CacheValue>>>,
    {
        let mut result = self.read_multi(memo, keys).await?;

        let mut seen = HashSet::with_capacity(keys.len());
        let mut missed = Vec::new();
        for key in keys {
            if !result.contains_key(key) && seen.insert(key.as_str()) {
                missed.push(key.clone());
            }
        }

        if missed.is_empty() {
            return Ok(result);
        }

        debug!("Resolving {} missed keys", missed.len());
        Counters::bump(&self.counters.resolver_calls);
        let values = resolver(missed.clone()).await?;
        if values.len() != missed.len() {
            return Err(CacheError::ResolverMismatch {
                expected: missed.len(),
                actual: values.len(),
            });
        }

        let entries: Vec<(CacheKey, CacheValue)> = missed.into_iter().zip(values).collect();
        self.backend()
            .await
            .write_multi(entries.clone())
            .await
            .inspect_err(|e| warn!("Backend batch write of {} keys failed: {}", entries.len(), e))?;
        Counters::bump(&self.counters.backend_writes);

        if let Some(memo) = memo {
            for (key, value) in &entries {
                memo.insert(key.clone(), Some(value.clone())).await;
            }
        }

        result.extend(entries);
        Ok(result)
    }

    /// Remove one key from the backend; the memo records it as absent
    pub async fn delete(&self, memo: Option<&Memo>, key: &str) -> Result<bool> {
        let removed = self.backend().await.delete(key).await?;
        if let Some(memo) = memo {
            memo.insert(key.to_string(), None).await;
        }
        debug!("Deleted {} (present: {})", key, removed);
        Ok(removed)
    }

    /// Drop the memo and, when `clear_backend` is set, the backend contents
    pub async fn clear(&self, memo: Option<&Memo>, clear_backend: bool) -> Result<()> {
        if let Some(memo) = memo {
            memo.clear().await;
        }
        if clear_backend {
            self.backend().await.clear().await?;
        }
        info!("Cleared cache (backend included: {})", clear_backend);
        Ok(())
    }
}
