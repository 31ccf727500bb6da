//! Shared test backend that counts round trips and can simulate outages

#![allow(dead_code)]

use async_trait::async_trait;
use identity_cache::{CacheBackend, CacheError, CacheKey, CacheValue, MemoryStore, Result, StoreConfig};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

#[derive(Default)]
pub struct CountingBackend {
    inner: MemoryStore,
    name: String,
    failing: AtomicBool,
    failing_writes: AtomicBool,
    pub reads: AtomicUsize,
    pub batch_reads: AtomicUsize,
    pub writes: AtomicUsize,
    pub clears: AtomicUsize,
    batch_sizes: Mutex<Vec<usize>>,
}

impl CountingBackend {
    pub fn new(name: &str) -> Self {
        Self {
            inner: MemoryStore::new(StoreConfig::unbounded()),
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Fail writes only; reads keep working
    pub fn set_failing_writes(&self, failing: bool) {
        self.failing_writes.store(failing, Ordering::SeqCst);
    }

    pub fn batch_sizes(&self) -> Vec<usize> {
        self.batch_sizes.lock().unwrap().clone()
    }

    pub fn total_calls(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
            + self.batch_reads.load(Ordering::SeqCst)
            + self.writes.load(Ordering::SeqCst)
            + self.clears.load(Ordering::SeqCst)
    }

    /// Stored wire value, bypassing counters
    pub async fn raw(&self, key: &str) -> Option<CacheValue> {
        self.inner.peek(key).await
    }

    pub async fn len(&self) -> usize {
        self.inner.len().await
    }

    fn check(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            Err(CacheError::backend(self.name.clone(), "connection refused"))
        } else {
            Ok(())
        }
    }

    fn check_write(&self) -> Result<()> {
        self.check()?;
        if self.failing_writes.load(Ordering::SeqCst) {
            Err(CacheError::backend(self.name.clone(), "read-only replica"))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl CacheBackend for CountingBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn read(&self, key: &str) -> Result<Option<CacheValue>> {
        self.check()?;
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.read(key).await
    }

    async fn write(&self, key: &str, value: CacheValue) -> Result<()> {
        self.check_write()?;
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.write(key, value).await
    }

    async fn read_multi(&self, keys: &[CacheKey]) -> Result<HashMap<CacheKey, CacheValue>> {
        self.check()?;
        self.batch_reads.fetch_add(1, Ordering::SeqCst);
        self.batch_sizes.lock().unwrap().push(keys.len());
        self.inner.read_multi(keys).await
    }

    async fn write_multi(&self, entries: Vec<(CacheKey, CacheValue)>) -> Result<()> {
        self.check_write()?;
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.write_multi(entries).await
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        self.check()?;
        self.inner.delete(key).await
    }

    async fn clear(&self) -> Result<()> {
        self.check()?;
        self.clears.fetch_add(1, Ordering::SeqCst);
        self.inner.clear().await
    }
}

pub fn keys(names: &[&str]) -> Vec<CacheKey> {
    names.iter().map(|k| k.to_string()).collect()
}
