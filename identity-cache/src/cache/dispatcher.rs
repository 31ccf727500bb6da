//! Cache dispatcher
//!
//! [`IdentityCache`] is the surface every caller uses. It owns the runtime
//! configuration (readonly flag, transaction context, active proxy) and
//! applies, in order:
//!
//! 1. the write-through gate ([`IdentityCache::should_cache`]),
//! 2. batching for multi-key calls,
//! 3. the memoizing proxy,
//! 4. the nil-sentinel codec, so callers only ever see real values.
//!
//! Calls made directly on `IdentityCache` are not memoized. Open a
//! [`UnitOfWork`] to get memoized reads scoped to one request or job.

use crate::cache::{
    backend::CacheBackend,
    batch::{batch_count, split_batches},
    config::CacheConfig,
    namespace::CacheNamespace,
    proxy::{Memo, MemoizedCacheProxy},
    sentinel,
    store::{start_auto_cleanup, MemoryStore},
    types::{CacheKey, ProxyStats},
};
use crate::error::{CacheError, Result};
use crate::transaction::{NoTransactions, TransactionContext};
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

/// Process-wide cache dispatcher
///
/// Share it behind an `Arc`; all methods take `&self`.
///
/// ```
/// use identity_cache::{CacheConfig, IdentityCache};
///
/// # async fn example() -> identity_cache::Result<()> {
/// let cache = IdentityCache::new(CacheConfig::default());
///
/// let title: Option<String> = cache
///     .fetch("item:1:title", || async { Ok(Some("Widget".to_string())) })
///     .await?;
/// assert_eq!(title.as_deref(), Some("Widget"));
///
/// // second call is served from the cache; this resolver never runs
/// let again: Option<String> = cache
///     .fetch("item:1:title", || async { Ok(None) })
///     .await?;
/// assert_eq!(again, title);
/// # Ok(())
/// # }
/// ```
pub struct IdentityCache {
    config: CacheConfig,
    readonly: AtomicBool,
    transactions: Arc<dyn TransactionContext>,
    cache: RwLock<Option<Arc<MemoizedCacheProxy>>>,
}

impl IdentityCache {
    /// Dispatcher with no transactional persistence layer
    pub fn new(config: CacheConfig) -> Self {
        Self::with_transaction_context(config, Arc::new(NoTransactions))
    }

    /// Dispatcher consulting `transactions` before every population
    pub fn with_transaction_context(
        config: CacheConfig,
        transactions: Arc<dyn TransactionContext>,
    ) -> Self {
        let readonly = AtomicBool::new(config.readonly);
        Self {
            config,
            readonly,
            transactions,
            cache: RwLock::new(None),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Prefix for callers building keys
    pub fn namespace(&self) -> &CacheNamespace {
        &self.config.namespace
    }

    pub fn is_readonly(&self) -> bool {
        self.readonly.load(Ordering::SeqCst)
    }

    /// Toggle readonly mode; while set, nothing is read from or written to the cache
    pub fn set_readonly(&self, readonly: bool) {
        let previous = self.readonly.swap(readonly, Ordering::SeqCst);
        if previous != readonly {
            info!("Identity cache readonly mode: {}", readonly);
        }
    }

    /// Whether the cache may be used right now
    ///
    /// False in readonly mode and while the transaction context reports an
    /// open transaction: data read there may roll back and must not be cached.
    pub fn should_cache(&self) -> bool {
        !self.is_readonly() && !self.transactions.is_open()
    }

    /// The memoizing proxy, created over a default [`MemoryStore`] on first use
    pub async fn cache(&self) -> Arc<MemoizedCacheProxy> {
        if let Some(proxy) = self.cache.read().await.as_ref() {
            return Arc::clone(proxy);
        }

        let mut slot = self.cache.write().await;
        let proxy = slot.get_or_insert_with(|| {
            info!("No cache backend configured, using in-process memory store");
            let store = Arc::new(MemoryStore::new(self.config.store.clone()));
            if self.config.store.enable_auto_cleanup {
                tokio::spawn(start_auto_cleanup(Arc::downgrade(&store)));
            }
            Arc::new(MemoizedCacheProxy::new(store))
        });
        Arc::clone(proxy)
    }

    /// Swap the backend under the existing proxy, or create the proxy if none exists
    pub async fn set_cache_backend(&self, backend: Arc<dyn CacheBackend>) {
        let mut slot = self.cache.write().await;
        match slot.as_ref() {
            Some(proxy) => proxy.set_backend(backend).await,
            None => *slot = Some(Arc::new(MemoizedCacheProxy::new(backend))),
        }
    }

    /// Round-trip counters of the active proxy; all zero before first use
    pub async fn stats(&self) -> ProxyStats {
        match self.cache.read().await.as_ref() {
            Some(proxy) => proxy.stats(),
            None => ProxyStats::default(),
        }
    }

    /// Open a memoized scope; drop it when the unit of work ends
    pub fn unit_of_work(&self) -> UnitOfWork<'_> {
        UnitOfWork {
            cache: self,
            memo: Memo::new(),
            id: Uuid::new_v4(),
        }
    }

    /// Read-through fetch of one key
    ///
    /// On a miss `resolver` runs once and its result, `None` included, is
    /// cached. When caching is gated off the resolver result is returned
    /// without touching the cache.
    pub async fn fetch<T, F, Fut>(&self, key: &str, resolver: F) -> Result<Option<T>>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<T>>>,
    {
        self.fetch_in(None, key, resolver).await
    }

    /// Read one key without populating on a miss
    ///
    /// `None` covers both "not cached" and "cached as absent"; use
    /// [`read_multi`](Self::read_multi) to tell them apart.
    pub async fn read<T>(&self, key: &str) -> Result<Option<T>>
    where
        T: DeserializeOwned,
    {
        self.read_in(None, key).await
    }

    /// Read-through fetch of many keys
    ///
    /// Keys are processed in batches of `batch_size`. For each batch the
    /// resolver runs at most once, with exactly that batch's missed keys, and
    /// returns one value per key in the same order. When caching is gated off
    /// the resolver runs once with every key instead.
    pub async fn fetch_multi<T, F, Fut>(
        &self,
        keys: &[CacheKey],
        resolver: F,
    ) -> Result<HashMap<CacheKey, Option<T>>>
    where
        T: Serialize + DeserializeOwned,
        F: FnMut(Vec<CacheKey>) -> Fut,
        Fut: Future<Output = Result<Vec<Option<T>>>>,
    {
        self.fetch_multi_in(None, keys, resolver).await
    }

    /// Batched read without population
    ///
    /// Keys absent from the backend are omitted from the result, while keys
    /// cached as absent map to `None`.
    pub async fn read_multi<T>(&self, keys: &[CacheKey]) -> Result<HashMap<CacheKey, Option<T>>>
    where
        T: DeserializeOwned,
    {
        self.read_multi_in(None, keys).await
    }

    /// Remove one key from the backend
    pub async fn delete(&self, key: &str) -> Result<bool> {
        self.cache().await.delete(None, key).await
    }

    /// Empty the backend (when `clear_backend_on_clear` is set)
    pub async fn clear(&self) -> Result<()> {
        self.cache()
            .await
            .clear(None, self.config.clear_backend_on_clear)
            .await
    }

    async fn fetch_in<T, F, Fut>(&self, memo: Option<&Memo>, key: &str, resolver: F) -> Result<Option<T>>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<T>>>,
    {
        if !self.should_cache() {
            debug!("Caching disabled, resolving {} directly", key);
            return resolver().await;
        }

        let mut fresh: Option<Option<T>> = None;
        let slot = &mut fresh;
        let raw = self
            .cache()
            .await
            .fetch(memo, key, move || async move {
                let value = resolver().await?;
                let encoded = sentinel::encode(value.as_ref())?;
                *slot = Some(value);
                Ok::<_, CacheError>(encoded)
            })
            .await?;

        match fresh {
            Some(value) => Ok(value),
            None => sentinel::decode(raw),
        }
    }

    async fn read_in<T>(&self, memo: Option<&Memo>, key: &str) -> Result<Option<T>>
    where
        T: DeserializeOwned,
    {
        if !self.should_cache() {
            return Ok(None);
        }

        match self.cache().await.read(memo, key).await? {
            Some(raw) => sentinel::decode(raw),
            None => Ok(None),
        }
    }

    async fn fetch_multi_in<T, F, Fut>(
        &self,
        memo: Option<&Memo>,
        keys: &[CacheKey],
        mut resolver: F,
    ) -> Result<HashMap<CacheKey, Option<T>>>
    where
        T: Serialize + DeserializeOwned,
        F: FnMut(Vec<CacheKey>) -> Fut,
        Fut: Future<Output = Result<Vec<Option<T>>>>,
    {
        if keys.is_empty() {
            return Ok(HashMap::new());
        }

        if !self.should_cache() {
            debug!("Caching disabled, resolving {} keys directly", keys.len());
            let values = resolver(keys.to_vec()).await?;
            return zip_resolved(keys.to_vec(), values);
        }

        let proxy = self.cache().await;
        let mut result = HashMap::with_capacity(keys.len());
        debug!(
            "fetch_multi: {} keys in {} batches",
            keys.len(),
            batch_count(keys.len(), self.config.batch_size)
        );

        for batch in split_batches(keys, self.config.batch_size) {
            let mut fresh: HashMap<CacheKey, Option<T>> = HashMap::new();
            let slot = &mut fresh;
            let resolver = &mut resolver;

            let raw = proxy
                .fetch_multi(memo, batch, move |missed| async move {
                    let values = resolver(missed.clone()).await?;
                    let resolved = zip_resolved(missed.clone(), values)?;
                    let encoded = missed
                        .iter()
                        .map(|key| sentinel::encode(resolved[key].as_ref()))
                        .collect::<Result<Vec<_>>>()?;
                    *slot = resolved;
                    Ok::<_, CacheError>(encoded)
                })
                .await?;

            for (key, value) in raw {
                let decoded = match fresh.remove(&key) {
                    Some(value) => value,
                    None => sentinel::decode(value)?,
                };
                result.insert(key, decoded);
            }
        }

        Ok(result)
    }

    async fn read_multi_in<T>(
        &self,
        memo: Option<&Memo>,
        keys: &[CacheKey],
    ) -> Result<HashMap<CacheKey, Option<T>>>
    where
        T: DeserializeOwned,
    {
        if keys.is_empty() || !self.should_cache() {
            return Ok(HashMap::new());
        }

        let proxy = self.cache().await;
        let mut result = HashMap::with_capacity(keys.len());

        for batch in split_batches(keys, self.config.batch_size) {
            for (key, raw) in proxy.read_multi(memo, batch).await? {
                let value = sentinel::decode(raw)?;
                result.insert(key, value);
            }
        }

        Ok(result)
    }
}

/// Pair resolver output with its keys, positionally
fn zip_resolved<T>(keys: Vec<CacheKey>, values: Vec<Option<T>>) -> Result<HashMap<CacheKey, Option<T>>> {
    if keys.len() != values.len() {
        return Err(CacheError::ResolverMismatch {
            expected: keys.len(),
            actual: values.len(),
        });
    }
    Ok(keys.into_iter().zip(values).collect())
}

/// Memoized scope over an [`IdentityCache`]
///
/// Every read through a unit of work is remembered until it is dropped, so
/// repeated lookups of a key cost one backend round trip. A unit of work is
/// meant for one request or job; do not share it between independent ones.
pub struct UnitOfWork<'a> {
    cache: &'a IdentityCache,
    memo: Memo,
    id: Uuid,
}

impl UnitOfWork<'_> {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Number of keys remembered so far
    pub async fn memoized_len(&self) -> usize {
        self.memo.len().await
    }

    /// Memoized [`IdentityCache::fetch`]
    pub async fn fetch<T, F, Fut>(&self, key: &str, resolver: F) -> Result<Option<T>>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<T>>>,
    {
        debug!(unit_of_work = %self.id, "fetch {}", key);
        self.cache.fetch_in(Some(&self.memo), key, resolver).await
    }

    /// Memoized [`IdentityCache::read`]
    pub async fn read<T>(&self, key: &str) -> Result<Option<T>>
    where
        T: DeserializeOwned,
    {
        self.cache.read_in(Some(&self.memo), key).await
    }

    /// Memoized [`IdentityCache::fetch_multi`]
    pub async fn fetch_multi<T, F, Fut>(
        &self,
        keys: &[CacheKey],
        resolver: F,
    ) -> Result<HashMap<CacheKey, Option<T>>>
    where
        T: Serialize + DeserializeOwned,
        F: FnMut(Vec<CacheKey>) -> Fut,
        Fut: Future<Output = Result<Vec<Option<T>>>>,
    {
        debug!(unit_of_work = %self.id, "fetch_multi {} keys", keys.len());
        self.cache.fetch_multi_in(Some(&self.memo), keys, resolver).await
    }

    /// Memoized [`IdentityCache::read_multi`]
    pub async fn read_multi<T>(&self, keys: &[CacheKey]) -> Result<HashMap<CacheKey, Option<T>>>
    where
        T: DeserializeOwned,
    {
        self.cache.read_multi_in(Some(&self.memo), keys).await
    }

    /// Remove one key; later reads in this unit of work see it as absent
    pub async fn delete(&self, key: &str) -> Result<bool> {
        self.cache.cache().await.delete(Some(&self.memo), key).await
    }

    /// Forget everything memoized and clear the backend as configured
    pub async fn clear(&self) -> Result<()> {
        self.cache
            .cache()
            .await
            .clear(Some(&self.memo), self.cache.config.clear_backend_on_clear)
            .await
    }
}
