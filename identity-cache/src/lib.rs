//! # identity-cache
//!
//! A read-through / write-through caching façade for expensive lookups,
//! placed between application read paths and a backing key-value store.
//!
//! ## Features
//!
//! - Single-key and batched read-through fetches with at-most-once resolvers
//! - Nil-safe caching: "looked up, found nothing" is cached too
//! - Backend-sized batching of arbitrarily large key sets
//! - Per-unit-of-work memoization of backend reads
//! - Write-through gate: nothing is cached while readonly or inside an open
//!   transaction
//! - Hot-swappable backends behind an object-safe [`CacheBackend`] trait
//!
//! ## Read-through fetch
//!
//! ```no_run
//! use identity_cache::{CacheConfig, IdentityCache};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let cache = IdentityCache::new(CacheConfig::from_env()?);
//!     let key = cache.namespace().key("item:42");
//!
//!     let price: Option<u64> = cache
//!         .fetch(&key, || async {
//!             // expensive lookup; `None` is cached as well
//!             Ok(Some(1999))
//!         })
//!         .await?;
//!
//!     println!("price: {:?}", price);
//!     Ok(())
//! }
//! ```
//!
//! ## Transactions
//!
//! ```no_run
//! use identity_cache::{CacheConfig, IdentityCache, TransactionCounter};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let transactions = TransactionCounter::new();
//!     let cache = IdentityCache::with_transaction_context(
//!         CacheConfig::default(),
//!         Arc::new(transactions.clone()),
//!     );
//!
//!     let tx = transactions.begin();
//!     // resolved directly, never written to the cache
//!     let _: Option<u64> = cache.fetch("item:42", || async { Ok(Some(1)) }).await?;
//!     tx.rollback();
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod error;
pub mod logging;
pub mod transaction;

// Re-export main types for convenience
pub use cache::{
    CacheBackend, CacheConfig, CacheConfigBuilder, CacheKey, CacheNamespace, CacheStats,
    CacheValue, IdentityCache, Memo, MemoizedCacheProxy, MemoryStore, ProxyStats, StoreConfig,
    UnitOfWork, BATCH_SIZE, CACHED_NIL, CACHE_VERSION,
};
pub use error::{CacheError, Result};
pub use transaction::{NoTransactions, TransactionContext, TransactionCounter, TransactionGuard};
