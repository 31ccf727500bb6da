//! # Read-through cache engine
//!
//! Layers, leaves first:
//!
//! - [`batch`]: splits key sets into backend-sized slices
//! - [`sentinel`]: stores "computed as absent" distinctly from "never computed"
//! - [`backend`]: the pluggable key-value store interface, with [`MemoryStore`]
//!   as the in-process implementation
//! - [`proxy`]: memoization in front of the backend
//! - [`dispatcher`]: [`IdentityCache`], the gate + batching + codec surface
//!
//! ## Example
//!
//! ```rust
//! use identity_cache::cache::{CacheConfig, IdentityCache};
//!
//! # async fn example() -> identity_cache::Result<()> {
//! let cache = IdentityCache::new(CacheConfig::default());
//! let keys: Vec<String> = (1..=3).map(|id| cache.namespace().key(format!("item:{}", id))).collect();
//!
//! let names = cache
//!     .fetch_multi(&keys, |missed| async move {
//!         Ok(missed.iter().map(|key| Some(format!("loaded {}", key))).collect())
//!     })
//!     .await?;
//! assert_eq!(names.len(), 3);
//!
//! let uow = cache.unit_of_work();
//! let first: Option<String> = uow.read(&keys[0]).await?;
//! assert!(first.is_some());
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod batch;
pub mod config;
pub mod dispatcher;
pub mod entry;
pub mod namespace;
pub mod proxy;
pub mod sentinel;
pub mod store;
pub mod types;

pub use backend::CacheBackend;
pub use batch::{batch_count, split_batches, BATCH_SIZE};
pub use config::{CacheConfig, CacheConfigBuilder, StoreConfig};
pub use dispatcher::{IdentityCache, UnitOfWork};
pub use entry::StoredEntry;
pub use namespace::{CacheNamespace, CACHE_VERSION};
pub use proxy::{Memo, MemoizedCacheProxy};
pub use sentinel::CACHED_NIL;
pub use store::{start_auto_cleanup, MemoryStore};
pub use types::{CacheKey, CacheStats, CacheValue, ProxyStats};
