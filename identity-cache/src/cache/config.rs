//! Configuration for the cache system

use crate::cache::batch::BATCH_SIZE;
use crate::cache::namespace::CacheNamespace;
use crate::error::{CacheError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Environment variable overriding the key namespace
pub const ENV_NAMESPACE: &str = "IDENTITY_CACHE_NAMESPACE";
/// Environment variable overriding the batch size
pub const ENV_BATCH_SIZE: &str = "IDENTITY_CACHE_BATCH_SIZE";
/// Environment variable starting the dispatcher in readonly mode
pub const ENV_READONLY: &str = "IDENTITY_CACHE_READONLY";

/// Dispatcher configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Prefix available to callers for building keys
    pub namespace: CacheNamespace,

    /// Maximum number of keys per batched backend call
    pub batch_size: usize,

    /// Start in readonly mode (no population, no reads)
    pub readonly: bool,

    /// Whether `clear` also empties the backend, not just the memo
    pub clear_backend_on_clear: bool,

    /// Settings for the in-process store used when no backend is configured
    pub store: StoreConfig,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            namespace: CacheNamespace::default(),
            batch_size: BATCH_SIZE,
            readonly: false,
            clear_backend_on_clear: true,
            store: StoreConfig::default(),
        }
    }
}

impl CacheConfig {
    /// Create a new builder for cache configuration
    pub fn builder() -> CacheConfigBuilder {
        CacheConfigBuilder::default()
    }

    /// Load overrides from the environment (and a `.env` file, if present)
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        let mut config = Self::default();

        if let Ok(namespace) = std::env::var(ENV_NAMESPACE) {
            config.namespace = CacheNamespace::new(namespace);
        }

        if let Ok(raw) = std::env::var(ENV_BATCH_SIZE) {
            config.batch_size = raw.trim().parse().map_err(|e| {
                CacheError::ConfigError(format!("{} must be a positive integer: {}", ENV_BATCH_SIZE, e))
            })?;
        }

        if let Ok(raw) = std::env::var(ENV_READONLY) {
            config.readonly = parse_flag(&raw).ok_or_else(|| {
                CacheError::ConfigError(format!("{} must be a boolean, got '{}'", ENV_READONLY, raw))
            })?;
        }

        config.validate()?;
        debug!("Loaded cache config from environment: {:?}", config);
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(CacheError::ConfigError(
                "batch_size must be greater than 0".to_string(),
            ));
        }

        if self.namespace.as_str().is_empty() {
            return Err(CacheError::ConfigError(
                "namespace must not be empty".to_string(),
            ));
        }

        self.store.validate()
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

/// Configuration for the in-process [`MemoryStore`](crate::cache::MemoryStore)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Default time-to-live for cache entries
    pub default_ttl: Duration,

    /// Maximum number of entries in the cache
    pub max_entries: usize,

    /// Maximum total size of cached data in bytes
    pub max_size_bytes: usize,

    /// TTL jitter factor (0.0 - 1.0)
    /// Spreads expirations so entries written together do not all miss together
    pub ttl_jitter: f64,

    /// Enable automatic cleanup of expired entries
    pub enable_auto_cleanup: bool,

    /// Interval for automatic cleanup checks
    pub cleanup_interval: Duration,

    /// Enable LRU eviction policy
    pub enable_lru_eviction: bool,

    /// Enable metrics collection
    pub enable_metrics: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            default_ttl: Duration::from_secs(3600),
            max_entries: 10_000,
            // 100 MB
            max_size_bytes: 100 * 1024 * 1024,
            ttl_jitter: 0.125,
            enable_auto_cleanup: true,
            cleanup_interval: Duration::from_secs(300),
            enable_lru_eviction: true,
            enable_metrics: true,
        }
    }
}

impl StoreConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.max_entries == 0 {
            return Err(CacheError::ConfigError(
                "max_entries must be greater than 0".to_string(),
            ));
        }

        if self.max_size_bytes == 0 {
            return Err(CacheError::ConfigError(
                "max_size_bytes must be greater than 0".to_string(),
            ));
        }

        if self.ttl_jitter < 0.0 || self.ttl_jitter > 1.0 {
            return Err(CacheError::ConfigError(
                "ttl_jitter must be between 0.0 and 1.0".to_string(),
            ));
        }

        Ok(())
    }

    /// Calculate actual TTL with jitter applied
    pub fn ttl_with_jitter(&self) -> Duration {
        if self.ttl_jitter == 0.0 {
            return self.default_ttl;
        }

        let base_secs = self.default_ttl.as_secs_f64();
        let jitter_range = base_secs * self.ttl_jitter;
        let jitter = (rand::random::<f64>() * 2.0 - 1.0) * jitter_range;
        let final_secs = (base_secs + jitter).max(1.0);

        Duration::from_secs_f64(final_secs)
    }

    /// Store that never expires or evicts in practice; handy for tests
    pub fn unbounded() -> Self {
        Self {
            default_ttl: Duration::from_secs(365 * 24 * 3600),
            max_entries: usize::MAX,
            max_size_bytes: usize::MAX,
            ttl_jitter: 0.0,
            enable_auto_cleanup: false,
            ..Default::default()
        }
    }
}

/// Builder for cache configuration
#[derive(Debug, Default)]
pub struct CacheConfigBuilder {
    namespace: Option<CacheNamespace>,
    batch_size: Option<usize>,
    readonly: Option<bool>,
    clear_backend_on_clear: Option<bool>,
    default_ttl: Option<Duration>,
    max_entries: Option<usize>,
    max_size_bytes: Option<usize>,
    ttl_jitter: Option<f64>,
    enable_lru_eviction: Option<bool>,
    enable_metrics: Option<bool>,
}

impl CacheConfigBuilder {
    /// Set the key namespace
    pub fn namespace(mut self, namespace: CacheNamespace) -> Self {
        self.namespace = Some(namespace);
        self
    }

    /// Set the batch size for multi-key operations
    pub fn batch_size(mut self, size: usize) -> Self {
        self.batch_size = Some(size);
        self
    }

    /// Start readonly
    pub fn readonly(mut self, readonly: bool) -> Self {
        self.readonly = Some(readonly);
        self
    }

    /// Whether `clear` empties the backend too
    pub fn clear_backend_on_clear(mut self, enable: bool) -> Self {
        self.clear_backend_on_clear = Some(enable);
        self
    }

    /// Set default TTL for memory store entries
    pub fn default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = Some(ttl);
        self
    }

    /// Set maximum number of memory store entries
    pub fn max_entries(mut self, max: usize) -> Self {
        self.max_entries = Some(max);
        self
    }

    /// Set maximum memory store size in bytes
    pub fn max_size_bytes(mut self, size: usize) -> Self {
        self.max_size_bytes = Some(size);
        self
    }

    /// Set TTL jitter factor (0.0 - 1.0)
    pub fn ttl_jitter(mut self, jitter: f64) -> Self {
        self.ttl_jitter = Some(jitter);
        self
    }

    /// Enable or disable LRU eviction
    pub fn enable_lru_eviction(mut self, enable: bool) -> Self {
        self.enable_lru_eviction = Some(enable);
        self
    }

    /// Enable or disable metrics collection
    pub fn enable_metrics(mut self, enable: bool) -> Self {
        self.enable_metrics = Some(enable);
        self
    }

    /// Build the cache configuration
    pub fn build(self) -> CacheConfig {
        let defaults = CacheConfig::default();
        let store = defaults.store;

        CacheConfig {
            namespace: self.namespace.unwrap_or(defaults.namespace),
            batch_size: self.batch_size.unwrap_or(defaults.batch_size),
            readonly: self.readonly.unwrap_or(defaults.readonly),
            clear_backend_on_clear: self
                .clear_backend_on_clear
                .unwrap_or(defaults.clear_backend_on_clear),
            store: StoreConfig {
                default_ttl: self.default_ttl.unwrap_or(store.default_ttl),
                max_entries: self.max_entries.unwrap_or(store.max_entries),
                max_size_bytes: self.max_size_bytes.unwrap_or(store.max_size_bytes),
                ttl_jitter: self.ttl_jitter.unwrap_or(store.ttl_jitter),
                enable_lru_eviction: self
                    .enable_lru_eviction
                    .unwrap_or(store.enable_lru_eviction),
                enable_metrics: self.enable_metrics.unwrap_or(store.enable_metrics),
                ..store
            },
        }
    }
}
