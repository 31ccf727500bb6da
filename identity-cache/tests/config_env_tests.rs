//! Environment-driven configuration
//!
//! Kept as a single test: environment variables are process-wide and the
//! test harness runs tests of one binary in parallel.

use identity_cache::cache::config::{ENV_BATCH_SIZE, ENV_NAMESPACE, ENV_READONLY};
use identity_cache::{CacheConfig, CacheError, IdentityCache, BATCH_SIZE};

fn clear_env() {
    std::env::remove_var(ENV_NAMESPACE);
    std::env::remove_var(ENV_BATCH_SIZE);
    std::env::remove_var(ENV_READONLY);
}

#[tokio::test]
async fn test_from_env_overrides_and_rejects_garbage() {
    clear_env();
    let defaults = CacheConfig::from_env().unwrap();
    assert_eq!(defaults.batch_size, BATCH_SIZE);
    assert!(!defaults.readonly);

    std::env::set_var(ENV_NAMESPACE, "orders:");
    std::env::set_var(ENV_BATCH_SIZE, " 250 ");
    std::env::set_var(ENV_READONLY, "yes");
    let config = CacheConfig::from_env().unwrap();
    assert_eq!(config.namespace.as_str(), "orders:");
    assert_eq!(config.batch_size, 250);
    assert!(config.readonly);

    let cache = IdentityCache::new(config);
    assert!(cache.is_readonly());
    assert!(!cache.should_cache());
    assert_eq!(cache.namespace().key("42"), "orders:42");

    std::env::set_var(ENV_READONLY, "sometimes");
    let err = CacheConfig::from_env().unwrap_err();
    assert!(matches!(err, CacheError::ConfigError(_)));
    std::env::set_var(ENV_READONLY, "0");

    std::env::set_var(ENV_BATCH_SIZE, "0");
    assert!(matches!(
        CacheConfig::from_env().unwrap_err(),
        CacheError::ConfigError(_)
    ));

    std::env::set_var(ENV_BATCH_SIZE, "lots");
    assert!(CacheConfig::from_env().is_err());

    clear_env();
}
