//! Error types for cache operations
//!
//! Backend failures, resolver failures and codec failures all surface as
//! [`CacheError`]. Nothing in this crate retries; every error is local to the
//! call that produced it.

use thiserror::Error;

/// Main error type for cache operations
#[derive(Error, Debug)]
pub enum CacheError {
    /// The backing store failed (I/O, protocol, connection)
    #[error("Cache backend '{backend}' unavailable: {message}")]
    BackendUnavailable { backend: String, message: String },

    /// A caller-supplied miss resolver failed
    #[error("Resolver error: {0}")]
    Resolver(String),

    /// A batch resolver returned a different number of values than keys it was given
    #[error("Resolver returned {actual} values for {expected} missed keys")]
    ResolverMismatch { expected: usize, actual: usize },

    /// Serialization/Deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Generic error with context
    #[error("Error: {0}")]
    Other(String),
}

impl CacheError {
    /// Build a backend failure for the named backend
    pub fn backend(backend: impl Into<String>, message: impl Into<String>) -> Self {
        CacheError::BackendUnavailable {
            backend: backend.into(),
            message: message.into(),
        }
    }

    /// Whether the error came from the backing store
    pub fn is_backend_unavailable(&self) -> bool {
        matches!(self, CacheError::BackendUnavailable { .. })
    }
}

/// Result type alias for cache operations
pub type Result<T> = std::result::Result<T, CacheError>;

impl From<serde_json::Error> for CacheError {
    fn from(e: serde_json::Error) -> Self {
        CacheError::Serialization(e.to_string())
    }
}

impl From<String> for CacheError {
    fn from(s: String) -> Self {
        CacheError::Other(s)
    }
}

impl From<&str> for CacheError {
    fn from(s: &str) -> Self {
        CacheError::Other(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = CacheError::backend("memcached", "connection refused");
        assert_eq!(
            error.to_string(),
            "Cache backend 'memcached' unavailable: connection refused"
        );
        assert!(error.is_backend_unavailable());

        let mismatch = CacheError::ResolverMismatch {
            expected: 3,
            actual: 2,
        };
        assert!(mismatch.to_string().contains("2 values for 3 missed keys"));
        assert!(!mismatch.is_backend_unavailable());
    }

    #[test]
    fn test_error_conversion() {
        let error: CacheError = "test error".into();
        assert!(matches!(error, CacheError::Other(_)));

        let error: CacheError = "test error".to_string().into();
        assert!(matches!(error, CacheError::Other(_)));

        let json_err = serde_json::from_str::<u32>("not json").unwrap_err();
        let error: CacheError = json_err.into();
        assert!(matches!(error, CacheError::Serialization(_)));
    }
}
