//! Core type definitions for the cache system

use serde::{Deserialize, Serialize};
use std::fmt;

/// Cache key type - opaque, caller supplied
pub type CacheKey = String;

/// Wire form of a cached entry: serialized JSON text or the nil sentinel
pub type CacheValue = String;

/// Statistics for the in-process memory store
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CacheStats {
    /// Total number of cache hits
    pub hits: u64,

    /// Total number of cache misses
    pub misses: u64,

    /// Number of entries currently in cache
    pub entries: usize,

    /// Total size of cached data in bytes
    pub size_bytes: usize,

    /// Number of evictions due to size limits
    pub evictions_size: u64,

    /// Number of evictions due to TTL expiration
    pub evictions_ttl: u64,

    /// Number of explicit deletions
    pub invalidations: u64,
}

impl CacheStats {
    /// Calculate cache hit rate as a percentage
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }

    /// Calculate miss rate as a percentage
    pub fn miss_rate(&self) -> f64 {
        100.0 - self.hit_rate()
    }

    /// Calculate total evictions
    pub fn total_evictions(&self) -> u64 {
        self.evictions_size + self.evictions_ttl
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CacheStats {{ hits: {}, misses: {}, hit_rate: {:.2}%, entries: {}, size: {} bytes, evictions: {} }}",
            self.hits,
            self.misses,
            self.hit_rate(),
            self.entries,
            self.size_bytes,
            self.total_evictions()
        )
    }
}

/// Round-trip counters kept by the memoizing proxy
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct ProxyStats {
    /// Reads answered from a unit-of-work memo
    pub memo_hits: u64,

    /// Single-key backend reads
    pub backend_reads: u64,

    /// Batched backend reads
    pub backend_batch_reads: u64,

    /// Backend writes (single or batched, counted per call)
    pub backend_writes: u64,

    /// Miss resolver invocations
    pub resolver_calls: u64,
}

impl ProxyStats {
    /// Total backend round trips
    pub fn backend_round_trips(&self) -> u64 {
        self.backend_reads + self.backend_batch_reads + self.backend_writes
    }
}

impl fmt::Display for ProxyStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ProxyStats {{ memo_hits: {}, backend_reads: {}, batch_reads: {}, writes: {}, resolver_calls: {} }}",
            self.memo_hits,
            self.backend_reads,
            self.backend_batch_reads,
            self.backend_writes,
            self.resolver_calls
        )
    }
}
