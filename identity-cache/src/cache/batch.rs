//! Splitting key sets into backend-sized batches

use crate::cache::types::CacheKey;

/// Default maximum number of keys sent to the backend in one batched call
pub const BATCH_SIZE: usize = 1000;

/// Split `keys` into consecutive slices of at most `size` keys, preserving order.
///
/// Empty input yields no slices. A `size` of zero is treated as one.
pub fn split_batches(keys: &[CacheKey], size: usize) -> impl Iterator<Item = &[CacheKey]> {
    keys.chunks(size.max(1))
}

/// Number of batches [`split_batches`] produces for `len` keys
pub fn batch_count(len: usize, size: usize) -> usize {
    len.div_ceil(size.max(1))
}
