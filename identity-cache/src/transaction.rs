//! Transaction-context capability
//!
//! Data read inside an open transaction may still roll back, so the
//! dispatcher refuses to populate the cache while one is open. The
//! persistence layer reports its state through [`TransactionContext`].

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Reports whether the current execution context has uncommitted transactions
pub trait TransactionContext: Send + Sync {
    /// Number of open (uncommitted) transactions, counting nesting
    fn open_transactions(&self) -> usize;

    /// Whether any transaction is open
    fn is_open(&self) -> bool {
        self.open_transactions() > 0
    }
}

/// Context for callers with no transactional persistence layer
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTransactions;

impl TransactionContext for NoTransactions {
    fn open_transactions(&self) -> usize {
        0
    }
}

/// Shared depth counter for persistence layers that track nesting themselves
///
/// ```
/// use identity_cache::{TransactionContext, TransactionCounter};
///
/// let counter = TransactionCounter::new();
/// {
///     let _tx = counter.begin();
///     assert!(counter.is_open());
/// }
/// assert!(!counter.is_open());
/// ```
#[derive(Debug, Clone, Default)]
pub struct TransactionCounter {
    depth: Arc<AtomicUsize>,
}

impl TransactionCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a transaction; it counts as open until the guard is dropped
    pub fn begin(&self) -> TransactionGuard {
        let depth = self.depth.fetch_add(1, Ordering::SeqCst) + 1;
        debug!("Transaction opened (depth {})", depth);
        TransactionGuard {
            depth: Arc::clone(&self.depth),
        }
    }
}

impl TransactionContext for TransactionCounter {
    fn open_transactions(&self) -> usize {
        self.depth.load(Ordering::SeqCst)
    }
}

/// Open transaction handle; commit or rollback both end it
#[derive(Debug)]
#[must_use = "the transaction closes as soon as the guard is dropped"]
pub struct TransactionGuard {
    depth: Arc<AtomicUsize>,
}

impl TransactionGuard {
    pub fn commit(self) {}

    pub fn rollback(self) {}
}

impl Drop for TransactionGuard {
    fn drop(&mut self) {
        let previous = self.depth.fetch_sub(1, Ordering::SeqCst);
        debug!("Transaction closed (depth {})", previous.saturating_sub(1));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_transactions_is_never_open() {
        assert_eq!(NoTransactions.open_transactions(), 0);
        assert!(!NoTransactions.is_open());
    }

    #[test]
    fn test_counter_tracks_nesting() {
        let counter = TransactionCounter::new();
        let outer = counter.begin();
        let inner = counter.begin();
        assert_eq!(counter.open_transactions(), 2);

        inner.commit();
        assert_eq!(counter.open_transactions(), 1);
        assert!(counter.is_open());

        outer.rollback();
        assert!(!counter.is_open());
    }

    #[test]
    fn test_guard_held_across_await() {
        let counter = TransactionCounter::new();

        tokio_test::block_on(async {
            let tx = counter.begin();
            tokio::task::yield_now().await;
            assert!(counter.is_open());
            tx.commit();
        });

        assert!(!counter.is_open());
    }

    #[test]
    fn test_counter_clones_share_depth() {
        let counter = TransactionCounter::new();
        let observer = counter.clone();

        let _tx = counter.begin();
        assert!(observer.is_open());
    }
}
