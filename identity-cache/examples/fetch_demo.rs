//! Identity Cache Demo Application
//!
//! Walks through read-through fetches, batching, units of work, readonly
//! mode and the transaction gate against the in-process store.
//!
//! Usage:
//!   cargo run --example fetch_demo
//!
//! Environment variables:
//!   IDENTITY_CACHE_NAMESPACE  - key prefix (default: IDC:5:)
//!   IDENTITY_CACHE_BATCH_SIZE - keys per backend call (default: 1000)
//!   IDENTITY_CACHE_READONLY   - start in readonly mode (default: false)
//!   RUST_LOG                  - log filter (default: identity_cache=info)

use identity_cache::{logging, CacheConfig, IdentityCache, TransactionCounter};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Product {
    id: u32,
    name: String,
    price_cents: u64,
}

/// Stand-in for an expensive lookup; odd ids do not exist
async fn load_products(ids: &[u32], lookups: &AtomicUsize) -> Vec<Option<Product>> {
    lookups.fetch_add(1, Ordering::SeqCst);
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    ids.iter()
        .map(|&id| {
            (id % 2 == 0).then(|| Product {
                id,
                name: format!("Product #{}", id),
                price_cents: 100 * u64::from(id),
            })
        })
        .collect()
}

fn product_id(key: &str) -> u32 {
    key.rsplit(':').next().and_then(|id| id.parse().ok()).unwrap_or_default()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init_tracing();

    info!("=== Identity Cache Demo ===");

    let transactions = TransactionCounter::new();
    let config = CacheConfig::from_env()?;
    info!(
        "Namespace '{}', batch size {}",
        config.namespace, config.batch_size
    );
    let cache = IdentityCache::with_transaction_context(config, Arc::new(transactions.clone()));
    let lookups = AtomicUsize::new(0);

    info!("\n--- Single-key read-through ---");
    let key = cache.namespace().key("product:2");
    for attempt in 1..=2 {
        let product: Option<Product> = cache
            .fetch(&key, || async {
                Ok(load_products(&[2], &lookups).await.pop().flatten())
            })
            .await?;
        info!("Attempt {}: {:?}", attempt, product);
    }
    info!("Lookups so far: {}", lookups.load(Ordering::SeqCst));

    info!("\n--- Nil results are cached too ---");
    let missing = cache.namespace().key("product:3");
    for attempt in 1..=2 {
        let product: Option<Product> = cache
            .fetch(&missing, || async {
                Ok(load_products(&[3], &lookups).await.pop().flatten())
            })
            .await?;
        info!("Attempt {}: {:?}", attempt, product);
    }
    info!("Lookups so far: {}", lookups.load(Ordering::SeqCst));

    info!("\n--- Batched fetch ---");
    let keys: Vec<String> = (1..=10)
        .map(|id| cache.namespace().key(format!("product:{}", id)))
        .collect();
    let products = cache
        .fetch_multi(&keys, |missed| {
            let lookups = &lookups;
            async move {
                let ids: Vec<u32> = missed.iter().map(|key| product_id(key)).collect();
                info!("Resolving {} missed keys", ids.len());
                Ok(load_products(&ids, lookups).await)
            }
        })
        .await?;
    let found = products.values().filter(|p| p.is_some()).count();
    info!("{} keys, {} products found", products.len(), found);

    info!("\n--- Unit of work ---");
    let uow = cache.unit_of_work();
    for _ in 0..3 {
        let product: Option<Product> = uow.read(&key).await?;
        info!("Read {:?}", product.map(|p| p.name));
    }
    info!("Unit of work {} memoized {} keys", uow.id(), uow.memoized_len().await);
    drop(uow);

    info!("\n--- Open transaction ---");
    {
        let tx = transactions.begin();
        let fresh_key = cache.namespace().key("product:12");
        let product: Option<Product> = cache
            .fetch(&fresh_key, || async {
                Ok(load_products(&[12], &lookups).await.pop().flatten())
            })
            .await?;
        info!("Resolved inside transaction: {:?}", product);
        tx.rollback();

        let cached: Option<Product> = cache.read(&fresh_key).await?;
        info!("Cached after rollback: {:?}", cached);
    }

    info!("\n--- Readonly mode ---");
    cache.set_readonly(true);
    let product: Option<Product> = cache.read(&key).await?;
    info!("Read while readonly: {:?}", product);
    cache.set_readonly(false);

    info!("\n--- Statistics ---");
    info!("{}", cache.stats().await);
    info!("Total lookups: {}", lookups.load(Ordering::SeqCst));

    info!("\n=== Demo Complete ===");
    Ok(())
}
