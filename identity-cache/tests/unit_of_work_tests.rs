//! Integration tests for memoized units of work and backend swapping

mod common;

use common::{keys, CountingBackend};
use identity_cache::{CacheConfig, CacheError, IdentityCache};
use std::sync::atomic::Ordering;
use std::sync::Arc;

async fn cache() -> (Arc<IdentityCache>, Arc<CountingBackend>) {
    let cache = Arc::new(IdentityCache::new(CacheConfig::default()));
    let backend = Arc::new(CountingBackend::new("primary"));
    cache.set_cache_backend(backend.clone()).await;
    (cache, backend)
}

#[tokio::test]
async fn test_repeated_reads_cost_one_round_trip() {
    let (cache, backend) = cache().await;
    cache.fetch("k", || async { Ok(Some(10u32)) }).await.unwrap();
    let reads_before = backend.reads.load(Ordering::SeqCst);

    let uow = cache.unit_of_work();
    for _ in 0..5 {
        let value: Option<u32> = uow
            .fetch("k", || async { Err(CacheError::Resolver("must not run".to_string())) })
            .await
            .unwrap();
        assert_eq!(value, Some(10));
    }

    assert_eq!(backend.reads.load(Ordering::SeqCst) - reads_before, 1);
}

#[tokio::test]
async fn test_multi_reads_are_memoized() {
    let (cache, backend) = cache().await;
    let uow = cache.unit_of_work();

    uow.fetch_multi(&keys(&["a", "b"]), |missed| async move {
        Ok(missed.iter().map(|k| Some(k.to_uppercase())).collect())
    })
    .await
    .unwrap();
    let batch_reads = backend.batch_reads.load(Ordering::SeqCst);

    let read = uow.read_multi::<String>(&keys(&["a", "b"])).await.unwrap();
    assert_eq!(read["a"].as_deref(), Some("A"));
    assert_eq!(backend.batch_reads.load(Ordering::SeqCst), batch_reads);
    assert_eq!(uow.memoized_len().await, 2);
}

#[tokio::test]
async fn test_backend_swap_keeps_memoized_entries() {
    let (cache, _primary) = cache().await;
    let uow = cache.unit_of_work();

    let value: Option<String> = uow
        .fetch("k", || async { Ok(Some("from-primary".to_string())) })
        .await
        .unwrap();
    assert_eq!(value.as_deref(), Some("from-primary"));

    let secondary = Arc::new(CountingBackend::new("secondary"));
    cache.set_cache_backend(secondary.clone()).await;

    let memoized: Option<String> = uow.read("k").await.unwrap();
    assert_eq!(memoized.as_deref(), Some("from-primary"));
    assert_eq!(secondary.total_calls(), 0);

    // outside the unit of work the new backend is used
    let direct: Option<String> = cache.read("k").await.unwrap();
    assert_eq!(direct, None);
    assert_eq!(secondary.reads.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_units_of_work_do_not_share_memos() {
    let (cache, backend) = cache().await;
    let first = cache.unit_of_work();
    let second = cache.unit_of_work();
    assert_ne!(first.id(), second.id());

    let miss: Option<u32> = first.read("k").await.unwrap();
    assert_eq!(miss, None);

    second.fetch("k", || async { Ok(Some(5u32)) }).await.unwrap();

    // first still remembers its own miss; a new scope sees the stored value
    assert_eq!(first.read::<u32>("k").await.unwrap(), None);
    assert_eq!(cache.unit_of_work().read::<u32>("k").await.unwrap(), Some(5));
    assert_eq!(backend.raw("k").await.as_deref(), Some("5"));
}

#[tokio::test]
async fn test_delete_inside_unit_of_work() {
    let (cache, backend) = cache().await;
    let uow = cache.unit_of_work();
    uow.fetch("k", || async { Ok(Some(1u32)) }).await.unwrap();

    assert!(uow.delete("k").await.unwrap());
    assert_eq!(uow.read::<u32>("k").await.unwrap(), None);
    assert_eq!(backend.raw("k").await, None);

    let refreshed: Option<u32> = uow.fetch("k", || async { Ok(Some(2)) }).await.unwrap();
    assert_eq!(refreshed, Some(2));
}

#[tokio::test]
async fn test_clear_drops_memo_and_backend() {
    let (cache, backend) = cache().await;
    let uow = cache.unit_of_work();
    uow.fetch("k", || async { Ok(Some(1u32)) }).await.unwrap();

    uow.clear().await.unwrap();

    assert_eq!(uow.memoized_len().await, 0);
    assert_eq!(backend.len().await, 0);
    assert_eq!(backend.clears.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_clear_can_leave_backend_alone() {
    let config = CacheConfig::builder().clear_backend_on_clear(false).build();
    let cache = IdentityCache::new(config);
    let backend = Arc::new(CountingBackend::new("primary"));
    cache.set_cache_backend(backend.clone()).await;

    cache.fetch("k", || async { Ok(Some(1u32)) }).await.unwrap();
    cache.clear().await.unwrap();

    assert_eq!(backend.clears.load(Ordering::SeqCst), 0);
    assert_eq!(cache.read::<u32>("k").await.unwrap(), Some(1));
}

#[tokio::test]
async fn test_concurrent_units_of_work() {
    let (cache, backend) = cache().await;
    let all: Vec<String> = (0..50).map(|i| format!("item:{}", i)).collect();

    let tasks = (0..4).map(|worker| {
        let cache = Arc::clone(&cache);
        let all = all.clone();
        tokio::spawn(async move {
            let uow = cache.unit_of_work();
            let values = uow
                .fetch_multi(&all, |missed| async move {
                    Ok(missed
                        .iter()
                        .map(|key| Some(format!("{}:{}", key, "loaded")))
                        .collect())
                })
                .await
                .unwrap();
            assert_eq!(values.len(), 50);
            worker
        })
    });

    let finished: Vec<usize> = futures::future::join_all(tasks)
        .await
        .into_iter()
        .map(|joined| joined.unwrap())
        .collect();

    assert_eq!(finished.len(), 4);
    assert_eq!(backend.len().await, 50);
    let stored: Option<String> = cache.read("item:7").await.unwrap();
    assert_eq!(stored.as_deref(), Some("item:7:loaded"));
}
