// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![allow(missing_docs, reason = "This is a test module")]

//! Behavioral tests for `HybridCache`.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use cellar::{CacheKey, CacheTier, HybridCache, KeyPattern};
use pretty_assertions::assert_eq;
use rstest::rstest;
use serde_json::json;
use tempfile::TempDir;
use tokio::sync::oneshot;

fn cache_in(dir: &TempDir) -> HybridCache {
    HybridCache::builder(dir.path().join("cache")).build()
}

async fn in_memory<D: CacheTier>(cache: &HybridCache<D>, key: impl Into<CacheKey>) -> bool {
    cache
        .volatile()
        .get(&key.into())
        .await
        .expect("the volatile tier is infallible")
        .is_some()
}

#[tokio::test(start_paused = true)]
async fn entries_expire_after_ttl() {
    let dir = tempfile::tempdir().expect("tempdir");
    let cache = cache_in(&dir);
    let key = CacheKey::namespaced("stripe", "balance");

    cache.set(&key, &json!({"available": 120}), Some(Duration::from_millis(10))).await;
    assert_eq!(cache.get::<serde_json::Value>(&key).await, Some(json!({"available": 120})));

    tokio::time::sleep(Duration::from_millis(20)).await;

    assert_eq!(cache.get::<serde_json::Value>(&key).await, None);
    assert!(!in_memory(&cache, &key).await);
    assert!(!cache.durable().path_of(&key).exists(), "expired durable entry is deleted when observed");
}

#[tokio::test]
async fn volatile_tier_stays_within_budget_and_falls_back_to_disk() {
    let dir = tempfile::tempdir().expect("tempdir");
    let cache = HybridCache::builder(dir.path()).volatile_budget(30).build();
    let keys = ["first", "second", "third"];

    // Each value serializes to 12 bytes, so only two fit in memory.
    for key in keys {
        cache.set(key, "0123456789", None).await;
    }

    let stats = cache.stats().await;
    assert!(stats.volatile_bytes <= 30, "{stats:?}");
    assert_eq!(stats.volatile_count, 2);
    assert_eq!(stats.durable_count, 3);
    assert!(!in_memory(&cache, "first").await);

    assert_eq!(cache.get::<String>("first").await.as_deref(), Some("0123456789"));
    assert!(in_memory(&cache, "first").await, "disk hit is promoted");
    assert!(!in_memory(&cache, "second").await, "promotion evicts the oldest insert");
    assert!(cache.stats().await.volatile_bytes <= 30);
}

#[tokio::test]
async fn values_survive_a_new_instance() {
    let dir = tempfile::tempdir().expect("tempdir");
    cache_in(&dir).set(("mercury", "accounts"), &vec!["ops", "payroll"], None).await;

    let reopened = cache_in(&dir);

    assert_eq!(
        reopened.get::<Vec<String>>(("mercury", "accounts")).await,
        Some(vec!["ops".to_owned(), "payroll".to_owned()])
    );
}

#[tokio::test]
async fn delete_removes_from_both_tiers() {
    let dir = tempfile::tempdir().expect("tempdir");
    let cache = cache_in(&dir);
    let key = CacheKey::new("k");

    cache.set(&key, &1, None).await;
    cache.delete(&key).await;
    cache.delete(&key).await;

    assert_eq!(cache.get::<u32>(&key).await, None);
    assert!(!cache.durable().path_of(&key).exists());
}

#[tokio::test]
async fn wrap_memoizes_successful_results() {
    let dir = tempfile::tempdir().expect("tempdir");
    let cache = cache_in(&dir);
    let calls = &AtomicU32::new(0);

    for _ in 0..2 {
        let value = cache
            .wrap("metrics:mrr", None, || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, std::io::Error>(4200_u64)
            })
            .await
            .expect("producer succeeds");
        assert_eq!(value, 4200);
    }

    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn wrap_propagates_errors_without_caching() {
    let dir = tempfile::tempdir().expect("tempdir");
    let cache = cache_in(&dir);

    let error = cache
        .wrap("k", None, || async { Err::<u32, _>("upstream down") })
        .await
        .expect_err("producer fails");
    assert_eq!(error, "upstream down");
    assert_eq!(cache.get::<u32>("k").await, None);

    let value = cache.wrap("k", None, || async { Ok::<_, &str>(7_u32) }).await;
    assert_eq!(value, Ok(7));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_misses_run_one_producer() {
    let dir = tempfile::tempdir().expect("tempdir");
    let cache = cache_in(&dir);
    let calls = Arc::new(AtomicU32::new(0));

    let callers = (0..8).map(|_| {
        let cache = cache.clone();
        let calls = Arc::clone(&calls);
        tokio::spawn(async move {
            cache
                .wrap("report", None, || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    Ok::<_, std::io::Error>(json!({"rows": 3}))
                })
                .await
        })
    });

    for result in futures::future::join_all(callers).await {
        let value = result.expect("task completes").expect("producer succeeds");
        assert_eq!(value, json!({"rows": 3}));
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn failed_leader_hands_over_to_next_caller() {
    let dir = tempfile::tempdir().expect("tempdir");
    let cache = cache_in(&dir);
    let calls = Arc::new(AtomicU32::new(0));
    let (started_tx, started_rx) = oneshot::channel::<()>();
    let (fail_tx, fail_rx) = oneshot::channel::<()>();

    let leader = tokio::spawn({
        let cache = cache.clone();
        let calls = Arc::clone(&calls);
        async move {
            cache
                .wrap("k", None, || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    started_tx.send(()).expect("test is listening");
                    fail_rx.await.expect("test releases the leader");
                    Err::<u32, _>("leader failed")
                })
                .await
        }
    });
    started_rx.await.expect("leader starts");

    let follower = tokio::spawn({
        let cache = cache.clone();
        let calls = Arc::clone(&calls);
        async move {
            cache
                .wrap("k", None, || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, &str>(9)
                })
                .await
        }
    });
    fail_tx.send(()).expect("leader is waiting");

    assert_eq!(leader.await.expect("leader task"), Err("leader failed"));
    assert_eq!(follower.await.expect("follower task"), Ok(9));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[rstest]
#[case::literal(KeyPattern::from("ns:"))]
#[case::structured(KeyPattern::regex("^ns:").expect("valid regex"))]
#[tokio::test]
async fn invalidate_counts_both_tiers(#[case] pattern: KeyPattern) {
    let dir = tempfile::tempdir().expect("tempdir");
    let cache = cache_in(&dir);
    cache.set(("ns", "a"), &1, None).await;
    cache.set(("ns", "b"), &2, None).await;
    cache.set(("other", "a"), &3, None).await;

    let removed = cache.invalidate(pattern).await;

    assert_eq!(removed, 4, "two entries in each tier");
    assert_eq!(cache.get::<u32>(("ns", "a")).await, None);
    assert_eq!(cache.get::<u32>(("ns", "b")).await, None);
    assert_eq!(cache.get::<u32>(("other", "a")).await, Some(3));
}

#[tokio::test]
async fn namespace_clear_removes_durable_entries() {
    let dir = tempfile::tempdir().expect("tempdir");
    let cache = cache_in(&dir);
    cache.set(("hubspot", "deals"), &1, None).await;
    cache.set(("hubspot", "contacts"), &2, None).await;
    cache.set(("stripe", "charges"), &3, None).await;

    cache.clear(Some("hubspot")).await;

    let reopened = cache_in(&dir);
    assert_eq!(reopened.get::<u32>(("hubspot", "deals")).await, None);
    assert_eq!(reopened.get::<u32>(("hubspot", "contacts")).await, None);
    assert_eq!(reopened.get::<u32>(("stripe", "charges")).await, Some(3));
}

#[tokio::test]
async fn clear_everything_leaves_an_empty_root() {
    let dir = tempfile::tempdir().expect("tempdir");
    let cache = cache_in(&dir);
    cache.set("a", &1, None).await;
    cache.set(("ns", "b"), &2, None).await;

    cache.clear(None).await;

    assert_eq!(cache.stats().await, cellar::CacheStats::default());
    assert!(cache.durable().root().is_dir());
}

#[tokio::test]
async fn malformed_durable_entry_is_a_miss_and_swept() {
    let dir = tempfile::tempdir().expect("tempdir");
    let cache = cache_in(&dir);
    let key = CacheKey::new("broken");
    cache.set(&key, &1, None).await;
    cache.volatile().clear().await.expect("infallible");
    std::fs::write(cache.durable().path_of(&key), b"{ truncated").expect("writable");

    assert_eq!(cache.get::<u32>(&key).await, None);
    assert_eq!(cache.sweep().await, 1);
    assert!(!cache.durable().path_of(&key).exists());
}

#[tokio::test]
async fn content_hash_tracks_value_changes() {
    let dir = tempfile::tempdir().expect("tempdir");
    let cache = cache_in(&dir);

    assert_eq!(cache.content_hash("k").await, None);

    cache.set("k", &json!({"total": 1}), None).await;
    let first = cache.content_hash("k").await.expect("stored");
    cache.set("k", &json!({"total": 1}), None).await;
    assert_eq!(cache.content_hash("k").await.as_ref(), Some(&first));

    cache.set("k", &json!({"total": 2}), None).await;
    assert_ne!(cache.content_hash("k").await.as_ref(), Some(&first));
}

#[tokio::test(start_paused = true)]
async fn sweeper_purges_expired_entries() {
    let dir = tempfile::tempdir().expect("tempdir");
    let cache = HybridCache::builder(dir.path()).sweep_interval(Duration::from_secs(1)).build();
    let key = CacheKey::new("short-lived");
    cache.set(&key, &1, Some(Duration::from_millis(100))).await;
    cache.set("long-lived", &2, None).await;

    let sweeper = cache.spawn_sweeper();
    tokio::time::sleep(Duration::from_millis(1500)).await;
    sweeper.shutdown().await;

    assert!(!cache.durable().path_of(&key).exists());
    assert!(!in_memory(&cache, &key).await);
    let stats = cache.stats().await;
    assert_eq!((stats.volatile_count, stats.durable_count), (1, 1));
}
