// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![allow(missing_docs, reason = "This is a test module")]

//! Admission behavior of `RateLimiter` under controlled time.

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use rstest::rstest;
use tokio::time::Instant;
use turnstile::{POLL_INTERVAL, RateLimiter, RatePolicy};

fn limiter_with(service: &str, policy: RatePolicy) -> RateLimiter {
    let limiter = RateLimiter::empty();
    limiter.set_config(service, policy);
    limiter
}

#[tokio::test(start_paused = true)]
async fn sliding_window_admits_up_to_limit() {
    let limiter = limiter_with("stripe", RatePolicy::new(3, Duration::from_secs(1)));

    for _ in 0..3 {
        assert!(limiter.check_limit("stripe").await);
    }
    assert!(!limiter.check_limit("stripe").await);

    tokio::time::advance(Duration::from_millis(500)).await;
    assert!(!limiter.check_limit("stripe").await, "earlier requests are still inside the window");

    tokio::time::advance(Duration::from_millis(501)).await;
    assert!(limiter.check_limit("stripe").await);
    assert_eq!(limiter.remaining("stripe"), Some(2));
}

#[tokio::test(start_paused = true)]
async fn window_slides_per_request() {
    let limiter = limiter_with("svc", RatePolicy::new(2, Duration::from_secs(1)));

    assert!(limiter.check_limit("svc").await);
    tokio::time::advance(Duration::from_millis(600)).await;
    assert!(limiter.check_limit("svc").await);

    // Only the first request has left the window.
    tokio::time::advance(Duration::from_millis(500)).await;
    assert_eq!(limiter.remaining("svc"), Some(1));
    assert!(limiter.check_limit("svc").await);
    assert!(!limiter.check_limit("svc").await);
}

#[tokio::test(start_paused = true)]
async fn retry_after_pauses_instead_of_rejecting() {
    let policy = RatePolicy::new(1, Duration::from_millis(100)).with_retry_after(Duration::from_millis(30));
    let limiter = limiter_with("mercury", policy);
    assert!(limiter.check_limit("mercury").await);

    let start = Instant::now();
    assert!(limiter.check_limit("mercury").await);

    let waited = start.elapsed();
    assert!(waited > Duration::from_millis(100), "waited {waited:?}");
    assert!(waited < Duration::from_millis(200), "waited {waited:?}");
}

#[tokio::test(start_paused = true)]
async fn zero_retry_after_pauses_one_poll_interval() {
    let policy = RatePolicy::new(1, Duration::from_secs(1)).with_retry_after(Duration::ZERO);
    let limiter = limiter_with("quickbooks", policy);
    assert!(limiter.check_limit("quickbooks").await);

    let start = Instant::now();
    assert!(limiter.check_limit("quickbooks").await);

    // An admission exactly one window old still counts.
    assert_eq!(start.elapsed(), Duration::from_secs(1) + POLL_INTERVAL);
}

#[tokio::test(start_paused = true)]
async fn wait_for_limit_polls_until_admitted() {
    let limiter = limiter_with("hubspot", RatePolicy::new(1, Duration::from_secs(1)));
    assert!(limiter.check_limit("hubspot").await);

    let start = Instant::now();
    limiter.wait_for_limit("hubspot").await;

    let waited = start.elapsed();
    assert!(waited > Duration::from_secs(1), "waited {waited:?}");
    assert!(waited <= Duration::from_secs(1) + 2 * POLL_INTERVAL, "waited {waited:?}");
    assert_eq!(limiter.remaining("hubspot"), Some(0));
}

#[tokio::test(start_paused = true)]
async fn bounded_wait_times_out() {
    let limiter = limiter_with("github", RatePolicy::new(1, Duration::from_secs(3600)));
    assert!(limiter.check_limit("github").await);

    let error = limiter
        .wait_for_limit_within("github", Duration::from_millis(250))
        .await
        .expect_err("window stays full");

    assert_eq!(error.service(), "github");
    assert_eq!(error.timeout(), Duration::from_millis(250));
    assert_eq!(error.to_string(), "no admission for service 'github' within 250ms");
    assert_eq!(limiter.remaining("github"), Some(0));
}

#[tokio::test(start_paused = true)]
async fn bounded_wait_succeeds_when_capacity_frees() {
    let limiter = limiter_with("svc", RatePolicy::new(1, Duration::from_millis(200)));
    assert!(limiter.check_limit("svc").await);

    limiter
        .wait_for_limit_within("svc", Duration::from_secs(1))
        .await
        .expect("admitted before the deadline");
}

#[tokio::test]
async fn unknown_services_fail_open() {
    let limiter = RateLimiter::new();
    for _ in 0..1000 {
        assert!(limiter.check_limit("internal-metrics").await);
    }
    assert_eq!(limiter.remaining("internal-metrics"), None);
}

#[rstest]
#[case::stripe("stripe", 100)]
#[case::hubspot("hubspot", 100)]
#[case::mercury("mercury", 120)]
#[case::quickbooks("quickbooks", 500)]
#[case::github("github", 5000)]
fn defaults_start_with_full_capacity(#[case] service: &str, #[case] capacity: u32) {
    assert_eq!(RateLimiter::new().remaining(service), Some(capacity));
}

#[tokio::test]
async fn reset_frees_capacity() {
    let limiter = limiter_with("svc", RatePolicy::new(1, Duration::from_secs(60)));
    assert!(limiter.check_limit("svc").await);
    assert!(!limiter.check_limit("svc").await);

    limiter.reset("svc");

    assert!(limiter.check_limit("svc").await);
}

#[tokio::test(start_paused = true)]
async fn concurrent_callers_share_one_window() {
    let limiter = Arc::new(limiter_with("quickbooks", RatePolicy::new(5, Duration::from_secs(60))));

    let callers: Vec<_> = (0..12)
        .map(|_| {
            let limiter = Arc::clone(&limiter);
            tokio::spawn(async move { limiter.check_limit("quickbooks").await })
        })
        .collect();

    let mut admitted = 0;
    for caller in callers {
        if caller.await.expect("task completes") {
            admitted += 1;
        }
    }
    assert_eq!(admitted, 5);
}
