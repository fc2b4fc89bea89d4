// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![allow(missing_docs, reason = "This is a test module")]

//! Retry behavior of `RetryExecutor` under paused time.

use std::fmt::{self, Display, Formatter};
use std::io;
use std::sync::Mutex;
use std::time::{Duration, SystemTime};

use http::StatusCode;
use pretty_assertions::assert_eq;
use rebound::{NetworkFailure, Recovery, RecoveryInfo, RemoteError, RetryAfter, RetryExecutor, RetryPolicy};
use tokio::time::Instant;
use tracing_test::traced_test;

fn fast_policy() -> RetryPolicy {
    RetryPolicy {
        max_retries: 3,
        initial_delay: Duration::from_millis(100),
        max_delay: Duration::from_millis(250),
        backoff_multiplier: 2.0,
    }
}

/// Records when each attempt started.
struct Script {
    started: Mutex<Vec<Instant>>,
}

impl Script {
    fn new() -> Self {
        Self {
            started: Mutex::new(Vec::new()),
        }
    }

    fn begin(&self) -> usize {
        let mut started = self.started.lock().expect("not poisoned");
        started.push(Instant::now());
        started.len()
    }

    fn attempts(&self) -> usize {
        self.started.lock().expect("not poisoned").len()
    }

    fn gaps(&self) -> Vec<Duration> {
        let started = self.started.lock().expect("not poisoned");
        started.windows(2).map(|pair| pair[1] - pair[0]).collect()
    }
}

#[tokio::test(start_paused = true)]
async fn retries_transient_failures_then_succeeds() {
    let script = &Script::new();
    let retry = RetryExecutor::new(fast_policy());

    let result = retry
        .with_retry("stripe.charges", || async move {
            if script.begin() < 4 {
                Err(RemoteError::status(StatusCode::SERVICE_UNAVAILABLE))
            } else {
                Ok("charges")
            }
        })
        .await;

    assert_eq!(result.ok(), Some("charges"));
    assert_eq!(script.attempts(), 4);

    let gaps = script.gaps();
    assert_eq!(gaps, [100, 200, 250].map(Duration::from_millis));
    assert!(gaps.windows(2).all(|pair| pair[0] <= pair[1]), "delays never shrink");
    assert!(gaps.iter().all(|gap| *gap <= fast_policy().max_delay));
}

#[tokio::test(start_paused = true)]
#[traced_test]
async fn exhausted_retries_return_last_error() {
    let script = &Script::new();
    let retry = RetryExecutor::new(fast_policy());

    let error = retry
        .with_retry("hubspot.deals", || async move {
            let attempt = script.begin();
            Err::<(), _>(RemoteError::message(format!("read ECONNRESET (attempt {attempt})")))
        })
        .await
        .expect_err("never succeeds");

    assert_eq!(script.attempts(), 4);
    assert_eq!(error.to_string(), "read ECONNRESET (attempt 4)");
    assert!(logs_contain("retry.scheduled"));
    assert!(logs_contain("retry.failed"));
    assert!(logs_contain("hubspot.deals"));
}

#[tokio::test(start_paused = true)]
async fn fatal_errors_short_circuit() {
    let script = &Script::new();
    let retry = RetryExecutor::default();
    let start = Instant::now();

    let error = retry
        .with_retry("quickbooks.invoices", || async move {
            script.begin();
            Err::<(), _>(RemoteError::status(StatusCode::BAD_REQUEST))
        })
        .await
        .expect_err("400 is fatal");

    assert_eq!(script.attempts(), 1);
    assert_eq!(error.status_code(), Some(StatusCode::BAD_REQUEST));
    assert_eq!(start.elapsed(), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn retry_after_hint_overrides_backoff_without_cap() {
    let script = &Script::new();
    let retry = RetryExecutor::new(fast_policy());

    let result = retry
        .with_retry("github.repos", || async move {
            if script.begin() == 1 {
                Err(RemoteError::status(StatusCode::TOO_MANY_REQUESTS).with_retry_after(RetryAfter::Delay(Duration::from_secs(45))))
            } else {
                Ok(())
            }
        })
        .await;

    assert!(result.is_ok());
    assert_eq!(script.gaps(), [Duration::from_secs(45)]);
}

#[tokio::test(start_paused = true)]
async fn past_retry_date_retries_immediately() {
    let script = &Script::new();
    let retry = RetryExecutor::new(fast_policy());
    let past = RetryAfter::At(SystemTime::now() - Duration::from_secs(60));

    let result = retry
        .with_retry("mercury.accounts", || async move {
            if script.begin() == 1 {
                Err(RemoteError::status(StatusCode::SERVICE_UNAVAILABLE).with_retry_after(past))
            } else {
                Ok(())
            }
        })
        .await;

    assert!(result.is_ok());
    assert_eq!(script.gaps(), [Duration::ZERO]);
}

#[tokio::test(start_paused = true)]
async fn explicit_policy_overrides_default() {
    let script = &Script::new();
    let retry = RetryExecutor::new(fast_policy());
    let once = RetryPolicy {
        max_retries: 0,
        ..fast_policy()
    };

    let result = retry
        .with_retry_policy(&once, "stripe.balance", || async move {
            script.begin();
            Err::<(), _>(RemoteError::from(io::Error::from(io::ErrorKind::TimedOut)))
        })
        .await;

    let error = result.expect_err("a single attempt times out");
    assert!(matches!(error, RemoteError::Network { failure: NetworkFailure::Timeout, .. }), "got {error:?}");
    assert_eq!(script.attempts(), 1);
}

#[derive(Debug)]
enum LedgerError {
    Locked,
    Closed,
}

impl Display for LedgerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Locked => "ledger locked",
            Self::Closed => "ledger closed",
        })
    }
}

impl Recovery for LedgerError {
    fn recovery(&self) -> RecoveryInfo {
        match self {
            Self::Locked => RecoveryInfo::retry().delay(Duration::from_millis(5)),
            Self::Closed => RecoveryInfo::never(),
        }
    }
}

#[tokio::test(start_paused = true)]
async fn caller_error_types_classify_themselves() {
    let script = &Script::new();
    let retry = RetryExecutor::new(fast_policy());

    let error = retry
        .with_retry("ledger", || async move {
            match script.begin() {
                1 | 2 => Err::<(), _>(LedgerError::Locked),
                _ => Err(LedgerError::Closed),
            }
        })
        .await
        .expect_err("ends closed");

    assert!(matches!(error, LedgerError::Closed));
    assert_eq!(script.gaps(), [Duration::from_millis(5); 2]);
}
