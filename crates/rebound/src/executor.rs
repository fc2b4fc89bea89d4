// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt::Display;
use std::ops::ControlFlow;
use std::time::Duration;

use recoverable::Recovery;

use crate::RetryPolicy;
use crate::classify::retries;

/// Runs fallible async operations under a [`RetryPolicy`].
///
/// Attempts move through these states:
///
/// ```text
/// Attempting ─ok──────────────────────────────▶ Success
///     │
///     ├─transient, attempts left─▶ Waiting ─▶ Attempting
///     ├─transient, none left──────▶ RetriesExhausted
///     └─permanent─────────────────▶ FatalFailure
/// ```
///
/// The error of the last attempt is returned unchanged in both failure states.
#[derive(Debug, Clone, Default)]
pub struct RetryExecutor {
    policy: RetryPolicy,
}

/// Why the loop stopped retrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stop {
    Fatal,
    Exhausted,
}

impl Stop {
    fn as_str(self) -> &'static str {
        match self {
            Self::Fatal => "fatal",
            Self::Exhausted => "exhausted",
        }
    }
}

impl RetryExecutor {
    /// Creates an executor whose [`with_retry`](Self::with_retry) uses `policy`.
    #[must_use]
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    /// Returns the default policy.
    #[must_use]
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Runs `operation` with the executor's policy.
    ///
    /// `context` names the operation in log events.
    ///
    /// # Errors
    ///
    /// Returns the error of the last attempt when it was permanent or no retries were left.
    pub async fn with_retry<T, E, F, Fut>(&self, context: &str, operation: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Recovery + Display,
    {
        self.with_retry_policy(&self.policy, context, operation).await
    }

    /// Runs `operation` with an explicit policy.
    ///
    /// # Errors
    ///
    /// Returns the error of the last attempt when it was permanent or no retries were left.
    pub async fn with_retry_policy<T, E, F, Fut>(&self, policy: &RetryPolicy, context: &str, mut operation: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Recovery + Display,
    {
        let max_attempts = policy.max_attempts();
        let mut delays = policy.backoff();
        let mut attempt = 1;

        loop {
            let error = match operation().await {
                Ok(value) => {
                    if attempt > 1 {
                        tracing::info!(retry.context = context, retry.attempt = attempt, "retry.recovered");
                    }
                    return Ok(value);
                }
                Err(error) => error,
            };

            match evaluate_attempt(&error, attempt, max_attempts, &mut delays) {
                ControlFlow::Continue(delay) => {
                    tracing::warn!(
                        retry.context = context,
                        retry.attempt = attempt,
                        retry.max_attempts = max_attempts,
                        retry.delay_ms = delay.as_millis(),
                        error = %error,
                        "retry.scheduled"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                ControlFlow::Break(stop) => {
                    tracing::error!(
                        retry.context = context,
                        retry.attempt = attempt,
                        retry.max_attempts = max_attempts,
                        retry.outcome = stop.as_str(),
                        error = %error,
                        "retry.failed"
                    );
                    return Err(error);
                }
            }
        }
    }
}

/// Decides what follows a failed attempt: the delay before the next one, or a stop.
///
/// The backoff sequence advances on every retry, including retries whose delay comes from the
/// error's hint. Hints are not capped.
fn evaluate_attempt(
    error: &impl Recovery,
    attempt: u32,
    max_attempts: u32,
    delays: &mut impl Iterator<Item = Duration>,
) -> ControlFlow<Stop, Duration> {
    let recovery = error.recovery();
    if !retries(&recovery) {
        return ControlFlow::Break(Stop::Fatal);
    }
    if attempt >= max_attempts {
        return ControlFlow::Break(Stop::Exhausted);
    }

    let backoff_delay = delays.next().unwrap_or(Duration::ZERO);
    ControlFlow::Continue(recovery.get_delay().unwrap_or(backoff_delay))
}
