// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::collections::HashMap;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;

use crate::window::{Admission, RateWindow};
use crate::{RatePolicy, WaitTimeout};

/// How often [`RateLimiter::wait_for_limit`] re-checks a service over its limit.
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

const SECOND: Duration = Duration::from_secs(1);
const MINUTE: Duration = Duration::from_secs(60);
const HOUR: Duration = Duration::from_secs(60 * 60);

/// Policies registered by [`RateLimiter::new`].
const DEFAULT_POLICIES: [(&str, RatePolicy); 5] = [
    ("stripe", RatePolicy::new(100, SECOND)),
    ("hubspot", RatePolicy::new(100, Duration::from_secs(10))),
    ("mercury", RatePolicy::new(120, MINUTE)),
    ("quickbooks", RatePolicy::new(500, MINUTE)),
    ("github", RatePolicy::new(5000, HOUR)),
];

/// Sliding-window admission control keyed by service name.
///
/// All methods take `&self`; share the limiter behind an `Arc` or a borrowed context.
/// Admission decisions are made under a short synchronous lock and never held across an
/// `.await`.
#[derive(Debug)]
pub struct RateLimiter {
    windows: Mutex<HashMap<String, RateWindow>>,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

impl RateLimiter {
    /// Creates a limiter seeded with the built-in provider policies:
    ///
    /// | service      | limit              |
    /// |--------------|--------------------|
    /// | `stripe`     | 100 per second     |
    /// | `hubspot`    | 100 per 10 seconds |
    /// | `mercury`    | 120 per minute     |
    /// | `quickbooks` | 500 per minute     |
    /// | `github`     | 5000 per hour      |
    #[must_use]
    pub fn new() -> Self {
        let limiter = Self::empty();
        for (service, policy) in DEFAULT_POLICIES {
            limiter.set_config(service, policy);
        }
        limiter
    }

    /// Creates a limiter with no policies. Every service is admitted until configured.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// Registers or replaces the policy for `service`.
    ///
    /// Requests already admitted stay in the window and count against the new limit.
    pub fn set_config(&self, service: impl Into<String>, policy: RatePolicy) {
        let service = service.into();
        tracing::debug!(
            limiter.service = %service,
            limiter.max_requests = policy.max_requests,
            limiter.window_ms = policy.window.as_millis(),
            "limiter.configured"
        );

        self.windows
            .lock()
            .entry(service)
            .and_modify(|window| window.policy = policy)
            .or_insert_with(|| RateWindow::new(policy));
    }

    /// Returns the policy registered for `service`.
    #[must_use]
    pub fn policy(&self, service: &str) -> Option<RatePolicy> {
        self.windows.lock().get(service).map(|window| window.policy)
    }

    /// Returns how many more requests `service` may make in the current window, or `None`
    /// when it has no policy.
    #[must_use]
    pub fn remaining(&self, service: &str) -> Option<u32> {
        let now = Instant::now();
        self.windows.lock().get_mut(service).map(|window| window.remaining(now))
    }

    /// Forgets every request admitted for `service`.
    pub fn reset(&self, service: &str) {
        if let Some(window) = self.windows.lock().get_mut(service) {
            window.reset();
        }
    }

    /// Tries to admit one request for `service` and records it when admitted.
    ///
    /// Returns `false` when the window is full. If the policy has a `retry_after` pause, a full
    /// window is not a rejection: the call sleeps for the pause and checks again, returning
    /// `true` once the request is admitted. A zero pause waits [`POLL_INTERVAL`] instead.
    /// Services without a policy are always admitted.
    pub async fn check_limit(&self, service: &str) -> bool {
        loop {
            let pause = match self.try_admit(service) {
                Some((Admission::Admitted, _)) | None => return true,
                Some((Admission::Rejected, None)) => {
                    tracing::debug!(limiter.service = service, "limiter.rejected");
                    return false;
                }
                Some((Admission::Rejected, Some(pause))) if pause.is_zero() => POLL_INTERVAL,
                Some((Admission::Rejected, Some(pause))) => pause,
            };

            tracing::debug!(limiter.service = service, limiter.pause_ms = pause.as_millis(), "limiter.paused");
            tokio::time::sleep(pause).await;
        }
    }

    /// Waits until a request for `service` is admitted, polling every [`POLL_INTERVAL`].
    ///
    /// The wait is unbounded; drop the future to abandon it or use
    /// [`wait_for_limit_within`](Self::wait_for_limit_within).
    pub async fn wait_for_limit(&self, service: &str) {
        let mut logged = false;
        while !self.check_limit(service).await {
            if !logged {
                tracing::info!(limiter.service = service, "limiter.waiting");
                logged = true;
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    /// Like [`wait_for_limit`](Self::wait_for_limit), but gives up after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`WaitTimeout`] when no admission happens in time. Nothing is recorded then.
    pub async fn wait_for_limit_within(&self, service: &str, timeout: Duration) -> Result<(), WaitTimeout> {
        match tokio::time::timeout(timeout, self.wait_for_limit(service)).await {
            Ok(()) => Ok(()),
            Err(_elapsed) => {
                tracing::warn!(limiter.service = service, limiter.timeout_ms = timeout.as_millis(), "limiter.wait_timed_out");
                Err(WaitTimeout::new(service, timeout))
            }
        }
    }

    fn try_admit(&self, service: &str) -> Option<(Admission, Option<Duration>)> {
        let now = Instant::now();
        let mut windows = self.windows.lock();
        let window = windows.get_mut(service)?;
        Some((window.try_admit(now), window.policy.retry_after))
    }
}
