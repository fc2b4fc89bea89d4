// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Admission policy for one service: at most `max_requests` per sliding `window`.
///
/// When `retry_after` is set, [`check_limit`](crate::RateLimiter::check_limit) does not
/// reject a request over the limit; it sleeps for `retry_after` and checks again until the
/// request is admitted.
///
/// Policies deserialize from configuration with millisecond durations:
///
/// ```
/// use std::time::Duration;
///
/// use turnstile::RatePolicy;
///
/// let policy: RatePolicy = serde_json::from_str(r#"{"max_requests": 50, "window_ms": 1000, "retry_after_ms": 250}"#)?;
/// assert_eq!(policy, RatePolicy::new(50, Duration::from_secs(1)).with_retry_after(Duration::from_millis(250)));
/// # Ok::<(), serde_json::Error>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatePolicy {
    /// Requests admitted per window.
    pub max_requests: u32,
    /// Length of the sliding window.
    #[serde(rename = "window_ms", with = "millis")]
    pub window: Duration,
    /// Pause before re-checking a request over the limit. Zero means [`POLL_INTERVAL`](crate::POLL_INTERVAL).
    #[serde(rename = "retry_after_ms", default, with = "optional_millis", skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<Duration>,
}

impl RatePolicy {
    /// Creates a policy without a retry pause.
    #[must_use]
    pub const fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            retry_after: None,
        }
    }

    /// Makes over-limit checks wait `pause` and retry instead of rejecting.
    #[must_use]
    pub const fn with_retry_after(mut self, pause: Duration) -> Self {
        self.retry_after = Some(pause);
        self
    }
}

fn to_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub(super) fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(super::to_millis(*duration))
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

mod optional_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    #[expect(clippy::ref_option, reason = "serde's `with` passes a reference to the field")]
    pub(super) fn serialize<S: Serializer>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error> {
        match duration {
            Some(duration) => serializer.serialize_some(&super::to_millis(*duration)),
            None => serializer.serialize_none(),
        }
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Duration>, D::Error> {
        Option::<u64>::deserialize(deserializer).map(|millis| millis.map(Duration::from_millis))
    }
}
