// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::Backoff;

/// How many times to retry and how long to wait in between.
///
/// Deserializes from configuration with millisecond durations; missing fields take their
/// defaults:
///
/// ```
/// use std::time::Duration;
///
/// use rebound::RetryPolicy;
///
/// let policy: RetryPolicy = serde_json::from_str(r#"{"max_retries": 5, "initial_delay_ms": 200}"#)?;
/// assert_eq!(policy.max_retries, 5);
/// assert_eq!(policy.initial_delay, Duration::from_millis(200));
/// assert_eq!(policy.max_delay, Duration::from_secs(30));
/// # Ok::<(), serde_json::Error>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry.
    #[serde(rename = "initial_delay_ms", with = "millis")]
    pub initial_delay: Duration,
    /// Upper bound for computed delays.
    #[serde(rename = "max_delay_ms", with = "millis")]
    pub max_delay: Duration,
    /// Growth factor applied to the delay after every attempt.
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    /// Three retries starting at one second, doubling up to thirty seconds.
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Returns the total number of attempts, including the first.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Returns the delays this policy produces, one per retry.
    #[must_use]
    pub fn backoff(&self) -> Backoff {
        Backoff::new(self.initial_delay, self.max_delay, self.backoff_multiplier)
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub(super) fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
