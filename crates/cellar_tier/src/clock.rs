// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::time::Instant;

/// Wall clock used for TTL decisions.
///
/// The clock captures an absolute origin once and then advances by the monotonic time
/// reported by [`tokio::time::Instant`]. Production code therefore sees normal wall-clock
/// time, while tests running with paused tokio time (`#[tokio::test(start_paused = true)]`)
/// can move cache time forward with `tokio::time::advance` or `sleep`.
///
/// Cloning a clock is cheap; clones share the same origin.
///
/// # Examples
///
/// ```
/// use cellar_tier::Clock;
///
/// let clock = Clock::new();
/// let a = clock.now();
/// let b = clock.now();
/// assert!(b >= a);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Clock {
    origin: SystemTime,
    started: Instant,
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock {
    /// Creates a clock anchored at the current system time.
    #[must_use]
    pub fn new() -> Self {
        Self::starting_at(SystemTime::now())
    }

    /// Creates a clock whose current time is `origin`.
    ///
    /// Useful in tests that need deterministic timestamps.
    #[must_use]
    pub fn starting_at(origin: SystemTime) -> Self {
        Self {
            origin,
            started: Instant::now(),
        }
    }

    /// Returns the current time.
    #[must_use]
    pub fn now(&self) -> SystemTime {
        self.origin + self.started.elapsed()
    }

    /// Returns the current time as milliseconds since the Unix epoch.
    #[must_use]
    pub fn now_millis(&self) -> u64 {
        epoch_millis(self.now())
    }
}

/// Converts a point in time to milliseconds since the Unix epoch.
///
/// Times before the epoch map to zero and times too far in the future saturate.
#[must_use]
pub fn epoch_millis(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX))
}

pub(crate) fn from_epoch_millis(millis: u64) -> SystemTime {
    UNIX_EPOCH + Duration::from_millis(millis)
}
