// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::time::Duration;

/// Exponentially growing delays: `min(initial * multiplier^n, max)` for `n = 0, 1, 2, ...`.
///
/// The iterator never ends. A multiplier below one is treated as one, so delays never shrink.
///
/// ```
/// use std::time::Duration;
///
/// use rebound::Backoff;
///
/// let delays: Vec<_> = Backoff::new(Duration::from_secs(1), Duration::from_secs(5), 2.0).take(5).collect();
/// assert_eq!(delays, [1, 2, 4, 5, 5].map(Duration::from_secs));
/// ```
#[derive(Debug, Clone)]
pub struct Backoff {
    initial: Duration,
    max: Duration,
    multiplier: f64,
    attempt: u32,
}

impl Backoff {
    /// Creates the delay sequence.
    #[must_use]
    pub fn new(initial: Duration, max: Duration, multiplier: f64) -> Self {
        Self {
            initial,
            max,
            multiplier: if multiplier.is_finite() { multiplier.max(1.0) } else { 1.0 },
            attempt: 0,
        }
    }

    fn delay_at(&self, attempt: u32) -> Duration {
        let factor = self.multiplier.powi(i32::try_from(attempt).unwrap_or(i32::MAX));
        // Overflow saturates at the cap.
        Duration::try_from_secs_f64(self.initial.as_secs_f64() * factor)
            .unwrap_or(self.max)
            .min(self.max)
    }
}

impl Iterator for Backoff {
    type Item = Duration;

    fn next(&mut self) -> Option<Self::Item> {
        let delay = self.delay_at(self.attempt);
        self.attempt = self.attempt.saturating_add(1);
        Some(delay)
    }
}
