// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::collections::VecDeque;

use tokio::time::Instant;

use crate::RatePolicy;

/// Admitted request instants for one service, oldest first.
#[derive(Debug)]
pub(crate) struct RateWindow {
    pub(crate) policy: RatePolicy,
    admitted: VecDeque<Instant>,
}

/// Outcome of a single admission attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Admission {
    Admitted,
    Rejected,
}

impl RateWindow {
    pub(crate) fn new(policy: RatePolicy) -> Self {
        Self {
            policy,
            admitted: VecDeque::new(),
        }
    }

    /// Drops instants older than `now - window`. An instant exactly one window old is kept.
    fn purge(&mut self, now: Instant) {
        while self
            .admitted
            .front()
            .is_some_and(|&at| now.saturating_duration_since(at) > self.policy.window)
        {
            self.admitted.pop_front();
        }
    }

    pub(crate) fn try_admit(&mut self, now: Instant) -> Admission {
        self.purge(now);
        if self.admitted.len() >= self.policy.max_requests as usize {
            return Admission::Rejected;
        }
        self.admitted.push_back(now);
        Admission::Admitted
    }

    pub(crate) fn remaining(&mut self, now: Instant) -> u32 {
        self.purge(now);
        let used = u32::try_from(self.admitted.len()).unwrap_or(u32::MAX);
        self.policy.max_requests.saturating_sub(used)
    }

    pub(crate) fn reset(&mut self) {
        self.admitted.clear();
    }
}
