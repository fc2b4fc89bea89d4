// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::time::Duration;

/// A bounded wait for admission ran out of time.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("no admission for service '{service}' within {}ms", timeout.as_millis())]
pub struct WaitTimeout {
    service: String,
    timeout: Duration,
}

impl WaitTimeout {
    pub(crate) fn new(service: &str, timeout: Duration) -> Self {
        Self {
            service: service.to_owned(),
            timeout,
        }
    }

    /// Returns the service that was waited on.
    #[must_use]
    pub fn service(&self) -> &str {
        &self.service
    }

    /// Returns how long the caller waited.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}
