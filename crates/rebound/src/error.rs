// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt::{self, Display, Formatter};
use std::io;
use std::time::SystemTime;

use http::{HeaderMap, StatusCode};

use recoverable::{Recovery, RecoveryInfo};

use crate::RetryAfter;
use crate::classify::{is_retryable_status, is_transient_message};

/// Transport-level failures that never produced a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NetworkFailure {
    /// The peer reset the connection.
    ConnectionReset,
    /// Nothing accepted the connection.
    ConnectionRefused,
    /// The connection was aborted locally.
    ConnectionAborted,
    /// No response arrived in time.
    Timeout,
    /// The host name did not resolve.
    Dns,
}

impl Display for NetworkFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::ConnectionReset => "connection reset",
            Self::ConnectionRefused => "connection refused",
            Self::ConnectionAborted => "connection aborted",
            Self::Timeout => "timed out",
            Self::Dns => "dns lookup failed",
        })
    }
}

/// A failed call to a remote service.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use http::StatusCode;
/// use rebound::{Recovery, RecoveryKind, RemoteError, RetryAfter};
///
/// let throttled = RemoteError::status(StatusCode::TOO_MANY_REQUESTS)
///     .with_retry_after(RetryAfter::Delay(Duration::from_secs(2)));
/// assert_eq!(throttled.recovery().get_delay(), Some(Duration::from_secs(2)));
///
/// assert_eq!(RemoteError::status(StatusCode::BAD_REQUEST).recovery().kind(), RecoveryKind::Never);
/// ```
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum RemoteError {
    /// The request never got a response.
    #[error("network failure: {failure}")]
    Network {
        /// What went wrong.
        failure: NetworkFailure,
        /// The transport error, when one is available.
        #[source]
        source: Option<io::Error>,
    },

    /// The service answered with an unsuccessful status.
    #[error("remote service responded with {status}")]
    Status {
        /// The response status.
        status: StatusCode,
        /// Parsed `Retry-After` hint.
        retry_after: Option<RetryAfter>,
    },

    /// The call failed with a free-form message, e.g. from a client library.
    #[error("{0}")]
    Message(String),
}

impl RemoteError {
    /// Creates a [`RemoteError::Network`] without a source.
    #[must_use]
    pub fn network(failure: NetworkFailure) -> Self {
        Self::Network { failure, source: None }
    }

    /// Creates a [`RemoteError::Status`] without a retry hint.
    #[must_use]
    pub fn status(status: StatusCode) -> Self {
        Self::Status { status, retry_after: None }
    }

    /// Creates a [`RemoteError::Status`], reading the hint from the response headers.
    #[must_use]
    pub fn from_response(status: StatusCode, headers: &HeaderMap) -> Self {
        Self::Status {
            status,
            retry_after: RetryAfter::from_headers(headers),
        }
    }

    /// Creates a [`RemoteError::Message`].
    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }

    /// Attaches a retry hint. Has no effect on variants other than [`RemoteError::Status`].
    #[must_use]
    pub fn with_retry_after(mut self, hint: RetryAfter) -> Self {
        if let Self::Status { retry_after, .. } = &mut self {
            *retry_after = Some(hint);
        }
        self
    }

    /// Returns the response status, if the service answered.
    #[must_use]
    pub fn status_code(&self) -> Option<StatusCode> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<io::Error> for RemoteError {
    fn from(error: io::Error) -> Self {
        let failure = match error.kind() {
            io::ErrorKind::ConnectionReset | io::ErrorKind::BrokenPipe => NetworkFailure::ConnectionReset,
            io::ErrorKind::ConnectionRefused => NetworkFailure::ConnectionRefused,
            io::ErrorKind::ConnectionAborted | io::ErrorKind::NotConnected => NetworkFailure::ConnectionAborted,
            io::ErrorKind::TimedOut => NetworkFailure::Timeout,
            _ => return Self::Message(error.to_string()),
        };
        Self::Network {
            failure,
            source: Some(error),
        }
    }
}

impl Recovery for RemoteError {
    fn recovery(&self) -> RecoveryInfo {
        match self {
            Self::Network { .. } => RecoveryInfo::retry(),
            Self::Status { status, retry_after } if is_retryable_status(*status) => match retry_after {
                Some(hint) => RecoveryInfo::retry().delay(hint.delay_from(SystemTime::now())),
                None => RecoveryInfo::retry(),
            },
            Self::Status { .. } => RecoveryInfo::never(),
            Self::Message(message) if is_transient_message(message) => RecoveryInfo::retry(),
            Self::Message(_) => RecoveryInfo::never(),
        }
    }
}
