// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::io;

use http::StatusCode;
use recoverable::{RecoveryInfo, RecoveryKind};

/// Message fragments that indicate a dropped or unreachable connection.
///
/// Matched case-insensitively.
const TRANSIENT_MARKERS: [&str; 9] = [
    "econnreset",
    "etimedout",
    "enotfound",
    "eai_again",
    "socket hang up",
    "broken pipe",
    "connection reset",
    "connection closed",
    "failed to lookup address",
];

/// Returns `true` when `message` describes a transient network failure.
///
/// ```
/// use rebound::is_transient_message;
///
/// assert!(is_transient_message("request failed: socket hang up"));
/// assert!(is_transient_message("getaddrinfo EAI_AGAIN api.hubapi.com"));
/// assert!(!is_transient_message("invalid api key"));
/// ```
#[must_use]
pub fn is_transient_message(message: &str) -> bool {
    let message = message.to_ascii_lowercase();
    TRANSIENT_MARKERS.iter().any(|marker| message.contains(marker))
}

/// Returns `true` for 429, 502, 503 and 504.
#[must_use]
pub fn is_retryable_status(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::TOO_MANY_REQUESTS | StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT
    )
}

/// Classifies a transport error.
///
/// Connection resets, refusals, aborts, broken pipes and timeouts are transient, as are errors
/// whose message matches [`is_transient_message`]. Everything else is permanent.
///
/// ```
/// use std::io;
///
/// use rebound::{RecoveryKind, classify_io};
///
/// assert_eq!(classify_io(&io::Error::from(io::ErrorKind::TimedOut)).kind(), RecoveryKind::Retry);
/// assert_eq!(classify_io(&io::Error::from(io::ErrorKind::PermissionDenied)).kind(), RecoveryKind::Never);
/// ```
#[must_use]
pub fn classify_io(error: &io::Error) -> RecoveryInfo {
    match error.kind() {
        io::ErrorKind::ConnectionReset
        | io::ErrorKind::ConnectionRefused
        | io::ErrorKind::ConnectionAborted
        | io::ErrorKind::NotConnected
        | io::ErrorKind::BrokenPipe
        | io::ErrorKind::TimedOut => RecoveryInfo::retry(),
        _ if is_transient_message(&error.to_string()) => RecoveryInfo::retry(),
        _ => RecoveryInfo::never(),
    }
}

/// Returns `true` only for [`RecoveryKind::Retry`].
///
/// [`RecoveryKind::Unknown`] and [`RecoveryKind::Unavailable`] are not retried.
#[must_use]
pub fn retries(recovery: &RecoveryInfo) -> bool {
    recovery.kind() == RecoveryKind::Retry
}

#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(StatusCode::TOO_MANY_REQUESTS, true)]
    #[case(StatusCode::BAD_GATEWAY, true)]
    #[case(StatusCode::SERVICE_UNAVAILABLE, true)]
    #[case(StatusCode::GATEWAY_TIMEOUT, true)]
    #[case(StatusCode::INTERNAL_SERVER_ERROR, false)]
    #[case(StatusCode::BAD_REQUEST, false)]
    #[case(StatusCode::UNAUTHORIZED, false)]
    #[case(StatusCode::NOT_FOUND, false)]
    fn status_classification(#[case] status: StatusCode, #[case] retryable: bool) {
        assert_eq!(is_retryable_status(status), retryable);
    }

    #[rstest]
    #[case("read ECONNRESET")]
    #[case("connect ETIMEDOUT 10.0.0.1:443")]
    #[case("getaddrinfo ENOTFOUND api.stripe.com")]
    #[case("Broken pipe (os error 32)")]
    #[case("Connection reset by peer")]
    #[case("connection closed before message completed")]
    fn transient_messages(#[case] message: &str) {
        assert!(is_transient_message(message));
    }

    #[rstest]
    #[case::reset(io::ErrorKind::ConnectionReset)]
    #[case::refused(io::ErrorKind::ConnectionRefused)]
    #[case::aborted(io::ErrorKind::ConnectionAborted)]
    #[case::timed_out(io::ErrorKind::TimedOut)]
    #[case::broken_pipe(io::ErrorKind::BrokenPipe)]
    fn transient_io_kinds_retry(#[case] kind: io::ErrorKind) {
        assert!(retries(&classify_io(&io::Error::from(kind))));
    }

    #[test]
    fn io_message_is_consulted() {
        let dns = io::Error::other("failed to lookup address information: Name or service not known");
        assert!(retries(&classify_io(&dns)));

        let denied = io::Error::from(io::ErrorKind::PermissionDenied);
        assert_eq!(classify_io(&denied), RecoveryInfo::never());
    }

    #[test]
    fn only_retry_kind_retries() {
        assert!(retries(&RecoveryInfo::retry()));
        assert!(!retries(&RecoveryInfo::never()));
        assert!(!retries(&RecoveryInfo::unknown()));
        assert!(!retries(&RecoveryInfo::unavailable()));
    }
}
