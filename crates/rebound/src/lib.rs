// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Retries for calls to remote services.
//!
//! [`RetryExecutor`] runs an async operation up to `max_retries + 1` times. Between attempts
//! that failed with a *transient* error it sleeps for an exponentially growing delay, capped at
//! `max_delay`. A retry hint supplied by the provider replaces the computed delay for the next
//! attempt.
//!
//! Whether an error is transient is decided by the [`Recovery`] trait from the `recoverable`
//! crate, re-exported here. It is implemented for [`RemoteError`], [`classify_io`] classifies
//! [`std::io::Error`], and callers can implement it for their own error types. Only
//! [`RecoveryKind::Retry`] is retried:
//!
//! - connection resets, refusals, aborts, timeouts and DNS failures are transient;
//! - HTTP 429, 502, 503 and 504 are transient;
//! - messages that mention a broken connection (`ECONNRESET`, `socket hang up`, ...) are
//!   transient;
//! - everything else is fatal and returned after the first attempt.
//!
//! # Examples
//!
//! ```
//! use std::time::Duration;
//!
//! use http::StatusCode;
//! use rebound::{RemoteError, RetryExecutor, RetryPolicy};
//!
//! # #[tokio::main(flavor = "current_thread", start_paused = true)]
//! # async fn main() {
//! let retry = RetryExecutor::new(RetryPolicy {
//!     initial_delay: Duration::from_millis(10),
//!     ..RetryPolicy::default()
//! });
//!
//! let mut calls = 0;
//! let balance = retry
//!     .with_retry("stripe.balance", || {
//!         calls += 1;
//!         let attempt = calls;
//!         async move {
//!             if attempt < 3 {
//!                 Err(RemoteError::status(StatusCode::SERVICE_UNAVAILABLE))
//!             } else {
//!                 Ok(1_250)
//!             }
//!         }
//!     })
//!     .await;
//!
//! assert_eq!(balance.ok(), Some(1_250));
//! assert_eq!(calls, 3);
//! # }
//! ```

mod backoff;
mod classify;
mod error;
mod executor;
mod policy;
mod retry_after;

#[doc(inline)]
pub use backoff::Backoff;
#[doc(inline)]
pub use classify::{classify_io, is_retryable_status, is_transient_message, retries};
#[doc(inline)]
pub use error::{NetworkFailure, RemoteError};
#[doc(inline)]
pub use executor::RetryExecutor;
#[doc(inline)]
pub use policy::RetryPolicy;
pub use recoverable::{Recovery, RecoveryInfo, RecoveryKind};
#[doc(inline)]
pub use retry_after::RetryAfter;
