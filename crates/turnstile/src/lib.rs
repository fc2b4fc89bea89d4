// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Per-service sliding-window admission control.
//!
//! A [`RateLimiter`] keeps, for every registered service, the instants of the requests it
//! admitted within the service's window. A request is admitted while fewer than
//! `max_requests` instants fall inside `[now - window, now]`.
//!
//! Services without a policy are always admitted.
//!
//! # Examples
//!
//! ```
//! use std::time::Duration;
//!
//! use turnstile::{RateLimiter, RatePolicy};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let limiter = RateLimiter::empty();
//! limiter.set_config("ledger", RatePolicy::new(2, Duration::from_secs(1)));
//!
//! assert!(limiter.check_limit("ledger").await);
//! assert!(limiter.check_limit("ledger").await);
//! assert!(!limiter.check_limit("ledger").await);
//! assert_eq!(limiter.remaining("ledger"), Some(0));
//!
//! // Unregistered services fail open.
//! assert!(limiter.check_limit("unknown").await);
//! # }
//! ```

mod error;
mod limiter;
mod policy;
mod window;

#[doc(inline)]
pub use error::WaitTimeout;
#[doc(inline)]
pub use limiter::{POLL_INTERVAL, RateLimiter};
#[doc(inline)]
pub use policy::RatePolicy;
