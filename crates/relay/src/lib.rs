// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Memoized, rate-limited, retried calls to third-party APIs.
//!
//! [`Relay`] is an explicit context that composes the three resilience building blocks:
//!
//! - a [`HybridCache`](cellar::HybridCache) that memoizes responses on disk and in memory,
//! - a [`RateLimiter`](turnstile::RateLimiter) that keeps each provider within its quota,
//! - a [`RetryExecutor`](rebound::RetryExecutor) that retries transient failures.
//!
//! Configuration comes from a [`RelayConfig`], typically loaded from TOML:
//!
//! ```toml
//! [cache]
//! root = "/var/cache/relay"
//! default_ttl_ms = 900000
//!
//! [retry]
//! max_retries = 5
//!
//! [services.stripe]
//! max_requests = 50
//! window_ms = 1000
//! ```
//!
//! # Examples
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use relay::{Relay, RelayConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = RelayConfig::load("relay.toml")?;
//! let relay = Relay::start(&config);
//!
//! let mrr: u64 = relay
//!     .fetch("stripe", ("stripe", "mrr"), Some(Duration::from_secs(300)), || async {
//!         Ok::<_, rebound::RemoteError>(12_400)
//!     })
//!     .await?;
//!
//! relay.shutdown().await;
//! # let _ = mrr;
//! # Ok(())
//! # }
//! ```

mod config;
mod context;
mod error;
pub mod logging;

#[doc(inline)]
pub use config::{CacheConfig, LogFormat, LoggingConfig, RelayConfig};
#[doc(inline)]
pub use context::Relay;
#[doc(inline)]
pub use error::RelayError;
