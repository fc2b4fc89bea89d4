// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt::Display;
use std::time::Duration;

use cellar::{CacheKey, HybridCache, SweepHandle};
use parking_lot::Mutex;
use rebound::{Recovery, RetryExecutor};
use serde::Serialize;
use serde::de::DeserializeOwned;
use turnstile::RateLimiter;

use crate::RelayConfig;

/// The resilience context shared by every outbound call.
///
/// Construct it once with [`Relay::start`] and pass it by reference (or in an `Arc`).
#[derive(Debug)]
pub struct Relay {
    cache: HybridCache,
    limiter: RateLimiter,
    retry: RetryExecutor,
    sweeper: Mutex<Option<SweepHandle>>,
}

impl Relay {
    /// Builds the cache, limiter and retry executor described by `config`.
    ///
    /// The limiter starts from the built-in provider policies, then applies
    /// `config.services`. The cache sweeper is started when called inside a tokio runtime.
    #[must_use]
    pub fn start(config: &RelayConfig) -> Self {
        let limiter = RateLimiter::new();
        for (service, policy) in &config.services {
            limiter.set_config(service.as_str(), *policy);
        }

        let relay = Self::from_parts(config.cache.build(), limiter, RetryExecutor::new(config.retry));
        if tokio::runtime::Handle::try_current().is_ok() {
            *relay.sweeper.lock() = Some(relay.cache.spawn_sweeper());
        } else {
            tracing::debug!("relay.sweeper.skipped");
        }

        tracing::info!(
            relay.cache_root = %config.cache.root.display(),
            relay.services = config.services.len(),
            relay.max_retries = config.retry.max_retries,
            "relay.started"
        );
        relay
    }

    /// Assembles a context from existing parts. No sweeper is started.
    #[must_use]
    pub fn from_parts(cache: HybridCache, limiter: RateLimiter, retry: RetryExecutor) -> Self {
        Self {
            cache,
            limiter,
            retry,
            sweeper: Mutex::new(None),
        }
    }

    /// Returns the cache.
    #[must_use]
    pub fn cache(&self) -> &HybridCache {
        &self.cache
    }

    /// Returns the rate limiter.
    #[must_use]
    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    /// Returns the retry executor.
    #[must_use]
    pub fn retry(&self) -> &RetryExecutor {
        &self.retry
    }

    /// Returns the cached value for `key`, or calls `service` through the limiter and the retry
    /// executor and caches the result.
    ///
    /// On a miss the call waits until `service` admits a request, then runs `operation` with
    /// retries. Concurrent misses on the same key make a single remote call.
    ///
    /// # Errors
    ///
    /// Returns the operation's last error when it failed permanently or ran out of retries.
    /// Failures are not cached.
    pub async fn fetch<T, E, F, Fut>(&self, service: &str, key: impl Into<CacheKey>, ttl: Option<Duration>, operation: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        E: Recovery + Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let key: &CacheKey = &key.into();
        self.cache
            .wrap(key, ttl, || async move {
                self.limiter.wait_for_limit(service).await;
                tracing::debug!(relay.service = service, cache.key = %key, "relay.remote_call");
                self.retry.with_retry(service, operation).await
            })
            .await
    }

    /// Stops the cache sweeper, waiting for an in-progress sweep to finish.
    pub async fn shutdown(&self) {
        let sweeper = self.sweeper.lock().take();
        if let Some(sweeper) = sweeper {
            sweeper.shutdown().await;
        }
        tracing::info!("relay.stopped");
    }
}
