// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::path::PathBuf;
use std::time::Duration;

use cellar_disk::DurableTier;
use cellar_memory::VolatileTier;
use cellar_tier::{CacheTier, Clock};

use crate::cache::HybridCache;

/// Default time-to-live applied when `set` or `wrap` is called without one.
pub(crate) const DEFAULT_TTL: Duration = Duration::from_secs(60 * 60);

/// Default byte budget of the volatile tier.
pub(crate) const DEFAULT_VOLATILE_BUDGET: usize = 100 * 1024 * 1024;

/// Entries at or above this serialized size stay on disk only.
pub(crate) const DEFAULT_PROMOTION_THRESHOLD: usize = 1024 * 1024;

/// Default period of the background sweep.
pub(crate) const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Builder for [`HybridCache`].
///
/// Created with [`HybridCache::builder`].
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use cellar::HybridCache;
///
/// let cache = HybridCache::builder("/tmp/relay-cache")
///     .default_ttl(Duration::from_secs(300))
///     .volatile_budget(16 * 1024 * 1024)
///     .promotion_threshold(64 * 1024)
///     .build();
/// assert_eq!(cache.default_ttl(), Duration::from_secs(300));
/// ```
#[derive(Debug)]
pub struct CacheBuilder {
    root: PathBuf,
    default_ttl: Duration,
    volatile_budget: usize,
    promotion_threshold: usize,
    sweep_interval: Duration,
    clock: Clock,
}

impl CacheBuilder {
    pub(crate) fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            default_ttl: DEFAULT_TTL,
            volatile_budget: DEFAULT_VOLATILE_BUDGET,
            promotion_threshold: DEFAULT_PROMOTION_THRESHOLD,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            clock: Clock::new(),
        }
    }

    /// Sets the TTL used when none is given per call. Defaults to one hour.
    #[must_use]
    pub fn default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    /// Sets the volatile tier's byte budget. Defaults to 100 MiB.
    #[must_use]
    pub fn volatile_budget(mut self, bytes: usize) -> Self {
        self.volatile_budget = bytes;
        self
    }

    /// Sets the size below which values are kept in memory. Defaults to 1 MiB.
    #[must_use]
    pub fn promotion_threshold(mut self, bytes: usize) -> Self {
        self.promotion_threshold = bytes;
        self
    }

    /// Sets how often the background sweeper runs. Defaults to five minutes.
    #[must_use]
    pub fn sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    /// Replaces the clock used for TTL decisions.
    #[must_use]
    pub fn clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Builds a cache persisting to the configured root directory.
    ///
    /// The directory is created lazily by the first write.
    #[must_use]
    pub fn build(self) -> HybridCache {
        let durable = DurableTier::new(self.root.clone());
        self.build_durable(durable)
    }

    /// Builds a cache over a custom durable tier. The configured root is ignored.
    #[must_use]
    pub fn build_durable<D: CacheTier>(self, durable: D) -> HybridCache<D> {
        HybridCache::from_parts(
            VolatileTier::with_budget(self.volatile_budget),
            durable,
            self.clock,
            self.default_ttl,
            self.promotion_threshold,
            self.sweep_interval,
        )
    }
}
