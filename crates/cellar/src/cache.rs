// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt::{self, Debug, Formatter};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use cellar_disk::DurableTier;
use cellar_memory::VolatileTier;
use cellar_tier::{CacheEntry, CacheKey, CacheTier, Clock, Error, KeyPattern};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::builder::CacheBuilder;
use crate::flight::Flights;
use crate::stats::CacheStats;
use crate::sweeper::SweepHandle;

const VOLATILE: &str = "volatile";
const DURABLE: &str = "durable";

/// Subject logged for operations that span many keys.
const ALL_KEYS: &str = "*";

/// A two-tier cache: a FIFO, byte-budgeted memory tier over a durable tier.
///
/// Clones share the same tiers. Every operation is best effort: tier failures are logged with
/// `tracing` and then treated as a miss (reads) or a skipped write, so callers never handle a
/// cache error.
///
/// # Examples
///
/// ```no_run
/// use std::time::Duration;
///
/// use cellar::{HybridCache, KeyPattern};
///
/// # async fn example() {
/// let cache = HybridCache::builder("/var/cache/relay").build();
///
/// cache.set(("hubspot", "deals:open"), &vec![101, 102], Some(Duration::from_secs(60))).await;
/// let deals: Option<Vec<u32>> = cache.get(("hubspot", "deals:open")).await;
/// assert_eq!(deals, Some(vec![101, 102]));
///
/// let removed = cache.invalidate(KeyPattern::from("hubspot:")).await;
/// assert!(removed >= 1);
/// # }
/// ```
pub struct HybridCache<D = DurableTier> {
    inner: Arc<Inner<D>>,
}

struct Inner<D> {
    volatile: VolatileTier,
    durable: D,
    clock: Clock,
    default_ttl: Duration,
    promotion_threshold: usize,
    sweep_interval: Duration,
    flights: Flights,
}

impl HybridCache {
    /// Starts building a cache persisting under `root`.
    pub fn builder(root: impl Into<PathBuf>) -> CacheBuilder {
        CacheBuilder::new(root)
    }
}

impl<D: CacheTier> HybridCache<D> {
    pub(crate) fn from_parts(
        volatile: VolatileTier,
        durable: D,
        clock: Clock,
        default_ttl: Duration,
        promotion_threshold: usize,
        sweep_interval: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                volatile,
                durable,
                clock,
                default_ttl,
                promotion_threshold,
                sweep_interval,
                flights: Flights::default(),
            }),
        }
    }

    /// Returns the TTL applied when none is given.
    #[must_use]
    pub fn default_ttl(&self) -> Duration {
        self.inner.default_ttl
    }

    /// Returns the size below which values are kept in memory.
    #[must_use]
    pub fn promotion_threshold(&self) -> usize {
        self.inner.promotion_threshold
    }

    /// Returns the in-memory tier.
    #[must_use]
    pub fn volatile(&self) -> &VolatileTier {
        &self.inner.volatile
    }

    /// Returns the durable tier.
    #[must_use]
    pub fn durable(&self) -> &D {
        &self.inner.durable
    }

    /// Returns the clock used for TTL decisions.
    #[must_use]
    pub fn clock(&self) -> Clock {
        self.inner.clock
    }

    /// Reads a value, checking memory first and then disk.
    ///
    /// Returns `None` for misses, expired entries, tier failures and values that do not
    /// deserialize into `T`. An expired entry is deleted from the tier it was found in. A valid
    /// disk hit smaller than the promotion threshold is copied into memory.
    pub async fn get<T: DeserializeOwned>(&self, key: impl Into<CacheKey>) -> Option<T> {
        let key = key.into();
        let entry = self.lookup(&key).await?;
        decode(&key, entry)
    }

    /// Like [`get`](Self::get) but returns the raw entry.
    pub async fn get_entry(&self, key: impl Into<CacheKey>) -> Option<CacheEntry> {
        self.lookup(&key.into()).await
    }

    /// Stores a value in the durable tier, and in memory when it is below the threshold.
    ///
    /// `ttl` defaults to [`default_ttl`](Self::default_ttl). A value that cannot be serialized
    /// is not stored.
    pub async fn set<T: Serialize + ?Sized>(&self, key: impl Into<CacheKey>, value: &T, ttl: Option<Duration>) {
        let key = key.into();
        let data = match serde_json::to_value(value) {
            Ok(data) => data,
            Err(e) => {
                tracing::warn!(cache.key = %key, error = %e, "cache.encode_failed");
                return;
            }
        };

        let ttl = ttl.unwrap_or(self.inner.default_ttl);
        let entry = CacheEntry::new(&key, data, self.inner.clock.now(), ttl);
        tracing::debug!(cache.key = %key, cache.size = entry.size(), cache.ttl_ms = ttl.as_millis(), "cache.set");

        let promoted = (entry.size() < self.inner.promotion_threshold).then(|| entry.clone());
        or_log(self.inner.durable.insert(&key, entry).await, "insert", DURABLE, key.full_key());

        match promoted {
            Some(entry) => or_log(self.inner.volatile.insert(&key, entry).await, "insert", VOLATILE, key.full_key()),
            // Drop any earlier, smaller value still held in memory.
            None => {
                or_log(self.inner.volatile.remove(&key).await, "remove", VOLATILE, key.full_key());
            }
        }
    }

    /// Removes a key from both tiers. Removing a missing key is a no-op.
    pub async fn delete(&self, key: impl Into<CacheKey>) {
        let key = key.into();
        or_log(self.inner.volatile.remove(&key).await, "remove", VOLATILE, key.full_key());
        or_log(self.inner.durable.remove(&key).await, "remove", DURABLE, key.full_key());
    }

    /// Clears one namespace, or everything when `namespace` is `None`.
    pub async fn clear(&self, namespace: Option<&str>) {
        match namespace {
            None => {
                or_log(self.inner.volatile.clear().await, "clear", VOLATILE, ALL_KEYS);
                or_log(self.inner.durable.clear().await, "clear", DURABLE, ALL_KEYS);
                tracing::info!("cache.cleared");
            }
            Some(namespace) => {
                let removed = or_log(self.inner.volatile.clear_namespace(namespace).await, "clear_namespace", VOLATILE, namespace)
                    + or_log(self.inner.durable.clear_namespace(namespace).await, "clear_namespace", DURABLE, namespace);
                tracing::info!(cache.namespace = namespace, cache.removed = removed, "cache.namespace_cleared");
            }
        }
    }

    /// Removes every entry whose full key matches `pattern` and returns how many were removed
    /// across both tiers.
    ///
    /// A plain string is a substring match; use [`KeyPattern::regex`] for structured patterns.
    pub async fn invalidate(&self, pattern: impl Into<KeyPattern>) -> usize {
        let pattern = pattern.into();
        let removed = or_log(self.inner.volatile.remove_matching(&pattern).await, "invalidate", VOLATILE, ALL_KEYS)
            + or_log(self.inner.durable.remove_matching(&pattern).await, "invalidate", DURABLE, ALL_KEYS);
        tracing::info!(cache.pattern = %pattern, cache.removed = removed, "cache.invalidated");
        removed
    }

    /// Returns the cached value for `key`, or runs `producer`, stores its output and returns it.
    ///
    /// Concurrent calls that miss on the same key run one producer at a time: later callers
    /// wait and reuse the value the first one stored. A producer error is returned unchanged to
    /// its own caller only and nothing is stored; the next waiter then runs its producer.
    ///
    /// # Errors
    ///
    /// Returns the producer's error.
    pub async fn wrap<T, E, F, Fut>(&self, key: impl Into<CacheKey>, ttl: Option<Duration>, producer: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let key = key.into();
        if let Some(value) = self.get(&key).await {
            return Ok(value);
        }

        let _permit = self.inner.flights.enter(key.full_key()).await;
        if let Some(value) = self.get(&key).await {
            tracing::debug!(cache.key = %key, "cache.wrap.shared");
            return Ok(value);
        }

        tracing::debug!(cache.key = %key, "cache.wrap.produce");
        let value = producer().await?;
        self.set(&key, &value, ttl).await;
        Ok(value)
    }

    /// Returns the content hash of the stored value, if it is present and valid.
    pub async fn content_hash(&self, key: impl Into<CacheKey>) -> Option<String> {
        self.lookup(&key.into()).await.map(|entry| entry.hash().to_owned())
    }

    /// Reports occupancy of both tiers. A tier that fails to report counts as empty.
    pub async fn stats(&self) -> CacheStats {
        let volatile = or_log(self.inner.volatile.usage().await, "usage", VOLATILE, ALL_KEYS);
        let durable = or_log(self.inner.durable.usage().await, "usage", DURABLE, ALL_KEYS);
        CacheStats {
            volatile_count: volatile.entries,
            volatile_bytes: volatile.bytes,
            durable_count: durable.entries,
            durable_bytes: durable.bytes,
        }
    }

    /// Removes expired entries from both tiers and returns how many were removed.
    ///
    /// Malformed durable files are removed too.
    pub async fn sweep(&self) -> usize {
        let now = self.inner.clock.now();
        let removed = or_log(self.inner.volatile.purge_expired(now).await, "sweep", VOLATILE, ALL_KEYS)
            + or_log(self.inner.durable.purge_expired(now).await, "sweep", DURABLE, ALL_KEYS);

        if removed > 0 {
            tracing::info!(cache.removed = removed, "cache.swept");
        } else {
            tracing::debug!("cache.swept");
        }
        removed
    }

    /// Starts a background task that calls [`sweep`](Self::sweep) once per sweep interval.
    ///
    /// The first pass runs one interval after the call.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    pub fn spawn_sweeper(&self) -> SweepHandle
    where
        D: 'static,
    {
        SweepHandle::spawn(self.clone(), self.inner.sweep_interval)
    }

    async fn lookup(&self, key: &CacheKey) -> Option<CacheEntry> {
        let now = self.inner.clock.now();

        match self.inner.volatile.get(key).await {
            Ok(Some(entry)) if entry.is_valid_at(now) => {
                tracing::debug!(cache.key = %key, cache.tier = VOLATILE, "cache.hit");
                return Some(entry);
            }
            Ok(Some(_)) => {
                tracing::debug!(cache.key = %key, cache.tier = VOLATILE, "cache.expired");
                or_log(self.inner.volatile.remove(key).await, "remove", VOLATILE, key.full_key());
            }
            Ok(None) => {}
            Err(e) => log_failure("get", VOLATILE, key.full_key(), &e),
        }

        let entry = match self.inner.durable.get(key).await {
            Ok(Some(entry)) => entry,
            Ok(None) => {
                tracing::debug!(cache.key = %key, "cache.miss");
                return None;
            }
            Err(e) => {
                log_failure("get", DURABLE, key.full_key(), &e);
                return None;
            }
        };

        if !entry.is_valid_at(now) {
            tracing::debug!(cache.key = %key, cache.tier = DURABLE, "cache.expired");
            or_log(self.inner.durable.remove(key).await, "remove", DURABLE, key.full_key());
            return None;
        }

        tracing::debug!(cache.key = %key, cache.tier = DURABLE, "cache.hit");
        if entry.size() < self.inner.promotion_threshold {
            or_log(self.inner.volatile.insert(key, entry.clone()).await, "promote", VOLATILE, key.full_key());
        }
        Some(entry)
    }
}

impl<D> Clone for HybridCache<D> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<D> Debug for HybridCache<D> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("HybridCache")
            .field("default_ttl", &self.inner.default_ttl)
            .field("promotion_threshold", &self.inner.promotion_threshold)
            .field("volatile_budget", &self.inner.volatile.budget())
            .field("sweep_interval", &self.inner.sweep_interval)
            .finish_non_exhaustive()
    }
}

fn decode<T: DeserializeOwned>(key: &CacheKey, entry: CacheEntry) -> Option<T> {
    match serde_json::from_value(entry.into_data()) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(cache.key = %key, error = %e, "cache.decode_failed");
            None
        }
    }
}

fn log_failure(op: &'static str, tier: &'static str, subject: &str, error: &Error) {
    tracing::warn!(cache.op = op, cache.tier = tier, cache.key = subject, error = %error, "cache.tier_failed");
}

/// Unwraps a tier result, logging a failure and substituting the default.
fn or_log<T: Default>(result: Result<T, Error>, op: &'static str, tier: &'static str, subject: &str) -> T {
    result.unwrap_or_else(|e| {
        log_failure(op, tier, subject, &e);
        T::default()
    })
}

#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn oversized_value_is_disk_only() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cache = HybridCache::builder(dir.path()).promotion_threshold(8).build();

        cache.set("big", &json!("a string longer than eight bytes"), None).await;
        cache.set("small", &json!(1), None).await;

        assert!(cache.volatile().get(&CacheKey::new("big")).await.expect("infallible").is_none());
        assert!(cache.volatile().get(&CacheKey::new("small")).await.expect("infallible").is_some());
        assert_eq!(cache.get::<String>("big").await.as_deref(), Some("a string longer than eight bytes"));
        assert!(
            cache.volatile().get(&CacheKey::new("big")).await.expect("infallible").is_none(),
            "large disk hits are not promoted"
        );
    }

    #[tokio::test]
    async fn growing_past_threshold_drops_memory_copy() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cache = HybridCache::builder(dir.path()).promotion_threshold(8).build();

        cache.set("k", &json!(1), None).await;
        cache.set("k", &json!("now far larger than the threshold"), None).await;

        assert!(cache.volatile().is_empty());
        assert_eq!(cache.get::<String>("k").await.as_deref(), Some("now far larger than the threshold"));
    }

    #[tokio::test]
    async fn type_mismatch_is_a_miss() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cache = HybridCache::builder(dir.path()).build();

        cache.set("k", &json!({"a": 1}), None).await;

        assert_eq!(cache.get::<u32>("k").await, None);
        assert!(cache.get::<serde_json::Value>("k").await.is_some(), "entry is kept");
    }

    #[tokio::test]
    async fn cancelled_wraps_release_their_gate() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cache = HybridCache::builder(dir.path()).build();
        let stalled = || cache.wrap("slow", None, || std::future::pending::<Result<u32, std::io::Error>>());

        let (leader, waiter) = tokio::join!(
            tokio::time::timeout(Duration::from_millis(50), stalled()),
            tokio::time::timeout(Duration::from_millis(50), stalled()),
        );

        assert!(leader.is_err() && waiter.is_err());
        assert_eq!(cache.inner.flights.len(), 0);
        assert_eq!(cache.wrap("slow", None, || async { Ok::<_, std::io::Error>(7_u32) }).await.ok(), Some(7));
    }

    #[test]
    fn debug_omits_tiers() {
        let cache = HybridCache::builder("unused").volatile_budget(10).build();
        let rendered = format!("{cache:?}");
        assert!(rendered.contains("volatile_budget: 10"), "{rendered}");
    }
}
