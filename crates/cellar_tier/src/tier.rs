// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The core trait for cache storage tiers.

use std::time::SystemTime;

use crate::{CacheEntry, CacheKey, Error, KeyPattern};

/// Resident size of a tier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TierUsage {
    /// Number of stored entries.
    pub entries: u64,
    /// Bytes attributed to stored entries.
    pub bytes: u64,
}

/// Trait for cache tier implementations.
///
/// Tiers store and return entries verbatim: they do not judge validity on `get`. The cache
/// layer above them checks TTLs, removes invalid entries, and decides which tier receives a
/// write. `purge_expired` is the only operation in which a tier inspects validity itself.
pub trait CacheTier: Send + Sync {
    /// Returns the stored entry, if any.
    fn get(&self, key: &CacheKey) -> impl Future<Output = Result<Option<CacheEntry>, Error>> + Send;

    /// Stores `entry`, replacing any previous entry for the key.
    fn insert(&self, key: &CacheKey, entry: CacheEntry) -> impl Future<Output = Result<(), Error>> + Send;

    /// Removes the entry for the key. Returns whether an entry was removed.
    fn remove(&self, key: &CacheKey) -> impl Future<Output = Result<bool, Error>> + Send;

    /// Removes every entry.
    fn clear(&self) -> impl Future<Output = Result<(), Error>> + Send;

    /// Removes every entry belonging to `namespace`, returning how many were removed when known.
    fn clear_namespace(&self, namespace: &str) -> impl Future<Output = Result<usize, Error>> + Send;

    /// Removes every entry whose full key matches `pattern`, returning how many were removed.
    fn remove_matching(&self, pattern: &KeyPattern) -> impl Future<Output = Result<usize, Error>> + Send;

    /// Removes every entry that is no longer valid at `now`, returning how many were removed.
    fn purge_expired(&self, now: SystemTime) -> impl Future<Output = Result<usize, Error>> + Send;

    /// Reports how many entries and bytes the tier currently holds.
    fn usage(&self) -> impl Future<Output = Result<TierUsage, Error>> + Send;
}
