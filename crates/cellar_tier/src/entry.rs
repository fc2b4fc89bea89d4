// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};

use crate::clock::{epoch_millis, from_epoch_millis};
use crate::digest::digest_json;
use crate::CacheKey;

/// A cached value with the metadata needed for expiry and change detection.
///
/// The serialized form is the durable on-disk format:
///
/// ```json
/// {"key":"stripe:mrr","data":{"total":12},"timestamp":1718000000000,"ttl":3600000,"hash":"9f…"}
/// ```
///
/// `timestamp` and `ttl` are milliseconds; `hash` is the hex SHA-256 of the serialized `data`.
/// There is no version field.
///
/// # Examples
///
/// ```
/// use std::time::{Duration, SystemTime};
///
/// use cellar_tier::{CacheEntry, CacheKey};
///
/// let entry = CacheEntry::new(&CacheKey::new("k"), serde_json::json!([1, 2, 3]), SystemTime::now(), Duration::from_secs(5));
/// assert_eq!(entry.size(), "[1,2,3]".len());
/// assert_eq!(entry.key(), "k");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    #[serde(default)]
    key: String,
    data: serde_json::Value,
    #[serde(rename = "timestamp")]
    created_at_ms: u64,
    #[serde(rename = "ttl")]
    ttl_ms: u64,
    hash: String,
    #[serde(skip)]
    size: usize,
}

impl CacheEntry {
    /// Creates an entry for `key`, hashing and measuring `data`.
    #[must_use]
    pub fn new(key: &CacheKey, data: serde_json::Value, created_at: SystemTime, ttl: Duration) -> Self {
        let (hash, size) = digest_json(&data);
        Self {
            key: key.full_key().to_owned(),
            data,
            created_at_ms: epoch_millis(created_at),
            ttl_ms: u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX),
            hash,
            size,
        }
    }

    /// Decodes an entry from its durable JSON form.
    ///
    /// The stored hash is kept as-is; the serialized size is recomputed from `data`.
    ///
    /// # Errors
    ///
    /// Returns the decoding error when `bytes` is not a valid entry.
    pub fn from_json_slice(bytes: &[u8]) -> serde_json::Result<Self> {
        let mut entry: Self = serde_json::from_slice(bytes)?;
        entry.size = digest_json(&entry.data).1;
        Ok(entry)
    }

    /// Encodes the entry into its durable JSON form.
    ///
    /// # Errors
    ///
    /// Returns the encoding error, which cannot occur for values built from `serde_json::Value`.
    pub fn to_json_vec(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    /// Returns the full key the entry was stored under.
    ///
    /// Entries written without a key decode with an empty string.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Returns the cached value.
    #[must_use]
    pub fn data(&self) -> &serde_json::Value {
        &self.data
    }

    /// Consumes the entry and returns the cached value.
    #[must_use]
    pub fn into_data(self) -> serde_json::Value {
        self.data
    }

    /// Returns when the entry was created.
    #[must_use]
    pub fn created_at(&self) -> SystemTime {
        from_epoch_millis(self.created_at_ms)
    }

    /// Returns the entry's time-to-live.
    #[must_use]
    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms)
    }

    /// Returns the hex SHA-256 digest of the serialized value.
    #[must_use]
    pub fn hash(&self) -> &str {
        &self.hash
    }

    /// Returns the byte length of the serialized value.
    #[must_use]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Returns how old the entry is at `now`. Entries stamped in the future have age zero.
    #[must_use]
    pub fn age_at(&self, now: SystemTime) -> Duration {
        Duration::from_millis(epoch_millis(now).saturating_sub(self.created_at_ms))
    }

    /// Returns `true` while `now - created_at < ttl`.
    #[must_use]
    pub fn is_valid_at(&self, now: SystemTime) -> bool {
        epoch_millis(now).saturating_sub(self.created_at_ms) < self.ttl_ms
    }
}
