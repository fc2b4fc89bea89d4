// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Core tier abstractions for the cellar two-tier cache.
//!
//! This crate defines the [`CacheTier`] trait that both the volatile (in-process) and the
//! durable (on-disk) tiers implement, along with the values those tiers exchange:
//!
//! - [`CacheKey`]: a key with an optional namespace. The *full key* is `namespace:key`.
//! - [`CacheEntry`]: an opaque JSON value stamped with its creation time, TTL and content hash.
//! - [`KeyPattern`]: literal-substring or regex matching over full keys, used for bulk invalidation.
//! - [`Clock`]: the wall clock used for TTL decisions, driven by tokio's time source.
//!
//! # Validity
//!
//! An entry is valid while `now - created_at < ttl`. Tiers never hand out invalid entries as
//! hits; the cache layer removes them when it observes them.
//!
//! ```
//! use std::time::{Duration, SystemTime};
//!
//! use cellar_tier::{CacheEntry, CacheKey};
//!
//! let key = CacheKey::namespaced("stripe", "invoices:2024-06");
//! assert_eq!(key.full_key(), "stripe:invoices:2024-06");
//!
//! let created = SystemTime::UNIX_EPOCH + Duration::from_secs(1_000);
//! let entry = CacheEntry::new(&key, serde_json::json!({"total": 12}), created, Duration::from_secs(60));
//! assert!(entry.is_valid_at(created + Duration::from_secs(59)));
//! assert!(!entry.is_valid_at(created + Duration::from_secs(60)));
//! ```

mod clock;
mod digest;
mod entry;
pub mod error;
mod key;
mod pattern;
mod tier;

#[doc(inline)]
pub use clock::{Clock, epoch_millis};
#[doc(inline)]
pub use digest::{digest_json, sha256_hex};
#[doc(inline)]
pub use entry::CacheEntry;
#[doc(inline)]
pub use error::{Error, Result};
#[doc(inline)]
pub use key::CacheKey;
#[doc(inline)]
pub use pattern::KeyPattern;
#[doc(inline)]
pub use tier::{CacheTier, TierUsage};
