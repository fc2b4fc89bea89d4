// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Volatile tier for the cellar cache.
//!
//! [`VolatileTier`] keeps entries in process memory under a fixed byte budget, where an
//! entry's size is the length of its serialized value. When an insert would exceed the budget,
//! the **oldest inserted** entries are evicted until the new one fits.
//!
//! # FIFO, not LRU
//!
//! Eviction order is insertion order. Reading an entry does not refresh its position, so a hot
//! entry inserted early is evicted before a cold entry inserted later. Re-inserting a key moves
//! it to the back of the queue.
//!
//! ```
//! use std::time::{Duration, SystemTime};
//!
//! use cellar_memory::VolatileTier;
//! use cellar_tier::{CacheEntry, CacheKey, CacheTier};
//!
//! # futures::executor::block_on(async {
//! let tier = VolatileTier::with_budget(8);
//! let now = SystemTime::now();
//! let ttl = Duration::from_secs(60);
//!
//! for name in ["a", "b", "c"] {
//!     let key = CacheKey::new(name);
//!     tier.insert(&key, CacheEntry::new(&key, serde_json::json!("xx"), now, ttl)).await?;
//! }
//!
//! // Each value serializes to 4 bytes, so only the two newest fit.
//! assert!(tier.get(&CacheKey::new("a")).await?.is_none());
//! assert!(tier.get(&CacheKey::new("c")).await?.is_some());
//! # Ok::<(), cellar_tier::Error>(())
//! # });
//! ```

mod tier;

#[doc(inline)]
pub use tier::VolatileTier;
