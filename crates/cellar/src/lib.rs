// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Two-tier cache with TTLs, namespaces, memoization and a background sweeper.
//!
//! [`HybridCache`] layers a byte-budgeted in-memory tier over a durable JSON-file tier:
//!
//! - **Reads** check memory first, then disk. A valid disk hit smaller than the promotion
//!   threshold is copied into memory ("promotion").
//! - **Writes** always go to disk, and to memory when the value is below the threshold.
//! - **Expired entries** are never returned; they are deleted when observed and by the
//!   periodic sweep started with [`HybridCache::spawn_sweeper`].
//! - **Failures** never reach the caller. Caching is best effort: I/O and decoding problems
//!   are logged and behave like a miss or a skipped write.
//!
//! The memory tier evicts in insertion order (FIFO). It is not an LRU.
//!
//! # Examples
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use cellar::HybridCache;
//!
//! # async fn example() -> Result<(), std::io::Error> {
//! let cache = HybridCache::builder("/var/cache/relay")
//!     .default_ttl(Duration::from_secs(15 * 60))
//!     .build();
//! let sweeper = cache.spawn_sweeper();
//!
//! let revenue: u64 = cache
//!     .wrap(("stripe", "mrr"), None, || async { Ok::<_, std::io::Error>(12_400) })
//!     .await?;
//! assert_eq!(cache.get::<u64>(("stripe", "mrr")).await, Some(revenue));
//!
//! sweeper.shutdown().await;
//! # Ok(())
//! # }
//! ```

mod builder;
mod cache;
mod flight;
mod stats;
mod sweeper;

#[doc(inline)]
pub use builder::CacheBuilder;
#[doc(inline)]
pub use cache::HybridCache;
#[doc(inline)]
pub use cellar_disk::DurableTier;
#[doc(inline)]
pub use cellar_memory::VolatileTier;
#[doc(inline)]
pub use cellar_tier::{CacheEntry, CacheKey, CacheTier, Clock, Error, KeyPattern, TierUsage};
#[doc(inline)]
pub use stats::CacheStats;
#[doc(inline)]
pub use sweeper::SweepHandle;
