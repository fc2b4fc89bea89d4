// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use cellar::HybridCache;
use rebound::RetryPolicy;
use serde::{Deserialize, Serialize};
use turnstile::RatePolicy;

use crate::RelayError;

/// Directory used when the configuration does not name one.
const DEFAULT_CACHE_ROOT: &str = ".cache/relay";

/// Complete configuration of a [`Relay`](crate::Relay).
///
/// Every section is optional; missing values take their defaults. Services listed under
/// `[services.<name>]` override or extend the limiter's built-in provider policies.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RelayConfig {
    /// Cache location and sizing.
    pub cache: CacheConfig,
    /// Default retry policy.
    pub retry: RetryPolicy,
    /// Per-service rate policies.
    pub services: BTreeMap<String, RatePolicy>,
    /// Log output used by binaries and demos.
    pub logging: LoggingConfig,
}

impl RelayConfig {
    /// Parses a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::ParseConfig`] when the document is not a valid configuration.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::time::Duration;
    ///
    /// use relay::RelayConfig;
    ///
    /// let config = RelayConfig::from_toml_str(
    ///     r#"
    ///     [cache]
    ///     default_ttl_ms = 60000
    ///
    ///     [services.ledger]
    ///     max_requests = 10
    ///     window_ms = 1000
    ///     "#,
    /// )?;
    /// assert_eq!(config.cache.default_ttl(), Duration::from_secs(60));
    /// assert_eq!(config.services["ledger"].max_requests, 10);
    /// # Ok::<(), relay::RelayError>(())
    /// ```
    pub fn from_toml_str(document: &str) -> Result<Self, RelayError> {
        Ok(toml::from_str(document)?)
    }

    /// Reads and parses a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::ReadConfig`] when the file cannot be read and
    /// [`RelayError::ParseConfig`] when it is not a valid configuration.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RelayError> {
        let path = path.as_ref();
        let document = std::fs::read_to_string(path).map_err(|source| RelayError::ReadConfig {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&document)
    }
}

/// The `[cache]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheConfig {
    /// Root directory of the durable tier.
    pub root: PathBuf,
    /// TTL for entries stored without one.
    pub default_ttl_ms: u64,
    /// Byte budget of the in-memory tier.
    pub volatile_budget_bytes: usize,
    /// Values at least this large stay on disk only.
    pub promotion_threshold_bytes: usize,
    /// Period of the background sweep.
    pub sweep_interval_ms: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from(DEFAULT_CACHE_ROOT),
            default_ttl_ms: 60 * 60 * 1000,
            volatile_budget_bytes: 100 * 1024 * 1024,
            promotion_threshold_bytes: 1024 * 1024,
            sweep_interval_ms: 5 * 60 * 1000,
        }
    }
}

impl CacheConfig {
    /// Returns the default TTL.
    #[must_use]
    pub fn default_ttl(&self) -> Duration {
        Duration::from_millis(self.default_ttl_ms)
    }

    /// Returns the sweep period.
    #[must_use]
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms)
    }

    /// Builds a cache with these settings.
    #[must_use]
    pub fn build(&self) -> HybridCache {
        HybridCache::builder(self.root.clone())
            .default_ttl(self.default_ttl())
            .volatile_budget(self.volatile_budget_bytes)
            .promotion_threshold(self.promotion_threshold_bytes)
            .sweep_interval(self.sweep_interval())
            .build()
    }
}

/// Output format of [`logging::init`](crate::logging::init).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Multi-line human-readable output.
    #[default]
    Pretty,
    /// Single-line human-readable output.
    Compact,
    /// One JSON object per event.
    Json,
}

/// The `[logging]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// Filter directives, e.g. `info,cellar=debug`. `RUST_LOG` takes precedence when set.
    pub filter: String,
    /// Output format.
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_owned(),
            format: LogFormat::default(),
        }
    }
}
