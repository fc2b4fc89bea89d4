// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Log output for binaries and demos.
//!
//! Library code only emits `tracing` events; nothing in this workspace installs a subscriber on
//! its own. Call [`init`] or [`init_with`] once at startup to see them.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use crate::{LogFormat, LoggingConfig, RelayError};

/// Installs a pretty-printing subscriber filtered by `filter`, unless `RUST_LOG` is set.
///
/// # Errors
///
/// Returns [`RelayError::LogFilter`] for an invalid directive and
/// [`RelayError::LoggingInstalled`] when a global subscriber already exists.
pub fn init(filter: &str) -> Result<(), RelayError> {
    init_with(&LoggingConfig {
        filter: filter.to_owned(),
        format: LogFormat::Pretty,
    })
}

/// Installs a subscriber configured by the `[logging]` section.
///
/// # Errors
///
/// Returns [`RelayError::LogFilter`] for an invalid directive and
/// [`RelayError::LoggingInstalled`] when a global subscriber already exists.
pub fn init_with(config: &LoggingConfig) -> Result<(), RelayError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => parse_filter(&config.filter)?,
    };

    let registry = tracing_subscriber::registry().with(filter);
    match config.format {
        LogFormat::Pretty => registry.with(fmt::layer()).try_init()?,
        LogFormat::Compact => registry.with(fmt::layer().compact()).try_init()?,
        LogFormat::Json => registry.with(fmt::layer().json()).try_init()?,
    }
    Ok(())
}

fn parse_filter(directives: &str) -> Result<EnvFilter, RelayError> {
    EnvFilter::try_new(directives).map_err(|source| RelayError::LogFilter {
        filter: directives.to_owned(),
        source,
    })
}
