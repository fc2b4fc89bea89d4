// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::path::PathBuf;

/// Failures while setting up a [`Relay`](crate::Relay).
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum RelayError {
    /// The configuration file could not be read.
    #[error("failed to read configuration from {}", path.display())]
    ReadConfig {
        /// The configuration file.
        path: PathBuf,
        /// The underlying failure.
        #[source]
        source: std::io::Error,
    },

    /// The configuration is not valid TOML for [`RelayConfig`](crate::RelayConfig).
    #[error("invalid configuration")]
    ParseConfig(#[from] toml::de::Error),

    /// The log filter directive did not parse.
    #[error("invalid log filter '{filter}'")]
    LogFilter {
        /// The rejected directive.
        filter: String,
        /// The parse failure.
        #[source]
        source: tracing_subscriber::filter::ParseError,
    },

    /// A global subscriber was already installed.
    #[error("logging is already initialized")]
    LoggingInstalled(#[from] tracing_subscriber::util::TryInitError),
}
