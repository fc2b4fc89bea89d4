// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt::{self, Display, Formatter};

use crate::digest::sha256_hex;

/// Separator between a namespace and a key inside a full key.
const NAMESPACE_SEPARATOR: char = ':';

/// Logical identifier of a cache entry.
///
/// A key optionally belongs to a namespace. Two keys are equal iff both their namespace and
/// key strings are equal; the full key (`namespace:key`, or just `key`) is what patterns and
/// storage digests are computed over.
///
/// # Examples
///
/// ```
/// use cellar_tier::CacheKey;
///
/// let plain = CacheKey::from("metrics:q2");
/// let scoped = CacheKey::namespaced("metrics", "q2");
///
/// assert_eq!(plain.full_key(), scoped.full_key());
/// assert_ne!(plain, scoped);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    namespace: Option<String>,
    key: String,
    full: String,
}

impl CacheKey {
    /// Creates a key without a namespace.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            namespace: None,
            full: key.clone(),
            key,
        }
    }

    /// Creates a key scoped to `namespace`.
    #[must_use]
    pub fn namespaced(namespace: impl Into<String>, key: impl Into<String>) -> Self {
        let namespace = namespace.into();
        let key = key.into();
        Self {
            full: format!("{namespace}{NAMESPACE_SEPARATOR}{key}"),
            namespace: Some(namespace),
            key,
        }
    }

    /// Returns the namespace, if any.
    #[must_use]
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// Returns the key without its namespace.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Returns `namespace:key` for namespaced keys and `key` otherwise.
    #[must_use]
    pub fn full_key(&self) -> &str {
        &self.full
    }

    /// Returns the hex SHA-256 digest of the full key.
    ///
    /// Durable storage locations are derived from this digest.
    #[must_use]
    pub fn digest(&self) -> String {
        sha256_hex(self.full.as_bytes())
    }

    /// Returns the prefix shared by every full key in `namespace`.
    #[must_use]
    pub fn namespace_prefix(namespace: &str) -> String {
        format!("{namespace}{NAMESPACE_SEPARATOR}")
    }
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full)
    }
}

impl From<&str> for CacheKey {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

impl From<String> for CacheKey {
    fn from(key: String) -> Self {
        Self::new(key)
    }
}

impl From<(&str, &str)> for CacheKey {
    fn from((namespace, key): (&str, &str)) -> Self {
        Self::namespaced(namespace, key)
    }
}

impl From<&Self> for CacheKey {
    fn from(key: &Self) -> Self {
        key.clone()
    }
}
