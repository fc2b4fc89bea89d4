// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt::{self, Display, Formatter};

use regex::Regex;

use crate::Error;

/// Matches full cache keys for bulk invalidation.
///
/// # Examples
///
/// ```
/// use cellar_tier::KeyPattern;
///
/// let literal = KeyPattern::from("stripe:");
/// assert!(literal.matches("stripe:charges"));
///
/// let structured = KeyPattern::regex(r"^hubspot:deals:\d{4}$")?;
/// assert!(structured.matches("hubspot:deals:2024"));
/// assert!(!structured.matches("hubspot:deals:latest"));
/// # Ok::<(), cellar_tier::Error>(())
/// ```
#[derive(Debug, Clone)]
pub enum KeyPattern {
    /// Matches keys containing the literal substring.
    Substring(String),
    /// Matches keys the regular expression finds a match in.
    Regex(Regex),
}

impl KeyPattern {
    /// Compiles a structured pattern.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPattern`] when the expression does not compile.
    pub fn regex(expression: &str) -> Result<Self, Error> {
        Ok(Self::Regex(Regex::new(expression)?))
    }

    /// Returns `true` when `full_key` matches this pattern.
    #[must_use]
    pub fn matches(&self, full_key: &str) -> bool {
        match self {
            Self::Substring(needle) => full_key.contains(needle.as_str()),
            Self::Regex(regex) => regex.is_match(full_key),
        }
    }
}

impl Display for KeyPattern {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Substring(needle) => f.write_str(needle),
            Self::Regex(regex) => write!(f, "/{}/", regex.as_str()),
        }
    }
}

impl From<&str> for KeyPattern {
    fn from(literal: &str) -> Self {
        Self::Substring(literal.to_owned())
    }
}

impl From<String> for KeyPattern {
    fn from(literal: String) -> Self {
        Self::Substring(literal)
    }
}

impl From<Regex> for KeyPattern {
    fn from(regex: Regex) -> Self {
        Self::Regex(regex)
    }
}
