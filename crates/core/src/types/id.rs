//! Canonical product identifiers.
//!
//! Every entry in a collection is keyed by a [`CanonicalId`]. The id is the
//! output of [`crate::identity::normalize`] and is never empty.

use core::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Errors that can occur when parsing a [`CanonicalId`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CanonicalIdError {
    /// The input is empty or only whitespace.
    #[error("canonical id cannot be empty")]
    Empty,
}

/// The single normalized identifier of a product within a collection.
///
/// Two entries in one collection never share a `CanonicalId`.
///
/// ## Examples
///
/// ```
/// use shopstate_core::CanonicalId;
///
/// let id = CanonicalId::parse(" sku-42 ").unwrap();
/// assert_eq!(id.as_str(), "sku-42");
///
/// assert!(CanonicalId::parse("   ").is_err());
/// ```
#[derive(Debug, Clone, Serialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct CanonicalId(String);

impl CanonicalId {
    /// Parse a `CanonicalId`, trimming surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns [`CanonicalIdError::Empty`] if nothing remains after trimming.
    pub fn parse(s: &str) -> Result<Self, CanonicalIdError> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(CanonicalIdError::Empty);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the id and returns its inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for CanonicalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for CanonicalId {
    type Err = CanonicalIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for CanonicalId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// Persisted blobs are validated on the way in, same as user input.
impl<'de> Deserialize<'de> for CanonicalId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_trims() {
        let id = CanonicalId::parse("  abc  ").unwrap();
        assert_eq!(id.as_str(), "abc");
    }

    #[test]
    fn test_parse_empty() {
        assert_eq!(CanonicalId::parse(""), Err(CanonicalIdError::Empty));
        assert_eq!(CanonicalId::parse(" \t\n"), Err(CanonicalIdError::Empty));
    }

    #[test]
    fn test_display() {
        let id = CanonicalId::parse("A").unwrap();
        assert_eq!(format!("{id}"), "A");
    }

    #[test]
    fn test_serde_transparent() {
        let id = CanonicalId::parse("A").unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"A\"");
        let parsed: CanonicalId = serde_json::from_str("\"A\"").unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn test_deserialize_rejects_empty() {
        assert!(serde_json::from_str::<CanonicalId>("\"\"").is_err());
    }
}
