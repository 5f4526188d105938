//! Ordered, duplicate-free collections of entries.

use std::collections::HashSet;

use serde::{Deserialize, Deserializer, Serialize};

use super::entry::Entry;
use super::id::CanonicalId;

/// Errors that can occur when decoding a persisted collection blob.
#[derive(thiserror::Error, Debug)]
pub enum BlobError {
    /// The blob is not a JSON array of well-formed entries.
    #[error("malformed collection blob: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// An ordered sequence of entries, at most one per canonical id.
///
/// Insertion order is preserved. A collection is never mutated in place by
/// the engine: every transition produces a complete replacement value (see
/// [`crate::reducer::reduce`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Collection<E> {
    entries: Vec<E>,
}

impl<E> Default for Collection<E> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<E: Entry> Collection<E> {
    /// An empty collection.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a collection from entries, dropping later duplicates.
    #[must_use]
    pub fn from_entries(entries: impl IntoIterator<Item = E>) -> Self {
        let mut seen = HashSet::new();
        let entries = entries
            .into_iter()
            .filter(|entry| seen.insert(entry.canonical_id().clone()))
            .collect();
        Self { entries }
    }

    /// Entries in insertion order.
    #[must_use]
    pub fn entries(&self) -> &[E] {
        &self.entries
    }

    /// Iterate entries in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, E> {
        self.entries.iter()
    }

    /// Number of entries (not units).
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Index of the entry with this id.
    #[must_use]
    pub fn position(&self, id: &CanonicalId) -> Option<usize> {
        self.entries.iter().position(|e| e.canonical_id() == id)
    }

    /// The entry with this id.
    #[must_use]
    pub fn get(&self, id: &CanonicalId) -> Option<&E> {
        self.entries.iter().find(|e| e.canonical_id() == id)
    }

    #[must_use]
    pub fn contains(&self, id: &CanonicalId) -> bool {
        self.get(id).is_some()
    }

    /// Serialize to the persisted text form: a JSON array of entries.
    ///
    /// # Errors
    ///
    /// Returns an error only if an entry fails to serialize, which cannot
    /// happen for the built-in entry kinds.
    pub fn to_blob(&self) -> Result<String, BlobError> {
        Ok(serde_json::to_string(&self.entries)?)
    }

    /// Decode the persisted text form.
    ///
    /// Blobs that parse but carry duplicate ids are repaired by keeping the
    /// first occurrence.
    ///
    /// # Errors
    ///
    /// Returns [`BlobError::Malformed`] if the text is not a JSON array of
    /// entries.
    pub fn from_blob(blob: &str) -> Result<Self, BlobError> {
        Ok(serde_json::from_str(blob)?)
    }

    pub(crate) fn into_entries(self) -> Vec<E> {
        self.entries
    }

    pub(crate) const fn from_vec_unchecked(entries: Vec<E>) -> Self {
        Self { entries }
    }
}

impl<'de, E: Entry> Deserialize<'de> for Collection<E> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Vec::<E>::deserialize(deserializer).map(Self::from_entries)
    }
}

impl<'a, E: Entry> IntoIterator for &'a Collection<E> {
    type Item = &'a E;
    type IntoIter = std::slice::Iter<'a, E>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::types::entry::{CartLine, FavoriteEntry};

    #[test]
    fn test_empty_round_trip() {
        let empty = Collection::<CartLine>::empty();
        let blob = empty.to_blob().unwrap();
        assert_eq!(blob, "[]");
        assert_eq!(Collection::<CartLine>::from_blob(&blob).unwrap(), empty);
    }

    #[test]
    fn test_round_trip_preserves_order() {
        let blob = json!([
            {"canonicalId": "B", "quantity": 1, "price": 50},
            {"canonicalId": "A", "quantity": 2, "price": 100}
        ])
        .to_string();
        let cart = Collection::<CartLine>::from_blob(&blob).unwrap();
        let ids: Vec<_> = cart.iter().map(|l| l.canonical_id().as_str()).collect();
        assert_eq!(ids, ["B", "A"]);

        let again = Collection::<CartLine>::from_blob(&cart.to_blob().unwrap()).unwrap();
        assert_eq!(again, cart);
    }

    #[test]
    fn test_from_blob_drops_duplicates() {
        let blob = json!([
            {"canonicalId": "X", "name": "first"},
            {"canonicalId": "X", "name": "second"}
        ])
        .to_string();
        let favorites = Collection::<FavoriteEntry>::from_blob(&blob).unwrap();
        assert_eq!(favorites.len(), 1);
        assert_eq!(favorites.entries()[0].snapshot().name(), Some("first"));
    }

    #[test]
    fn test_from_blob_malformed() {
        assert!(Collection::<CartLine>::from_blob("{not json").is_err());
        assert!(Collection::<CartLine>::from_blob("{\"canonicalId\":\"A\"}").is_err());
        assert!(Collection::<CartLine>::from_blob("[{\"canonicalId\":\"\"}]").is_err());
    }
}
