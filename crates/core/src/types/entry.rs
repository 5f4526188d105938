//! Collection entries: cart lines and favorites.
//!
//! Both entry kinds implement [`Entry`], which is the seam that lets one
//! reducer serve both collections. Persisted, an entry is a flat JSON object:
//! `{ "canonicalId": ..., "quantity": n, ...snapshot fields }` (favorites
//! have no `quantity`).

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

use super::id::CanonicalId;
use super::snapshot::ProductSnapshot;

/// Which collection an entry belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionKind {
    Cart,
    Favorites,
}

impl CollectionKind {
    /// Suffix used to namespace the storage key for this kind.
    #[must_use]
    pub const fn storage_suffix(&self) -> &'static str {
        match self {
            Self::Cart => "cart",
            Self::Favorites => "favorites",
        }
    }
}

impl std::fmt::Display for CollectionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.storage_suffix())
    }
}

/// Behaviour shared by every entry kind a collection can hold.
pub trait Entry: Clone + PartialEq + Serialize + DeserializeOwned {
    /// The collection kind this entry lives in.
    const KIND: CollectionKind;

    /// Create a fresh entry for a product not yet in the collection.
    fn from_snapshot(canonical_id: CanonicalId, snapshot: ProductSnapshot) -> Self;

    /// The entry's uniqueness key.
    fn canonical_id(&self) -> &CanonicalId;

    /// The product attributes captured for this entry.
    fn snapshot(&self) -> &ProductSnapshot;

    /// Fold a repeated ADD of the same product into this entry.
    ///
    /// Returns `true` if the entry changed.
    fn absorb(&mut self, snapshot: ProductSnapshot) -> bool;

    /// Apply a quantity edit. Returns `true` if the entry changed.
    ///
    /// Entries without a quantity ignore the edit.
    fn set_quantity(&mut self, _quantity: i64) -> bool {
        false
    }

    /// Units this entry contributes to the collection count.
    fn quantity(&self) -> u32 {
        1
    }
}

/// One product line in the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    canonical_id: CanonicalId,
    #[serde(default = "one", deserialize_with = "deserialize_quantity")]
    quantity: u32,
    #[serde(flatten)]
    snapshot: ProductSnapshot,
}

impl CartLine {
    /// Smallest quantity a line can hold.
    pub const MIN_QUANTITY: u32 = 1;

    /// Create a cart line with an explicit quantity, clamped to at least 1.
    #[must_use]
    pub fn new(canonical_id: CanonicalId, quantity: u32, snapshot: ProductSnapshot) -> Self {
        Self {
            canonical_id,
            quantity: quantity.max(Self::MIN_QUANTITY),
            snapshot,
        }
    }
}

impl Entry for CartLine {
    const KIND: CollectionKind = CollectionKind::Cart;

    fn from_snapshot(canonical_id: CanonicalId, snapshot: ProductSnapshot) -> Self {
        Self::new(canonical_id, Self::MIN_QUANTITY, snapshot)
    }

    fn canonical_id(&self) -> &CanonicalId {
        &self.canonical_id
    }

    fn snapshot(&self) -> &ProductSnapshot {
        &self.snapshot
    }

    // Identity stays with the first insertion; attributes follow the latest ADD.
    fn absorb(&mut self, snapshot: ProductSnapshot) -> bool {
        let quantity = self.quantity.saturating_add(1);
        if quantity == self.quantity && snapshot == self.snapshot {
            return false;
        }
        self.quantity = quantity;
        self.snapshot = snapshot;
        true
    }

    fn set_quantity(&mut self, quantity: i64) -> bool {
        let clamped = clamp_quantity(quantity);
        if clamped == self.quantity {
            return false;
        }
        self.quantity = clamped;
        true
    }

    fn quantity(&self) -> u32 {
        self.quantity
    }
}

/// One product in the favorites list. Membership is binary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteEntry {
    canonical_id: CanonicalId,
    #[serde(flatten)]
    snapshot: ProductSnapshot,
}

impl Entry for FavoriteEntry {
    const KIND: CollectionKind = CollectionKind::Favorites;

    fn from_snapshot(canonical_id: CanonicalId, snapshot: ProductSnapshot) -> Self {
        Self {
            canonical_id,
            snapshot,
        }
    }

    fn canonical_id(&self) -> &CanonicalId {
        &self.canonical_id
    }

    fn snapshot(&self) -> &ProductSnapshot {
        &self.snapshot
    }

    fn absorb(&mut self, _snapshot: ProductSnapshot) -> bool {
        false
    }
}

/// Clamp a requested quantity into `1..=u32::MAX`.
#[must_use]
pub fn clamp_quantity(quantity: i64) -> u32 {
    u32::try_from(quantity.max(i64::from(CartLine::MIN_QUANTITY))).unwrap_or(u32::MAX)
}

const fn one() -> u32 {
    CartLine::MIN_QUANTITY
}

fn deserialize_quantity<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    let raw = i64::deserialize(deserializer)?;
    Ok(clamp_quantity(raw))
}
