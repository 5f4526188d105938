//! Core types for Shopstate.
//!
//! This module provides the data model shared by the reducer and the engine:
//! canonical ids, product snapshots, prices, entries and collections.

pub mod collection;
pub mod entry;
pub mod id;
pub mod price;
pub mod snapshot;

pub use collection::{BlobError, Collection};
pub use entry::{CartLine, CollectionKind, Entry, FavoriteEntry, clamp_quantity};
pub use id::{CanonicalId, CanonicalIdError};
pub use price::{CurrencyCode, Price, parse_amount};
pub use snapshot::{ProductSnapshot, RESERVED_KEYS};
