//! Product snapshots.

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use super::price::{CurrencyCode, parse_amount};

/// Keys owned by the entry itself in the persisted layout.
pub const RESERVED_KEYS: &[&str] = &["canonicalId", "quantity"];

/// A copy of product attributes taken when an item enters a collection.
///
/// Snapshots are not kept in sync with the catalog. Reserved entry keys
/// (see [`RESERVED_KEYS`]) are stripped so they cannot shadow entry fields
/// when the snapshot is flattened into a persisted entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ProductSnapshot(Map<String, Value>);

impl ProductSnapshot {
    /// Build a snapshot from a product record.
    ///
    /// Returns `None` if the record is not a JSON object.
    #[must_use]
    pub fn from_record(record: &Value) -> Option<Self> {
        record.as_object().map(|fields| Self::from_fields(fields.clone()))
    }

    /// Build a snapshot from an owned field map.
    #[must_use]
    pub fn from_fields(mut fields: Map<String, Value>) -> Self {
        for key in RESERVED_KEYS {
            fields.remove(*key);
        }
        Self(fields)
    }

    /// Look up a snapshot field.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Product name, if the snapshot carries one.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.0
            .get("name")
            .or_else(|| self.0.get("title"))
            .and_then(Value::as_str)
    }

    /// Unit price, if the snapshot carries a parseable one.
    #[must_use]
    pub fn price(&self) -> Option<Decimal> {
        self.0.get("price").and_then(parse_amount)
    }

    /// Currency of the price, defaulting to USD.
    #[must_use]
    pub fn currency(&self) -> CurrencyCode {
        self.0
            .get("currency")
            .and_then(Value::as_str)
            .and_then(CurrencyCode::from_code)
            .unwrap_or_default()
    }

    /// All snapshot fields.
    #[must_use]
    pub const fn fields(&self) -> &Map<String, Value> {
        &self.0
    }
}

impl<'de> Deserialize<'de> for ProductSnapshot {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Map::deserialize(deserializer).map(Self::from_fields)
    }
}
