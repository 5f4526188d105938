//! Identity normalizer.
//!
//! Product records reach the collections from several producers (listing
//! page, detail page, favorites, checkout) and each one names the product id
//! differently. [`normalize`] maps all of them to one [`CanonicalId`].

use serde_json::Value;

use crate::types::CanonicalId;

/// Identifier fields, in precedence order: catalog key, legacy database
/// key, generic fallback.
pub const ID_FIELDS: [&str; 3] = ["_id", "product_id", "id"];

/// Errors that can occur when normalizing a product record.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum IdentityError {
    /// The record is not a JSON object.
    #[error("product record must be an object")]
    NotAnObject,
    /// None of the identifier fields holds a usable value.
    #[error("product record has no usable identifier (expected one of _id, product_id, id)")]
    MissingIdentifier,
}

/// Map a product record to its canonical id.
///
/// Fields are checked in [`ID_FIELDS`] order. A field counts only if it is a
/// non-blank string or an integer; anything else falls through to the next
/// field.
///
/// # Errors
///
/// Returns [`IdentityError::NotAnObject`] for non-object records and
/// [`IdentityError::MissingIdentifier`] when no field yields an id. Callers
/// must not insert an entry in either case.
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use shopstate_core::identity::normalize;
///
/// let id = normalize(&json!({"product_id": 7, "id": "ignored"})).unwrap();
/// assert_eq!(id.as_str(), "7");
/// ```
pub fn normalize(record: &Value) -> Result<CanonicalId, IdentityError> {
    let fields = record.as_object().ok_or(IdentityError::NotAnObject)?;

    ID_FIELDS
        .iter()
        .filter_map(|field| fields.get(*field))
        .find_map(id_from_value)
        .ok_or(IdentityError::MissingIdentifier)
}

fn id_from_value(value: &Value) -> Option<CanonicalId> {
    match value {
        Value::String(s) => CanonicalId::parse(s).ok(),
        Value::Number(n) if n.is_i64() || n.is_u64() => CanonicalId::parse(&n.to_string()).ok(),
        _ => None,
    }
}
