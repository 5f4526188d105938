//! Cart and favorites commands.
//!
//! Every command works on one [`CollectionStore`] and is generic over the
//! entry kind, so cart and favorites share one implementation.

use serde_json::{Map, Number, Value};
use shopstate_core::{CanonicalId, CurrencyCode, Entry, Price, normalize};
use shopstate_engine::{CollectionStore, Storage};
use tracing::info;

use crate::error::CliError;
use crate::{ProductArgs, ShowArgs};

/// Build a product record from command-line flags.
///
/// # Errors
///
/// Returns an error if `--json` is not an object, `--price` is not a
/// number, or a `--field` is not `key=value`.
pub fn build_record(product: &ProductArgs) -> Result<Value, CliError> {
    let mut fields = match &product.json {
        Some(raw) => match serde_json::from_str::<Value>(raw)? {
            Value::Object(fields) => fields,
            _ => {
                return Err(CliError::InvalidArgument(
                    "--json must be a JSON object".to_string(),
                ));
            }
        },
        None => Map::new(),
    };

    for field in &product.fields {
        let (key, raw) = field.split_once('=').ok_or_else(|| {
            CliError::InvalidArgument(format!("--field {field:?} must be KEY=VALUE"))
        })?;
        let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
        fields.insert(key.to_string(), value);
    }

    if let Some(id) = &product.id {
        fields.insert("id".to_string(), Value::String(id.clone()));
    }
    if let Some(name) = &product.name {
        fields.insert("name".to_string(), Value::String(name.clone()));
    }
    if let Some(price) = &product.price {
        let number = serde_json::from_str::<Number>(price.trim()).map_err(|_| {
            CliError::InvalidArgument(format!("--price {price:?} is not a number"))
        })?;
        fields.insert("price".to_string(), Value::Number(number));
    }

    Ok(Value::Object(fields))
}

/// Add a product.
///
/// # Errors
///
/// Returns an error if the record is malformed or has no usable identifier.
pub fn add<E: Entry, S: Storage>(
    store: &mut CollectionStore<E, S>,
    product: &ProductArgs,
) -> Result<(), CliError> {
    let record = build_record(product)?;
    let id = normalize(&record)?;

    if store.add_item(&record) {
        info!(kind = %E::KIND, id = %id, count = store.count(), "Added");
    } else {
        info!(kind = %E::KIND, id = %id, "Already present, nothing changed");
    }
    Ok(())
}

/// Remove an entry.
///
/// # Errors
///
/// Returns an error if `id` is blank.
pub fn remove<E: Entry, S: Storage>(
    store: &mut CollectionStore<E, S>,
    id: &str,
) -> Result<(), CliError> {
    let id = CanonicalId::parse(id)?;
    if store.remove_item(&id) {
        info!(kind = %E::KIND, id = %id, count = store.count(), "Removed");
    } else {
        info!(kind = %E::KIND, id = %id, "Not present, nothing changed");
    }
    Ok(())
}

/// Set a line's quantity.
///
/// # Errors
///
/// Returns an error if `id` is blank.
pub fn update_quantity<E: Entry, S: Storage>(
    store: &mut CollectionStore<E, S>,
    id: &str,
    quantity: i64,
) -> Result<(), CliError> {
    let id = CanonicalId::parse(id)?;
    if store.update_quantity(&id, quantity) {
        info!(kind = %E::KIND, id = %id, count = store.count(), "Quantity updated");
    } else {
        info!(kind = %E::KIND, id = %id, "Nothing changed");
    }
    Ok(())
}

/// Empty the collection.
pub fn clear<E: Entry, S: Storage>(store: &mut CollectionStore<E, S>) {
    if store.clear() {
        info!(kind = %E::KIND, "Cleared");
    } else {
        info!(kind = %E::KIND, "Already empty");
    }
}

/// Print the collection.
///
/// # Errors
///
/// Returns an error if the collection cannot be serialized.
#[allow(clippy::print_stdout)]
pub fn show<E: Entry, S: Storage>(
    store: &CollectionStore<E, S>,
    args: &ShowArgs,
) -> Result<(), CliError> {
    let collection = store.snapshot();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&*collection)?);
        return Ok(());
    }

    if collection.is_empty() {
        println!("{} is empty", E::KIND);
        return Ok(());
    }

    for entry in collection.iter() {
        let snapshot = entry.snapshot();
        let name = snapshot.name().unwrap_or("-");
        let price = snapshot
            .price()
            .map_or_else(|| "-".to_string(), |p| Price::new(p, snapshot.currency()).display());
        println!(
            "{:<16} {:>4} x {:<10} {}",
            entry.canonical_id().as_str(),
            entry.quantity(),
            price,
            name
        );
    }
    println!("count: {}", store.count());
    println!(
        "subtotal: {}",
        Price::new(store.subtotal(), CurrencyCode::default()).display()
    );
    Ok(())
}
