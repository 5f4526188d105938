//! Reducer core: the one pure state-transition function for collections.
//!
//! `reduce(collection, action)` never fails and never mutates its input.
//! It returns [`Cow::Borrowed`] when the action leaves the collection as it
//! was, and [`Cow::Owned`] with a complete replacement value otherwise. The
//! engine uses that distinction to decide whether a state transition
//! happened (persist, broadcast) or not (do nothing).
//!
//! | Action | Effect | Edge cases |
//! |---|---|---|
//! | `Add` | existing id: [`Entry::absorb`]; else append | no usable id → unchanged |
//! | `Remove` | drop the entry | absent id → unchanged |
//! | `UpdateQty` | [`Entry::set_quantity`], clamped to ≥ 1 | absent id, favorites → unchanged |
//! | `Clear` | empty collection | already empty → unchanged |

use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::identity::normalize;
use crate::types::{CanonicalId, Collection, Entry, ProductSnapshot};

/// A requested change to a collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    /// Add a product record. The record is normalized and snapshotted.
    Add { item: Value },
    /// Remove the entry with this id.
    Remove { id: CanonicalId },
    /// Set the quantity of a cart line.
    UpdateQty { id: CanonicalId, quantity: i64 },
    /// Empty the collection.
    Clear,
}

impl Action {
    /// Short action name for logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Add { .. } => "ADD",
            Self::Remove { .. } => "REMOVE",
            Self::UpdateQty { .. } => "UPDATE_QTY",
            Self::Clear => "CLEAR",
        }
    }
}

/// Apply `action` to `collection`.
///
/// # Examples
///
/// ```
/// use std::borrow::Cow;
///
/// use serde_json::json;
/// use shopstate_core::reducer::{Action, reduce};
/// use shopstate_core::{CartLine, Collection, Entry};
///
/// let cart = Collection::<CartLine>::empty();
/// let add = Action::Add { item: json!({"id": "A", "price": 100}) };
///
/// let once = reduce(&cart, &add).into_owned();
/// let twice = reduce(&once, &add).into_owned();
/// assert_eq!(twice.len(), 1);
/// assert_eq!(twice.entries()[0].quantity(), 2);
///
/// assert!(matches!(reduce(&cart, &Action::Clear), Cow::Borrowed(_)));
/// ```
#[must_use]
pub fn reduce<'a, E: Entry>(
    collection: &'a Collection<E>,
    action: &Action,
) -> Cow<'a, Collection<E>> {
    match action {
        Action::Add { item } => add(collection, item),
        Action::Remove { id } => remove(collection, id),
        Action::UpdateQty { id, quantity } => update_quantity(collection, id, *quantity),
        Action::Clear => clear(collection),
    }
}

fn add<'a, E: Entry>(collection: &'a Collection<E>, item: &Value) -> Cow<'a, Collection<E>> {
    let Ok(id) = normalize(item) else {
        return Cow::Borrowed(collection);
    };
    let Some(snapshot) = ProductSnapshot::from_record(item) else {
        return Cow::Borrowed(collection);
    };

    match collection.position(&id) {
        Some(index) => modify_at(collection, index, |entry| entry.absorb(snapshot)),
        None => {
            let mut entries = collection.entries().to_vec();
            entries.push(E::from_snapshot(id, snapshot));
            Cow::Owned(Collection::from_vec_unchecked(entries))
        }
    }
}

fn remove<'a, E: Entry>(collection: &'a Collection<E>, id: &CanonicalId) -> Cow<'a, Collection<E>> {
    if !collection.contains(id) {
        return Cow::Borrowed(collection);
    }
    let entries = collection
        .iter()
        .filter(|entry| entry.canonical_id() != id)
        .cloned()
        .collect();
    Cow::Owned(Collection::from_vec_unchecked(entries))
}

fn update_quantity<'a, E: Entry>(
    collection: &'a Collection<E>,
    id: &CanonicalId,
    quantity: i64,
) -> Cow<'a, Collection<E>> {
    match collection.position(id) {
        Some(index) => modify_at(collection, index, |entry| entry.set_quantity(quantity)),
        None => Cow::Borrowed(collection),
    }
}

fn clear<E: Entry>(collection: &Collection<E>) -> Cow<'_, Collection<E>> {
    if collection.is_empty() {
        Cow::Borrowed(collection)
    } else {
        Cow::Owned(Collection::empty())
    }
}

/// Run `edit` on a copy of the entry at `index`; rebuild only if it changed.
fn modify_at<E: Entry>(
    collection: &Collection<E>,
    index: usize,
    edit: impl FnOnce(&mut E) -> bool,
) -> Cow<'_, Collection<E>> {
    let Some(current) = collection.entries().get(index) else {
        return Cow::Borrowed(collection);
    };
    let mut updated = current.clone();
    if !edit(&mut updated) {
        return Cow::Borrowed(collection);
    }

    let mut entries = collection.clone().into_entries();
    if let Some(slot) = entries.get_mut(index) {
        *slot = updated;
    }
    Cow::Owned(Collection::from_vec_unchecked(entries))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::types::{CartLine, FavoriteEntry};

    fn id(s: &str) -> CanonicalId {
        CanonicalId::parse(s).unwrap()
    }

    fn add_action(item: Value) -> Action {
        Action::Add { item }
    }

    fn apply<E: Entry>(collection: Collection<E>, actions: &[Action]) -> Collection<E> {
        actions
            .iter()
            .fold(collection, |acc, action| reduce(&acc, action).into_owned())
    }

    #[test]
    fn test_add_appends_in_order() {
        let cart = apply(
            Collection::<CartLine>::empty(),
            &[add_action(json!({"id": "A"})), add_action(json!({"id": "B"}))],
        );
        let ids: Vec<_> = cart.iter().map(|l| l.canonical_id().as_str()).collect();
        assert_eq!(ids, ["A", "B"]);
        assert!(cart.iter().all(|l| l.quantity() == 1));
    }

    #[test]
    fn test_add_merges_by_canonical_id() {
        let cart = apply(
            Collection::<CartLine>::empty(),
            &[
                add_action(json!({"_id": "A", "name": "old", "price": 100})),
                add_action(json!({"id": "A", "name": "new", "price": 80})),
            ],
        );
        assert_eq!(cart.len(), 1);
        let line = &cart.entries()[0];
        assert_eq!(line.quantity(), 2);
        assert_eq!(line.canonical_id(), &id("A"));
        assert_eq!(line.snapshot().name(), Some("new"));
        assert_eq!(line.snapshot().get("price"), Some(&json!(80)));
    }

    #[test]
    fn test_add_existing_keeps_position() {
        let cart = apply(
            Collection::<CartLine>::empty(),
            &[
                add_action(json!({"id": "A"})),
                add_action(json!({"id": "B"})),
                add_action(json!({"id": "A"})),
            ],
        );
        assert_eq!(cart.entries()[0].canonical_id(), &id("A"));
        assert_eq!(cart.entries()[0].quantity(), 2);
    }

    #[test]
    fn test_add_at_saturated_quantity_is_unchanged() {
        let cart = Collection::from_entries([CartLine::new(
            id("A"),
            u32::MAX,
            ProductSnapshot::from_record(&json!({"id": "A"})).unwrap(),
        )]);
        let result = reduce(&cart, &add_action(json!({"id": "A"})));
        assert!(matches!(result, Cow::Borrowed(_)));

        let result = reduce(&cart, &add_action(json!({"id": "A", "price": 5})));
        assert!(matches!(result, Cow::Owned(_)));
    }

    #[test]
    fn test_add_without_id_is_unchanged() {
        let cart = Collection::<CartLine>::empty();
        let result = reduce(&cart, &add_action(json!({"name": "nameless"})));
        assert!(matches!(result, Cow::Borrowed(_)));

        let result = reduce(&cart, &add_action(json!("A")));
        assert!(matches!(result, Cow::Borrowed(_)));
    }

    #[test]
    fn test_favorites_never_duplicate() {
        let favorites = apply(
            Collection::<FavoriteEntry>::empty(),
            &[add_action(json!({"id": "X"}))],
        );
        let again = reduce(&favorites, &add_action(json!({"id": "X", "name": "changed"})));
        assert!(matches!(again, Cow::Borrowed(_)));
        assert_eq!(again.len(), 1);
    }

    #[test]
    fn test_remove_is_idempotent() {
        let cart = apply(
            Collection::<CartLine>::empty(),
            &[add_action(json!({"id": "A"}))],
        );
        let remove = Action::Remove { id: id("Z") };

        let once = reduce(&cart, &remove);
        assert!(matches!(once, Cow::Borrowed(_)));
        let twice = reduce(&once, &remove).into_owned();
        assert_eq!(twice, cart);
    }

    #[test]
    fn test_remove_present_id() {
        let cart = apply(
            Collection::<CartLine>::empty(),
            &[
                add_action(json!({"id": "A"})),
                add_action(json!({"id": "B"})),
                Action::Remove { id: id("A") },
            ],
        );
        assert_eq!(cart.len(), 1);
        assert_eq!(cart.entries()[0].canonical_id(), &id("B"));
    }

    #[test]
    fn test_update_quantity_clamps() {
        let cart = apply(
            Collection::<CartLine>::empty(),
            &[
                add_action(json!({"id": "A"})),
                Action::UpdateQty {
                    id: id("A"),
                    quantity: 5,
                },
            ],
        );
        assert_eq!(cart.entries()[0].quantity(), 5);

        for quantity in [0, -5] {
            let clamped = reduce(
                &cart,
                &Action::UpdateQty {
                    id: id("A"),
                    quantity,
                },
            );
            assert_eq!(clamped.len(), 1);
            assert_eq!(clamped.entries()[0].quantity(), 1);
        }
    }

    #[test]
    fn test_update_quantity_absent_or_favorites() {
        let cart = Collection::<CartLine>::empty();
        let action = Action::UpdateQty {
            id: id("A"),
            quantity: 3,
        };
        assert!(matches!(reduce(&cart, &action), Cow::Borrowed(_)));

        let favorites = apply(
            Collection::<FavoriteEntry>::empty(),
            &[add_action(json!({"id": "A"}))],
        );
        assert!(matches!(reduce(&favorites, &action), Cow::Borrowed(_)));
    }

    #[test]
    fn test_clear() {
        let cart = apply(
            Collection::<CartLine>::empty(),
            &[add_action(json!({"id": "A"}))],
        );
        let cleared = reduce(&cart, &Action::Clear);
        assert!(matches!(cleared, Cow::Owned(_)));
        assert!(cleared.is_empty());

        let empty = Collection::<CartLine>::empty();
        assert!(matches!(reduce(&empty, &Action::Clear), Cow::Borrowed(_)));
    }

    #[test]
    fn test_reduce_does_not_mutate_input() {
        let cart = apply(
            Collection::<CartLine>::empty(),
            &[add_action(json!({"id": "A"}))],
        );
        let before = cart.clone();
        let _ = reduce(&cart, &add_action(json!({"id": "A"})));
        let _ = reduce(&cart, &Action::Clear);
        assert_eq!(cart, before);
    }

    #[test]
    fn test_action_wire_format() {
        let action: Action =
            serde_json::from_value(json!({"type": "UPDATE_QTY", "id": "A", "quantity": 0}))
                .unwrap();
        assert_eq!(
            action,
            Action::UpdateQty {
                id: id("A"),
                quantity: 0
            }
        );
        assert_eq!(
            serde_json::to_value(Action::Clear).unwrap(),
            json!({"type": "CLEAR"})
        );
    }
}
