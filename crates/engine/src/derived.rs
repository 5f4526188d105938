//! Derived-view cache.
//!
//! Aggregates over a collection (unit count, subtotal, membership) are
//! recomputed only when the collection `Arc` changes. A store hands out a new
//! `Arc` on every state transition, so pointer identity is a complete
//! invalidation key: the cache can never serve views of an older collection.

use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::sync::Arc;

use rust_decimal::Decimal;
use shopstate_core::{CanonicalId, Collection, Entry};

/// Aggregates derived from one collection value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedViews {
    /// Sum of quantities (favorites: number of entries).
    pub count: u64,
    /// Sum of `price × quantity` over entries with a parseable price.
    pub subtotal: Decimal,
    members: HashSet<CanonicalId>,
}

impl DerivedViews {
    /// Compute the views of `collection` from scratch.
    #[must_use]
    pub fn compute<E: Entry>(collection: &Collection<E>) -> Self {
        let mut count: u64 = 0;
        let mut subtotal = Decimal::ZERO;
        let mut members = HashSet::with_capacity(collection.len());

        for entry in collection {
            let quantity = entry.quantity();
            count = count.saturating_add(u64::from(quantity));
            if let Some(price) = entry.snapshot().price() {
                subtotal = price
                    .checked_mul(Decimal::from(quantity))
                    .and_then(|line| subtotal.checked_add(line))
                    .unwrap_or(Decimal::MAX);
            }
            members.insert(entry.canonical_id().clone());
        }

        Self {
            count,
            subtotal,
            members,
        }
    }

    /// Whether `id` is in the collection these views were computed from.
    #[must_use]
    pub fn contains(&self, id: &CanonicalId) -> bool {
        self.members.contains(id)
    }
}

/// Memoizes [`DerivedViews`] for the most recent collection.
///
/// Holds a strong reference to the collection it computed from, so the
/// pointer it compares against can never be reused by another allocation.
#[derive(Debug)]
pub struct DerivedViewCache<E> {
    slot: RefCell<Option<(Arc<Collection<E>>, Arc<DerivedViews>)>>,
    recomputations: Cell<u64>,
}

impl<E> Default for DerivedViewCache<E> {
    fn default() -> Self {
        Self {
            slot: RefCell::new(None),
            recomputations: Cell::new(0),
        }
    }
}

impl<E: Entry> DerivedViewCache<E> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Views of `collection`, recomputed only if it is a different `Arc`
    /// than last time.
    pub fn views(&self, collection: &Arc<Collection<E>>) -> Arc<DerivedViews> {
        if let Some((key, views)) = self.slot.borrow().as_ref() {
            if Arc::ptr_eq(key, collection) {
                return Arc::clone(views);
            }
        }

        let views = Arc::new(DerivedViews::compute(collection));
        self.slot
            .replace(Some((Arc::clone(collection), Arc::clone(&views))));
        self.recomputations.set(self.recomputations.get() + 1);
        views
    }

    /// How many times the cache missed.
    #[must_use]
    pub fn recomputations(&self) -> u64 {
        self.recomputations.get()
    }
}
