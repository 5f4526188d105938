//! Collection store: one context's owned, persisted view of a collection.
//!
//! A `CollectionStore` ties the pieces together:
//!
//! 1. UI calls (`add_item`, `remove_item`, `update_quantity`, `clear`) become
//!    [`Action`]s for the pure [`reduce`].
//! 2. A changed collection is serialized and written to [`Storage`] in one
//!    `set_item` call, and the written blob is recorded in the [`EchoGuard`].
//! 3. The new collection is published once on the [`ChangeBroadcaster`].
//! 4. Storage events from other contexts replace local state wholesale.
//!
//! Nothing here returns an error to the UI. Unreadable or malformed
//! persisted state loads as an empty collection; failed writes are logged.

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use rust_decimal::Decimal;
use serde_json::Value;
use shopstate_core::{Action, CanonicalId, Collection, Entry, normalize, reduce};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::broadcast::{ChangeBroadcaster, ChangeReceiver};
use crate::derived::{DerivedViewCache, DerivedViews};
use crate::storage::{Pending, Storage, StorageEvent, StorageKey, StorageSubscription};
use crate::sync::{EchoGuard, Incoming};

/// Identifies one context (tab, process) in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextId(Uuid);

impl ContextId {
    /// A fresh random context id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ContextId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

/// Load a collection from storage, recovering every failure to "empty".
///
/// Returns the collection together with the raw blob it was decoded from
/// (`None` if the key was missing or the blob was discarded).
pub fn load_collection<E: Entry, S: Storage>(
    storage: &S,
    key: &StorageKey,
) -> (Collection<E>, Option<String>) {
    let blob = match storage.get_item(key) {
        Ok(Some(blob)) => blob,
        Ok(None) => return (Collection::empty(), None),
        Err(e) => {
            warn!(key = %key, error = %e, "Failed to read persisted collection, starting empty");
            return (Collection::empty(), None);
        }
    };

    match Collection::from_blob(&blob) {
        Ok(collection) => (collection, Some(blob)),
        Err(e) => {
            warn!(key = %key, error = %e, "Discarding malformed persisted collection");
            (Collection::empty(), None)
        }
    }
}

/// One context's store for one collection kind.
///
/// Mutations take `&mut self` and run to completion; the store is owned by
/// a single context and is not shared across threads.
pub struct CollectionStore<E: Entry, S: Storage> {
    storage: S,
    key: StorageKey,
    context: ContextId,
    current: Arc<Collection<E>>,
    guard: EchoGuard,
    subscription: StorageSubscription,
    broadcaster: ChangeBroadcaster<E>,
    cache: DerivedViewCache<E>,
}

impl<E: Entry, S: Storage> CollectionStore<E, S> {
    /// Open the store for `key`, loading whatever is persisted there.
    ///
    /// Subscribes to storage before loading, so no change made between the
    /// two is missed.
    pub fn open(storage: S, key: StorageKey, context: ContextId, capacity: usize) -> Self {
        let subscription = storage.subscribe();
        let (collection, blob) = load_collection(&storage, &key);
        debug!(
            kind = %E::KIND,
            context = %context,
            key = %key,
            entries = collection.len(),
            "Opened collection store"
        );

        Self {
            storage,
            key,
            context,
            current: Arc::new(collection),
            guard: EchoGuard::new(blob),
            subscription,
            broadcaster: ChangeBroadcaster::new(capacity),
            cache: DerivedViewCache::new(),
        }
    }

    // =========================================================================
    // Inbound operations
    // =========================================================================

    /// Add a product record. Returns whether the collection changed.
    ///
    /// Records without a usable identifier are rejected with a warning.
    pub fn add_item(&mut self, record: &Value) -> bool {
        if let Err(e) = normalize(record) {
            warn!(
                kind = %E::KIND,
                context = %self.context,
                error = %e,
                "Rejected item without identity"
            );
            return false;
        }
        self.dispatch(&Action::Add {
            item: record.clone(),
        })
    }

    /// Remove an entry. Removing an absent id is a no-op.
    pub fn remove_item(&mut self, id: &CanonicalId) -> bool {
        self.dispatch(&Action::Remove { id: id.clone() })
    }

    /// Set a cart line's quantity, clamped to at least 1.
    pub fn update_quantity(&mut self, id: &CanonicalId, quantity: i64) -> bool {
        self.dispatch(&Action::UpdateQty {
            id: id.clone(),
            quantity,
        })
    }

    /// Empty the collection.
    pub fn clear(&mut self) -> bool {
        self.dispatch(&Action::Clear)
    }

    /// Apply one action. Returns whether a state transition happened.
    ///
    /// Pending storage events are applied first, so the action reduces
    /// against the latest known state and this context's own echoes are
    /// consumed before it writes again.
    #[instrument(
        skip_all,
        fields(kind = %E::KIND, context = %self.context, action = action.name())
    )]
    pub fn dispatch(&mut self, action: &Action) -> bool {
        self.poll_storage_events();

        let next = match reduce(&self.current, action) {
            Cow::Borrowed(_) => {
                debug!("Action left collection unchanged");
                return false;
            }
            Cow::Owned(next) => Arc::new(next),
        };

        self.save(&next);
        self.current = Arc::clone(&next);
        self.broadcaster.publish(next);
        true
    }

    fn save(&mut self, collection: &Collection<E>) {
        let blob = match collection.to_blob() {
            Ok(blob) => blob,
            Err(e) => {
                error!(error = %e, "Failed to serialize collection");
                return;
            }
        };

        match self.storage.set_item(&self.key, &blob) {
            Ok(()) => self.guard.record(Some(blob)),
            Err(e) => error!(key = %self.key, error = %e, "Failed to persist collection"),
        }
    }

    // =========================================================================
    // Cross-context sync
    // =========================================================================

    /// Fold a storage notification into local state.
    ///
    /// Returns `true` if local state was replaced. Own echoes, events for
    /// other keys and foreign values equal to the current state return
    /// `false` and publish nothing.
    #[instrument(skip_all, fields(kind = %E::KIND, context = %self.context))]
    pub fn apply_storage_event(&mut self, event: &StorageEvent) -> bool {
        if event.key != self.key {
            return false;
        }

        let incoming = match self.guard.classify(event.new_value.as_deref()) {
            Incoming::Echo => {
                debug!("Ignoring echo of own write");
                return false;
            }
            Incoming::Foreign(incoming) => incoming,
        };

        let collection = match incoming {
            None => Collection::empty(),
            Some(blob) => Collection::from_blob(blob).unwrap_or_else(|e| {
                warn!(error = %e, "Foreign write is malformed, treating as empty");
                Collection::empty()
            }),
        };
        self.guard.record(event.new_value.clone());
        self.adopt(collection)
    }

    /// Apply every storage event queued for this store.
    ///
    /// Returns how many of them replaced local state.
    pub fn poll_storage_events(&mut self) -> usize {
        let mut replaced = 0;
        loop {
            match self.subscription.try_next() {
                Pending::Event(event) => {
                    if self.apply_storage_event(&event) {
                        replaced += 1;
                    }
                }
                Pending::Lagged(skipped) => {
                    warn!(
                        kind = %E::KIND,
                        context = %self.context,
                        skipped,
                        "Storage events dropped, resyncing"
                    );
                    if self.resync() {
                        replaced += 1;
                    }
                }
                Pending::Empty => return replaced,
            }
        }
    }

    /// Re-read the persisted value and adopt it if it is not our own.
    fn resync(&mut self) -> bool {
        match self.storage.get_item(&self.key) {
            Ok(new_value) => {
                let event = StorageEvent {
                    key: self.key.clone(),
                    new_value,
                };
                self.apply_storage_event(&event)
            }
            Err(e) => {
                warn!(key = %self.key, error = %e, "Failed to resync collection");
                false
            }
        }
    }

    fn adopt(&mut self, collection: Collection<E>) -> bool {
        if *self.current == collection {
            debug!("Foreign write matches local state");
            return false;
        }

        info!(entries = collection.len(), "Adopted collection written by another context");
        let next = Arc::new(collection);
        self.current = Arc::clone(&next);
        self.broadcaster.publish(next);
        true
    }

    // =========================================================================
    // Outbound views
    // =========================================================================

    /// The current collection. Cheap to clone; never changes underneath you.
    #[must_use]
    pub fn snapshot(&self) -> Arc<Collection<E>> {
        Arc::clone(&self.current)
    }

    /// Memoized aggregates of the current collection.
    #[must_use]
    pub fn views(&self) -> Arc<DerivedViews> {
        self.cache.views(&self.current)
    }

    /// Units in the collection (favorites: entries).
    #[must_use]
    pub fn count(&self) -> u64 {
        self.views().count
    }

    /// Sum of `price × quantity`.
    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        self.views().subtotal
    }

    #[must_use]
    pub fn is_in_collection(&self, id: &CanonicalId) -> bool {
        self.views().contains(id)
    }

    /// Subscribe to "collection changed" notifications.
    #[must_use]
    pub fn subscribe(&self) -> ChangeReceiver<E> {
        self.broadcaster.subscribe()
    }

    /// The blob this store last wrote or adopted.
    #[must_use]
    pub fn last_written(&self) -> Option<&str> {
        self.guard.last_written()
    }

    /// How many times derived views have been recomputed.
    #[must_use]
    pub fn view_recomputations(&self) -> u64 {
        self.cache.recomputations()
    }

    #[must_use]
    pub const fn key(&self) -> &StorageKey {
        &self.key
    }

    #[must_use]
    pub const fn context(&self) -> ContextId {
        self.context
    }
}

impl<E: Entry, S: Storage> fmt::Debug for CollectionStore<E, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollectionStore")
            .field("kind", &E::KIND)
            .field("key", &self.key)
            .field("context", &self.context)
            .field("entries", &self.current.len())
            .finish_non_exhaustive()
    }
}
