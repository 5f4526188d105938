//! Application root shared by every page component of one context.

use shopstate_core::{CartLine, CollectionKind, FavoriteEntry};

use crate::config::EngineConfig;
use crate::storage::{FileStorage, Storage, StorageError, StorageEvent};
use crate::store::{CollectionStore, ContextId};

/// The cart and favorites stores of one context.
///
/// Constructed once per application root and kept for the whole session.
/// Both stores share one storage backend and one [`ContextId`].
#[derive(Debug)]
pub struct ShopState<S: Storage> {
    context: ContextId,
    cart: CollectionStore<CartLine, S>,
    favorites: CollectionStore<FavoriteEntry, S>,
}

impl<S: Storage + Clone> ShopState<S> {
    /// Open both stores over `storage`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidKey`] if the configured key prefix is
    /// not a valid storage key.
    pub fn open(storage: S, config: &EngineConfig) -> Result<Self, StorageError> {
        let context = ContextId::new();
        let cart_key = config.storage_key(CollectionKind::Cart)?;
        let favorites_key = config.storage_key(CollectionKind::Favorites)?;

        let cart = CollectionStore::open(storage.clone(), cart_key, context, config.event_capacity);
        let favorites =
            CollectionStore::open(storage, favorites_key, context, config.event_capacity);

        tracing::info!(
            context = %context,
            cart_entries = cart.snapshot().len(),
            favorite_entries = favorites.snapshot().len(),
            "Shop state ready"
        );

        Ok(Self {
            context,
            cart,
            favorites,
        })
    }
}

impl ShopState<FileStorage> {
    /// Open the file-backed origin named by `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the origin directory cannot be created or the
    /// key prefix is invalid.
    pub fn open_from_config(config: &EngineConfig) -> Result<Self, StorageError> {
        let storage = FileStorage::from_config(config)?;
        Self::open(storage, config)
    }
}

impl<S: Storage> ShopState<S> {
    #[must_use]
    pub const fn context(&self) -> ContextId {
        self.context
    }

    #[must_use]
    pub const fn cart(&self) -> &CollectionStore<CartLine, S> {
        &self.cart
    }

    pub const fn cart_mut(&mut self) -> &mut CollectionStore<CartLine, S> {
        &mut self.cart
    }

    #[must_use]
    pub const fn favorites(&self) -> &CollectionStore<FavoriteEntry, S> {
        &self.favorites
    }

    pub const fn favorites_mut(&mut self) -> &mut CollectionStore<FavoriteEntry, S> {
        &mut self.favorites
    }

    /// Route one storage notification to the store that owns its key.
    pub fn apply_storage_event(&mut self, event: &StorageEvent) -> bool {
        if &event.key == self.cart.key() {
            self.cart.apply_storage_event(event)
        } else if &event.key == self.favorites.key() {
            self.favorites.apply_storage_event(event)
        } else {
            false
        }
    }

    /// Apply queued storage events to both stores.
    ///
    /// Returns how many replaced local state.
    pub fn poll_storage_events(&mut self) -> usize {
        self.cart.poll_storage_events() + self.favorites.poll_storage_events()
    }
}
