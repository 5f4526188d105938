//! Shopstate Engine - Persisted, synchronized cart and favorites.
//!
//! The engine owns the stateful half of the cart/favorites system:
//!
//! # Architecture
//!
//! - [`storage`] - Origin-scoped key/value backends with change fan-out
//! - [`store`] - `CollectionStore`: reduce, persist, broadcast, sync
//! - [`sync`] - Echo suppression and polling for other processes
//! - [`broadcast`] - Typed "collection changed" channel
//! - [`derived`] - Memoized count, subtotal and membership
//! - [`state`] - `ShopState`, the per-context application root
//! - [`config`] - Environment-driven configuration
//!
//! # Example
//!
//! ```
//! use serde_json::json;
//! use shopstate_engine::{EngineConfig, MemoryStorage, ShopState};
//!
//! let storage = MemoryStorage::default();
//! let mut tab = ShopState::open(storage.clone(), &EngineConfig::default()).unwrap();
//! let mut other_tab = ShopState::open(storage, &EngineConfig::default()).unwrap();
//!
//! tab.cart_mut().add_item(&json!({"id": "A", "price": 100}));
//! other_tab.poll_storage_events();
//! assert_eq!(other_tab.cart().count(), 1);
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod broadcast;
pub mod config;
pub mod derived;
pub mod state;
pub mod storage;
pub mod store;
pub mod sync;

pub use broadcast::{ChangeBroadcaster, ChangeReceiver};
pub use config::{ConfigError, EngineConfig};
pub use derived::{DerivedViewCache, DerivedViews};
pub use state::ShopState;
pub use storage::{
    FileStorage, MemoryStorage, Storage, StorageError, StorageEvent, StorageKey,
    StorageSubscription,
};
pub use store::{CollectionStore, ContextId, load_collection};
pub use sync::{EchoGuard, Incoming, StoragePoller};
