//! Origin-scoped key/value storage backends.
//!
//! A backend holds UTF-8 blobs under validated [`StorageKey`]s and fans out
//! a [`StorageEvent`] to every subscriber whenever a key's value changes,
//! including subscribers that belong to the writing context. Contexts tell
//! their own writes apart with [`crate::sync::EchoGuard`].
//!
//! # Backends
//!
//! - [`MemoryStorage`] - shared in-process map; each clone is one context
//! - [`FileStorage`] - one directory per origin, one file per key, atomic
//!   replace on write

use core::fmt;

use shopstate_core::CollectionKind;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::TryRecvError;

pub mod file;
pub mod memory;

pub use file::FileStorage;
pub use memory::MemoryStorage;

/// Errors that can occur in a storage backend.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Filesystem operation failed.
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Key contains characters outside the allowed set.
    #[error("invalid storage key {0:?}: use ASCII letters, digits, '.', '-' or '_'")]
    InvalidKey(String),

    /// Origin name is not a single directory segment.
    #[error("invalid origin {0:?}: use ASCII letters, digits, '.', '-' or '_'")]
    InvalidOrigin(String),

    /// A lock guarding shared storage was poisoned by a panic.
    #[error("storage lock poisoned")]
    Poisoned,
}

/// A validated storage key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StorageKey(String);

impl StorageKey {
    /// Validate a raw key.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidKey`] if the key is empty, starts with
    /// `.`, or contains anything other than ASCII alphanumerics, `.`, `-`, `_`.
    pub fn new(raw: &str) -> Result<Self, StorageError> {
        if is_valid_segment(raw) {
            Ok(Self(raw.to_owned()))
        } else {
            Err(StorageError::InvalidKey(raw.to_owned()))
        }
    }

    /// Key for one collection kind: `"{prefix}.{suffix}"`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidKey`] if the prefix is not a valid key.
    pub fn for_kind(prefix: &str, kind: CollectionKind) -> Result<Self, StorageError> {
        Self::new(&format!("{prefix}.{}", kind.storage_suffix()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Whether `raw` is usable as a key or a path segment.
pub(crate) fn is_valid_segment(raw: &str) -> bool {
    !raw.is_empty()
        && !raw.starts_with('.')
        && raw
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
}

/// A change to one key, as seen by every subscriber of the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageEvent {
    /// The key that changed.
    pub key: StorageKey,
    /// The new blob, or `None` if the key was removed.
    pub new_value: Option<String>,
}

/// An origin-scoped key/value store shared by several contexts.
pub trait Storage: Send + Sync {
    /// Read the blob stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    fn get_item(&self, key: &StorageKey) -> Result<Option<String>, StorageError>;

    /// Replace the blob stored under `key`. Readers never observe a partial
    /// value.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be written.
    fn set_item(&self, key: &StorageKey, value: &str) -> Result<(), StorageError>;

    /// Remove `key`. Removing an absent key succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be written.
    fn remove_item(&self, key: &StorageKey) -> Result<(), StorageError>;

    /// Subscribe to changes written through this backend.
    fn subscribe(&self) -> StorageSubscription;
}

/// What [`StorageSubscription::try_next`] found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pending {
    /// The next change, in write order.
    Event(StorageEvent),
    /// The subscriber fell behind and this many events were dropped.
    Lagged(u64),
    /// Nothing pending.
    Empty,
}

/// Receiving half of a backend's change fan-out.
#[derive(Debug)]
pub struct StorageSubscription {
    receiver: broadcast::Receiver<StorageEvent>,
}

impl StorageSubscription {
    /// Take the next pending change without blocking.
    pub fn try_next(&mut self) -> Pending {
        match self.receiver.try_recv() {
            Ok(event) => Pending::Event(event),
            Err(TryRecvError::Lagged(skipped)) => Pending::Lagged(skipped),
            Err(TryRecvError::Empty | TryRecvError::Closed) => Pending::Empty,
        }
    }
}

/// Sending half of a backend's change fan-out.
#[derive(Debug)]
pub(crate) struct StorageEvents {
    sender: broadcast::Sender<StorageEvent>,
}

impl StorageEvents {
    pub(crate) fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub(crate) fn emit(&self, key: &StorageKey, new_value: Option<String>) {
        // No subscribers is fine: nobody is watching this origin yet.
        let _ = self.sender.send(StorageEvent {
            key: key.clone(),
            new_value,
        });
    }

    pub(crate) fn subscribe(&self) -> StorageSubscription {
        StorageSubscription {
            receiver: self.sender.subscribe(),
        }
    }
}
