//! In-process storage shared between contexts.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use super::{Storage, StorageError, StorageEvents, StorageKey, StorageSubscription};

/// A shared in-memory origin.
///
/// Cloning the handle gives another view of the same origin, the way two
/// tabs see the same browser storage. Individual reads and writes are
/// serialized by a mutex; no operation spans more than one lock.
#[derive(Debug, Clone)]
pub struct MemoryStorage {
    inner: Arc<MemoryInner>,
}

#[derive(Debug)]
struct MemoryInner {
    items: Mutex<HashMap<StorageKey, String>>,
    events: StorageEvents,
}

impl MemoryStorage {
    /// Create an empty origin whose change fan-out buffers `capacity` events.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(MemoryInner {
                items: Mutex::new(HashMap::new()),
                events: StorageEvents::new(capacity),
            }),
        }
    }

    /// Remove every key, notifying subscribers of each removal.
    ///
    /// Models storage being wiped from outside the application.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Poisoned`] if the lock is poisoned.
    pub fn clear(&self) -> Result<(), StorageError> {
        let removed: Vec<StorageKey> = self.items()?.drain().map(|(key, _)| key).collect();
        for key in &removed {
            self.inner.events.emit(key, None);
        }
        Ok(())
    }

    fn items(&self) -> Result<MutexGuard<'_, HashMap<StorageKey, String>>, StorageError> {
        self.inner.items.lock().map_err(|_| StorageError::Poisoned)
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new(64)
    }
}

impl Storage for MemoryStorage {
    fn get_item(&self, key: &StorageKey) -> Result<Option<String>, StorageError> {
        Ok(self.items()?.get(key).cloned())
    }

    fn set_item(&self, key: &StorageKey, value: &str) -> Result<(), StorageError> {
        let previous = self.items()?.insert(key.clone(), value.to_owned());
        if previous.as_deref() != Some(value) {
            self.inner.events.emit(key, Some(value.to_owned()));
        }
        Ok(())
    }

    fn remove_item(&self, key: &StorageKey) -> Result<(), StorageError> {
        if self.items()?.remove(key).is_some() {
            self.inner.events.emit(key, None);
        }
        Ok(())
    }

    fn subscribe(&self) -> StorageSubscription {
        self.inner.events.subscribe()
    }
}
