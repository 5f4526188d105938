//! Cross-context synchronization.
//!
//! Storage fan-out delivers every write to every context, the writer
//! included. [`EchoGuard`] remembers the blob this context last wrote (or
//! last adopted) so the writer can drop its own echo instead of applying it
//! again. Anything else is foreign state and replaces the local collection
//! wholesale: last write wins, no merge.
//!
//! [`StoragePoller`] covers contexts that share storage without sharing a
//! fan-out channel (separate processes over one [`crate::FileStorage`]
//! directory). It re-reads watched keys and reports what changed since the
//! previous poll.

use std::collections::HashMap;

use tracing::warn;

use crate::storage::{Storage, StorageEvent, StorageKey};

/// How an incoming storage notification relates to this context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Incoming<'a> {
    /// The value this context wrote itself; ignore.
    Echo,
    /// A value written elsewhere (`None`: the key was removed).
    Foreign(Option<&'a str>),
}

/// Last blob written or adopted by one context for one key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EchoGuard {
    last_written: Option<String>,
}

impl EchoGuard {
    #[must_use]
    pub const fn new(last_written: Option<String>) -> Self {
        Self { last_written }
    }

    /// Remember a blob this context wrote or adopted.
    pub fn record(&mut self, blob: Option<String>) {
        self.last_written = blob;
    }

    #[must_use]
    pub fn last_written(&self) -> Option<&str> {
        self.last_written.as_deref()
    }

    /// Classify an incoming value.
    ///
    /// A removal is never an echo: this context only ever writes whole
    /// collections, never removes the key.
    #[must_use]
    pub fn classify<'a>(&self, incoming: Option<&'a str>) -> Incoming<'a> {
        match (incoming, self.last_written.as_deref()) {
            (Some(value), Some(last)) if value == last => Incoming::Echo,
            _ => Incoming::Foreign(incoming),
        }
    }
}

/// Detects changes to watched keys by re-reading them.
#[derive(Debug)]
pub struct StoragePoller<S> {
    storage: S,
    observed: HashMap<StorageKey, Option<String>>,
}

impl<S: Storage> StoragePoller<S> {
    /// Start watching `keys`. Their current values are the baseline, so the
    /// first poll only reports changes made after this call.
    pub fn new(storage: S, keys: impl IntoIterator<Item = StorageKey>) -> Self {
        let observed = keys
            .into_iter()
            .map(|key| {
                let current = storage.get_item(&key).unwrap_or_else(|e| {
                    warn!(key = %key, error = %e, "Failed to read baseline value");
                    None
                });
                (key, current)
            })
            .collect();
        Self { storage, observed }
    }

    /// Re-read every watched key and return one event per changed key.
    ///
    /// Keys that cannot be read are skipped until the next poll.
    pub fn poll(&mut self) -> Vec<StorageEvent> {
        let mut events = Vec::new();
        for (key, seen) in &mut self.observed {
            let current = match self.storage.get_item(key) {
                Ok(current) => current,
                Err(e) => {
                    warn!(key = %key, error = %e, "Failed to poll storage key");
                    continue;
                }
            };
            if current != *seen {
                events.push(StorageEvent {
                    key: key.clone(),
                    new_value: current.clone(),
                });
                *seen = current;
            }
        }
        events.sort_by(|a, b| a.key.cmp(&b.key));
        events
    }
}
