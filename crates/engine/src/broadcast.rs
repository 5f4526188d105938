//! Change broadcaster.
//!
//! Observers (count badge, cart page, checkout subtotal) subscribe to one
//! typed channel per collection instead of listening for ad hoc event names.
//! The payload is always the new collection.

use std::sync::Arc;

use shopstate_core::Collection;
use tokio::sync::broadcast;

/// Receiver of "collection changed" notifications.
pub type ChangeReceiver<E> = broadcast::Receiver<Arc<Collection<E>>>;

/// Publishes one notification per state transition of a collection.
#[derive(Debug)]
pub struct ChangeBroadcaster<E> {
    sender: broadcast::Sender<Arc<Collection<E>>>,
}

impl<E> ChangeBroadcaster<E> {
    /// Create a broadcaster whose subscribers may fall `capacity` events behind.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Subscribe to future notifications.
    #[must_use]
    pub fn subscribe(&self) -> ChangeReceiver<E> {
        self.sender.subscribe()
    }

    /// Notify every subscriber. Returns how many were reached.
    pub fn publish(&self, collection: Arc<Collection<E>>) -> usize {
        self.sender.send(collection).unwrap_or(0)
    }
}
