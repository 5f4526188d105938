//! Watch an origin for changes written by other processes.
//!
//! The watcher is a read-only context: it polls the origin's storage files,
//! folds foreign writes into its own `ShopState`, and logs the recomputed
//! views each time a change notification arrives. It never writes back.

use shopstate_core::{CurrencyCode, Price};
use shopstate_engine::{EngineConfig, FileStorage, ShopState, StoragePoller};
use tokio::sync::broadcast::error::TryRecvError;
use tracing::{info, warn};

use crate::error::CliError;

/// Run until Ctrl-C.
///
/// # Errors
///
/// Returns [`CliError::Io`] if the Ctrl-C handler cannot be installed.
pub async fn run(
    mut state: ShopState<FileStorage>,
    storage: FileStorage,
    config: &EngineConfig,
) -> Result<(), CliError> {
    let keys = [state.cart().key().clone(), state.favorites().key().clone()];
    let dir = storage.root().display().to_string();
    let mut poller = StoragePoller::new(storage, keys);
    let mut cart_changes = state.cart().subscribe();
    let mut favorite_changes = state.favorites().subscribe();

    info!(
        origin = %config.origin,
        dir = %dir,
        interval_ms = config.poll_interval.as_millis(),
        cart = state.cart().count(),
        favorites = state.favorites().count(),
        "Watching for changes (Ctrl-C to stop)"
    );

    let mut interval = tokio::time::interval(config.poll_interval);
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                for event in poller.poll() {
                    state.apply_storage_event(&event);
                }
                if drain(&mut cart_changes) {
                    let subtotal = Price::new(state.cart().subtotal(), CurrencyCode::default());
                    info!(
                        count = state.cart().count(),
                        subtotal = %subtotal.display(),
                        "Cart changed"
                    );
                }
                if drain(&mut favorite_changes) {
                    info!(count = state.favorites().count(), "Favorites changed");
                }
            }
            result = &mut shutdown => {
                result?;
                info!("Stopped watching");
                return Ok(());
            }
        }
    }
}

/// Consume pending notifications; `true` if there was at least one.
fn drain<T: Clone>(receiver: &mut tokio::sync::broadcast::Receiver<T>) -> bool {
    let mut changed = false;
    loop {
        match receiver.try_recv() {
            Ok(_) => changed = true,
            Err(TryRecvError::Lagged(skipped)) => {
                warn!(skipped, "Change notifications dropped");
                changed = true;
            }
            Err(TryRecvError::Empty | TryRecvError::Closed) => return changed,
        }
    }
}
