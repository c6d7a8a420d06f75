use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use crate::application::ConnectionRegistry;

/// Spawn a background task that pings every registered connection each
/// `interval`. Connections whose ping fails are unregistered.
///
/// The task stops when `shutdown` flips to `true` or its sender is dropped.
pub fn start_heartbeat(
    registry: Arc<ConnectionRegistry>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        return;
                    }
                }
                _ = ticker.tick() => {
                    let dropped = registry.ping_all().await;
                    let active = registry.stats().await.active_connections;
                    tracing::debug!(active, dropped, "WebSocket heartbeat");
                }
            }
        }
    })
}
