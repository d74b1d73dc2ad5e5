use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::ws::manager::WsManager;

/// Spawn a task that sends Ping frames to every connected client so
/// intermediaries keep idle sockets open and dead peers surface as errors.
///
/// Runs until `cancel` is triggered.
pub fn start_ping(
    ws_manager: Arc<WsManager>,
    interval: Duration,
    cancel: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::debug!("WebSocket ping task stopping");
                    break;
                }
                _ = ticker.tick() => {
                    let count = ws_manager.connection_count().await;
                    tracing::debug!(count, "WebSocket ping");
                    ws_manager.ping_all().await;
                }
            }
        }
    })
}
