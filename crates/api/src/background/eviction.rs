//! Periodic eviction of abandoned locks.
//!
//! Every sweep asks the coordinator to drop locks whose connection is gone
//! (reason `disconnect`) or whose holder has not sent a heartbeat within
//! the inactivity threshold (reason `timeout`). The sweep goes through the
//! coordinator queue like any client command, so it never races a request.

use std::time::Duration;

use chrono::Utc;
use pedidos_core::locking::ReleaseReason;
use tokio_util::sync::CancellationToken;

use crate::locks::LockCoordinator;

/// Run the eviction loop until `cancel` is triggered or the coordinator stops.
pub async fn run(coordinator: LockCoordinator, sweep_interval: Duration, cancel: CancellationToken) {
    tracing::info!(
        interval_secs = sweep_interval.as_secs(),
        "Lock eviction job started"
    );

    let mut interval = tokio::time::interval(sweep_interval);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Lock eviction job stopping");
                break;
            }
            _ = interval.tick() => {
                match coordinator.sweep(Utc::now()).await {
                    Ok(evicted) if evicted.is_empty() => {
                        tracing::debug!("Lock eviction: nothing stale");
                    }
                    Ok(evicted) => {
                        let disconnected = evicted
                            .iter()
                            .filter(|entry| entry.reason == ReleaseReason::Disconnect)
                            .count();
                        tracing::info!(
                            evicted = evicted.len(),
                            disconnected,
                            "Lock eviction: released stale locks"
                        );
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Lock eviction: coordinator unavailable");
                        break;
                    }
                }
            }
        }
    }
}
