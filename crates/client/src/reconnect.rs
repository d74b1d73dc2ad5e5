//! Exponential-backoff reconnection to the lock server.
//!
//! When the channel drops, the session runtime calls [`reconnect_loop`]
//! to keep retrying with increasing delays until the connection is
//! restored or the [`CancellationToken`] is triggered.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::client::{LockClient, LockConnection};

/// Tunable parameters for the backoff strategy.
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Delay before the first reconnection attempt.
    pub initial_delay: Duration,
    /// Upper bound on the delay between attempts.
    pub max_delay: Duration,
    /// Factor by which the delay grows after each failure.
    pub multiplier: f64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
        }
    }
}

/// The delay after `current`, clamped to [`ReconnectConfig::max_delay`].
pub fn next_delay(current: Duration, config: &ReconnectConfig) -> Duration {
    let next_ms = (current.as_millis() as f64 * config.multiplier) as u64;
    Duration::from_millis(next_ms).min(config.max_delay)
}

/// Wait, then try to connect, growing the wait after each failure.
///
/// Returns `Some(connection)` once a connection succeeds, or `None` if
/// `cancel` fires first.
pub async fn reconnect_loop(
    client: &LockClient,
    config: &ReconnectConfig,
    cancel: &CancellationToken,
) -> Option<LockConnection> {
    let mut delay = config.initial_delay;
    let mut attempt = 0u32;
    let user_id = client.identity().user_id.as_str();

    loop {
        tokio::select! {
            _ = cancel.cancelled() => return None,
            _ = tokio::time::sleep(delay) => {}
        }

        attempt += 1;
        tracing::info!(
            user_id,
            attempt,
            delay_ms = delay.as_millis() as u64,
            "Reconnecting to lock server",
        );

        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!(user_id, "Reconnect cancelled");
                return None;
            }
            result = client.connect() => {
                match result {
                    Ok(conn) => {
                        tracing::info!(user_id, attempt, "Reconnected to lock server");
                        return Some(conn);
                    }
                    Err(e) => {
                        tracing::warn!(user_id, error = %e, "Reconnect attempt {attempt} failed");
                    }
                }
            }
        }

        delay = next_delay(delay, config);
    }
}
