//! Single-writer actor owning the [`LockTable`].
//!
//! Handlers talk to the actor through a cloneable [`LockCoordinator`]
//! handle. Commands are processed one at a time, and the frames each
//! command produces are queued on connection channels before the next
//! command starts. That gives every client the same order of
//! accept/release decisions for a given record.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use pedidos_core::lock_table::{LockOutcome, LockTable, StaleLock};
use pedidos_core::locking::{LockConfig, ReleaseReason};
use pedidos_core::protocol::{Lock, ServerMessage};
use pedidos_core::types::{ConnectionId, Timestamp, UserId};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::locks::Broadcaster;
use crate::ws::WsManager;

/// Depth of the command queue in front of the actor.
const COMMAND_BUFFER: usize = 1024;

/// Failure to reach the coordinator actor.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CoordinatorError {
    /// The actor task has exited.
    #[error("Lock coordinator has stopped")]
    Stopped,
}

/// A lock request as received from a connection.
#[derive(Debug, Clone)]
pub struct LockRequest {
    pub resource_kind: String,
    pub resource_id: String,
    pub user_id: UserId,
    pub display_name: String,
    pub connection_id: ConnectionId,
}

#[derive(Debug)]
enum LockCommand {
    Request {
        request: LockRequest,
        reply: oneshot::Sender<LockOutcome>,
    },
    Heartbeat {
        resource_kind: String,
        resource_id: String,
        user_id: UserId,
        reply: oneshot::Sender<bool>,
    },
    Release {
        resource_kind: String,
        resource_id: String,
        user_id: UserId,
        reply: oneshot::Sender<Option<Lock>>,
    },
    Snapshot {
        resource_kind: String,
        reply: oneshot::Sender<Vec<Lock>>,
    },
    SendSnapshot {
        resource_kind: String,
        connection_id: ConnectionId,
        reply: oneshot::Sender<bool>,
    },
    Get {
        resource_kind: String,
        resource_id: String,
        reply: oneshot::Sender<Option<Lock>>,
    },
    Sweep {
        now: Timestamp,
        reply: oneshot::Sender<Vec<StaleLock>>,
    },
    Count {
        reply: oneshot::Sender<usize>,
    },
    Shutdown,
}

/// Cloneable handle to the coordinator actor.
#[derive(Clone)]
pub struct LockCoordinator {
    tx: mpsc::Sender<LockCommand>,
}

impl LockCoordinator {
    /// Spawn the actor. It runs until [`shutdown`](Self::shutdown) is
    /// called or every handle is dropped.
    pub fn start(ws_manager: Arc<WsManager>, config: LockConfig) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(COMMAND_BUFFER);
        let actor = CoordinatorActor {
            table: LockTable::new(),
            broadcaster: Broadcaster::new(Arc::clone(&ws_manager)),
            ws_manager,
            config,
        };
        let handle = tokio::spawn(actor.run(rx));
        (Self { tx }, handle)
    }

    /// Try to take a lock. Accepted and denied are both normal outcomes.
    pub async fn request_lock(&self, request: LockRequest) -> Result<LockOutcome, CoordinatorError> {
        self.call(|reply| LockCommand::Request { request, reply }).await
    }

    /// Refresh the activity clock. `false` if `user_id` does not hold the lock.
    pub async fn heartbeat(
        &self,
        resource_kind: &str,
        resource_id: &str,
        user_id: &str,
    ) -> Result<bool, CoordinatorError> {
        self.call(|reply| LockCommand::Heartbeat {
            resource_kind: resource_kind.to_string(),
            resource_id: resource_id.to_string(),
            user_id: user_id.to_string(),
            reply,
        })
        .await
    }

    /// Manually release a lock. A non-holder gets `None` and nothing is broadcast.
    pub async fn release_lock(
        &self,
        resource_kind: &str,
        resource_id: &str,
        user_id: &str,
    ) -> Result<Option<Lock>, CoordinatorError> {
        self.call(|reply| LockCommand::Release {
            resource_kind: resource_kind.to_string(),
            resource_id: resource_id.to_string(),
            user_id: user_id.to_string(),
            reply,
        })
        .await
    }

    /// Every lock of one kind, oldest first.
    pub async fn snapshot(&self, resource_kind: &str) -> Result<Vec<Lock>, CoordinatorError> {
        self.call(|reply| LockCommand::Snapshot {
            resource_kind: resource_kind.to_string(),
            reply,
        })
        .await
    }

    /// Queue a `locks-snapshot` frame on one connection, in order with broadcasts.
    pub async fn send_snapshot(
        &self,
        resource_kind: &str,
        connection_id: &str,
    ) -> Result<bool, CoordinatorError> {
        self.call(|reply| LockCommand::SendSnapshot {
            resource_kind: resource_kind.to_string(),
            connection_id: connection_id.to_string(),
            reply,
        })
        .await
    }

    pub async fn get(
        &self,
        resource_kind: &str,
        resource_id: &str,
    ) -> Result<Option<Lock>, CoordinatorError> {
        self.call(|reply| LockCommand::Get {
            resource_kind: resource_kind.to_string(),
            resource_id: resource_id.to_string(),
            reply,
        })
        .await
    }

    /// Evict every lock that is stale at `now` and return what was evicted.
    pub async fn sweep(&self, now: Timestamp) -> Result<Vec<StaleLock>, CoordinatorError> {
        self.call(|reply| LockCommand::Sweep { now, reply }).await
    }

    /// Number of locks across all kinds.
    pub async fn lock_count(&self) -> Result<usize, CoordinatorError> {
        self.call(|reply| LockCommand::Count { reply }).await
    }

    /// Ask the actor to exit after the commands already queued.
    pub async fn shutdown(&self) {
        let _ = self.tx.send(LockCommand::Shutdown).await;
    }

    async fn call<T, F>(&self, make: F) -> Result<T, CoordinatorError>
    where
        F: FnOnce(oneshot::Sender<T>) -> LockCommand,
    {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(make(reply))
            .await
            .map_err(|_| CoordinatorError::Stopped)?;
        rx.await.map_err(|_| CoordinatorError::Stopped)
    }
}

struct CoordinatorActor {
    table: LockTable,
    broadcaster: Broadcaster,
    ws_manager: Arc<WsManager>,
    config: LockConfig,
}

impl CoordinatorActor {
    async fn run(mut self, mut rx: mpsc::Receiver<LockCommand>) {
        tracing::info!(
            inactivity_threshold_secs = self.config.inactivity_threshold.as_secs(),
            "Lock coordinator started"
        );
        while let Some(cmd) = rx.recv().await {
            match cmd {
                LockCommand::Request { request, reply } => {
                    let outcome = self.request(request).await;
                    let _ = reply.send(outcome);
                }
                LockCommand::Heartbeat {
                    resource_kind,
                    resource_id,
                    user_id,
                    reply,
                } => {
                    let refreshed =
                        self.table
                            .heartbeat(&resource_kind, &resource_id, &user_id, Utc::now());
                    if !refreshed {
                        tracing::debug!(
                            %resource_kind,
                            %resource_id,
                            %user_id,
                            "Heartbeat from non-holder ignored"
                        );
                    }
                    let _ = reply.send(refreshed);
                }
                LockCommand::Release {
                    resource_kind,
                    resource_id,
                    user_id,
                    reply,
                } => {
                    let released = self.table.release(&resource_kind, &resource_id, &user_id);
                    if let Some(lock) = &released {
                        self.announce_release(lock, ReleaseReason::Manual).await;
                    }
                    let _ = reply.send(released);
                }
                LockCommand::Snapshot {
                    resource_kind,
                    reply,
                } => {
                    let _ = reply.send(self.table.snapshot(&resource_kind));
                }
                LockCommand::SendSnapshot {
                    resource_kind,
                    connection_id,
                    reply,
                } => {
                    let locks = self.table.snapshot(&resource_kind);
                    let sent = self
                        .broadcaster
                        .send_snapshot(&connection_id, &resource_kind, locks)
                        .await;
                    let _ = reply.send(sent);
                }
                LockCommand::Get {
                    resource_kind,
                    resource_id,
                    reply,
                } => {
                    let _ = reply.send(self.table.get(&resource_kind, &resource_id).cloned());
                }
                LockCommand::Sweep { now, reply } => {
                    let evicted = self.sweep(now).await;
                    let _ = reply.send(evicted);
                }
                LockCommand::Count { reply } => {
                    let _ = reply.send(self.table.len());
                }
                LockCommand::Shutdown => break,
            }
        }
        tracing::info!(remaining = self.table.len(), "Lock coordinator stopped");
    }

    async fn request(&mut self, request: LockRequest) -> LockOutcome {
        let outcome = self.table.request(
            &request.resource_kind,
            &request.resource_id,
            &request.user_id,
            &request.display_name,
            &request.connection_id,
            Utc::now(),
        );

        match &outcome {
            LockOutcome::Accepted { lock, reacquired } => {
                tracing::info!(
                    resource_kind = %lock.resource_kind,
                    resource_id = %lock.resource_id,
                    user_id = %lock.holder_user_id,
                    conn_id = %lock.connection_id,
                    reacquired,
                    "Lock accepted"
                );
                let accepted = ServerMessage::LockAccepted {
                    resource_kind: lock.resource_kind.clone(),
                    resource_id: lock.resource_id.clone(),
                    user_id: lock.holder_user_id.clone(),
                    display_name: lock.holder_display_name.clone(),
                    acquired_at: lock.acquired_at,
                };
                self.broadcaster
                    .send_to(&request.connection_id, &accepted)
                    .await;
                self.broadcaster.broadcast_locked(lock).await;
            }
            LockOutcome::Denied { holder } => {
                tracing::debug!(
                    resource_kind = %request.resource_kind,
                    resource_id = %request.resource_id,
                    user_id = %request.user_id,
                    holder = %holder.user_id,
                    "Lock denied"
                );
                let denied = ServerMessage::LockDenied {
                    resource_kind: request.resource_kind.clone(),
                    resource_id: request.resource_id.clone(),
                    current_holder: holder.clone(),
                };
                self.broadcaster
                    .send_to(&request.connection_id, &denied)
                    .await;
            }
        }
        outcome
    }

    async fn sweep(&mut self, now: Timestamp) -> Vec<StaleLock> {
        let live: HashSet<ConnectionId> = self.ws_manager.live_ids().await;
        let stale = self
            .table
            .find_stale(now, self.config.inactivity_threshold, |conn_id| {
                live.contains(conn_id)
            });

        let mut evicted = Vec::with_capacity(stale.len());
        for entry in stale {
            if let Some(lock) = self.table.evict(&entry.key) {
                self.announce_release(&lock, entry.reason).await;
                evicted.push(entry);
            }
        }
        evicted
    }

    async fn announce_release(&self, lock: &Lock, reason: ReleaseReason) {
        tracing::info!(
            resource_kind = %lock.resource_kind,
            resource_id = %lock.resource_id,
            user_id = %lock.holder_user_id,
            %reason,
            "Lock released"
        );
        self.broadcaster.broadcast_unlocked(lock, reason).await;
    }
}
