use std::sync::Arc;

use axum::extract::ws::Message;
use pedidos_core::locking::ReleaseReason;
use pedidos_core::protocol::{Lock, ServerMessage};

use crate::ws::WsManager;

/// Serializes server frames and queues them on connection channels.
#[derive(Clone)]
pub struct Broadcaster {
    ws_manager: Arc<WsManager>,
}

impl Broadcaster {
    pub fn new(ws_manager: Arc<WsManager>) -> Self {
        Self { ws_manager }
    }

    /// The connection registry frames are queued on.
    pub fn ws_manager(&self) -> &Arc<WsManager> {
        &self.ws_manager
    }

    /// Send one frame to one connection.
    pub async fn send_to(&self, conn_id: &str, message: &ServerMessage) -> bool {
        match encode(message) {
            Some(frame) => self.ws_manager.send_to(conn_id, frame).await,
            None => false,
        }
    }

    /// Announce `lock` to every connection except the one that took it.
    pub async fn broadcast_locked(&self, lock: &Lock) {
        if let Some(frame) = encode(&lock.locked_message()) {
            self.ws_manager
                .broadcast_except(&lock.connection_id, frame)
                .await;
        }
    }

    /// Announce a release to every connection, the releaser included.
    pub async fn broadcast_unlocked(&self, lock: &Lock, reason: ReleaseReason) {
        let message = ServerMessage::ResourceUnlocked {
            resource_kind: lock.resource_kind.clone(),
            resource_id: lock.resource_id.clone(),
            reason,
        };
        if let Some(frame) = encode(&message) {
            self.ws_manager.broadcast(frame).await;
        }
    }

    /// Send the full lock list of one kind to one connection.
    pub async fn send_snapshot(&self, conn_id: &str, resource_kind: &str, locks: Vec<Lock>) -> bool {
        let message = ServerMessage::LocksSnapshot {
            resource_kind: resource_kind.to_string(),
            locks,
        };
        self.send_to(conn_id, &message).await
    }

    /// Push the current authenticated user list to everyone.
    pub async fn broadcast_users_list(&self) {
        let message = ServerMessage::UsersList {
            connected_users: self.ws_manager.connected_users().await,
        };
        if let Some(frame) = encode(&message) {
            self.ws_manager.broadcast(frame).await;
        }
    }
}

fn encode(message: &ServerMessage) -> Option<Message> {
    match message.to_json() {
        Ok(json) => Some(Message::Text(json.into())),
        Err(e) => {
            tracing::error!(error = %e, "Failed to serialize server frame");
            None
        }
    }
}
