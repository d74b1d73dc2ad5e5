use std::collections::{HashMap, HashSet};

use axum::body::Bytes;
use axum::extract::ws::Message;
use pedidos_core::protocol::ConnectedUser;
use pedidos_core::types::{ConnectionId, Timestamp, UserId};
use tokio::sync::{mpsc, RwLock};

/// Channel sender half for pushing messages to a WebSocket connection.
pub type WsSender = mpsc::UnboundedSender<Message>;

/// Identity attached to a connection by its `authenticate` frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionIdentity {
    pub user_id: UserId,
    pub display_name: String,
}

/// Metadata for a single WebSocket connection.
pub struct WsConnection {
    /// Set once the client authenticates; `None` until then.
    pub identity: Option<ConnectionIdentity>,
    /// Channel sender for outbound messages to this connection.
    pub sender: WsSender,
    /// When this connection was established.
    pub connected_at: Timestamp,
}

/// Registry of all live WebSocket connections.
///
/// Written only on connect, authenticate, and disconnect. Every outbound
/// frame goes through a per-connection unbounded channel, so sends never
/// block and frames reach each client in the order they were queued.
pub struct WsManager {
    connections: RwLock<HashMap<ConnectionId, WsConnection>>,
}

impl WsManager {
    /// Create a new, empty connection manager.
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
        }
    }

    /// Register a new, not yet authenticated connection.
    ///
    /// Returns the receiver half of the message channel so the caller can
    /// forward messages to the WebSocket sink.
    pub async fn add(&self, conn_id: ConnectionId) -> mpsc::UnboundedReceiver<Message> {
        let (tx, rx) = mpsc::unbounded_channel();
        let conn = WsConnection {
            identity: None,
            sender: tx,
            connected_at: chrono::Utc::now(),
        };
        self.connections.write().await.insert(conn_id, conn);
        rx
    }

    /// Attach an identity to a registered connection.
    ///
    /// Returns `false` if the connection is unknown.
    pub async fn authenticate(&self, conn_id: &str, user_id: UserId, display_name: String) -> bool {
        match self.connections.write().await.get_mut(conn_id) {
            Some(conn) => {
                conn.identity = Some(ConnectionIdentity {
                    user_id,
                    display_name,
                });
                true
            }
            None => false,
        }
    }

    /// Identity of a connection, if it is registered and authenticated.
    pub async fn identity(&self, conn_id: &str) -> Option<ConnectionIdentity> {
        self.connections
            .read()
            .await
            .get(conn_id)
            .and_then(|conn| conn.identity.clone())
    }

    /// Remove a connection by its ID, returning its identity if it had one.
    pub async fn remove(&self, conn_id: &str) -> Option<ConnectionIdentity> {
        self.connections
            .write()
            .await
            .remove(conn_id)
            .and_then(|conn| conn.identity)
    }

    /// Whether a connection is still registered.
    pub async fn is_live(&self, conn_id: &str) -> bool {
        self.connections.read().await.contains_key(conn_id)
    }

    /// IDs of every registered connection.
    pub async fn live_ids(&self) -> HashSet<ConnectionId> {
        self.connections.read().await.keys().cloned().collect()
    }

    /// Authenticated users, one entry per user id (earliest connection),
    /// ordered by connection time.
    pub async fn connected_users(&self) -> Vec<ConnectedUser> {
        let conns = self.connections.read().await;
        let mut by_user: HashMap<&str, ConnectedUser> = HashMap::new();
        for conn in conns.values() {
            let Some(identity) = &conn.identity else {
                continue;
            };
            let entry = by_user
                .entry(identity.user_id.as_str())
                .or_insert_with(|| ConnectedUser {
                    user_id: identity.user_id.clone(),
                    display_name: identity.display_name.clone(),
                    connected_at: conn.connected_at,
                });
            if conn.connected_at < entry.connected_at {
                entry.connected_at = conn.connected_at;
            }
        }
        let mut users: Vec<ConnectedUser> = by_user.into_values().collect();
        users.sort_by(|a, b| {
            a.connected_at
                .cmp(&b.connected_at)
                .then_with(|| a.user_id.cmp(&b.user_id))
        });
        users
    }

    /// Send a message to a single connection.
    ///
    /// Returns `false` if the connection is unknown or its channel closed.
    pub async fn send_to(&self, conn_id: &str, message: Message) -> bool {
        match self.connections.read().await.get(conn_id) {
            Some(conn) => conn.sender.send(message).is_ok(),
            None => false,
        }
    }

    /// Broadcast a message to all connected clients.
    ///
    /// Connections whose send channels are closed are silently skipped
    /// (they will be cleaned up on their next receive loop iteration).
    pub async fn broadcast(&self, message: Message) {
        let conns = self.connections.read().await;
        for conn in conns.values() {
            let _ = conn.sender.send(message.clone());
        }
    }

    /// Broadcast a message to every connection except `excluded`.
    pub async fn broadcast_except(&self, excluded: &str, message: Message) {
        let conns = self.connections.read().await;
        for (id, conn) in conns.iter() {
            if id != excluded {
                let _ = conn.sender.send(message.clone());
            }
        }
    }

    /// Return the current number of active connections.
    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }

    /// Send a Close frame to every connection, then clear the map.
    ///
    /// Used during graceful shutdown to notify all clients before the
    /// server stops accepting new connections.
    pub async fn shutdown_all(&self) {
        let mut conns = self.connections.write().await;
        let count = conns.len();
        for conn in conns.values() {
            let _ = conn.sender.send(Message::Close(None));
        }
        conns.clear();
        tracing::info!(count, "Closed all WebSocket connections");
    }

    /// Send a Ping frame to every connected client.
    pub async fn ping_all(&self) {
        let conns = self.connections.read().await;
        for conn in conns.values() {
            let _ = conn.sender.send(Message::Ping(Bytes::new()));
        }
    }
}

impl Default for WsManager {
    fn default() -> Self {
        Self::new()
    }
}
