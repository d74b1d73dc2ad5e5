//! WebSocket client for the lock server.
//!
//! [`LockClient`] holds the connection configuration for one user. Call
//! [`LockClient::connect`] to establish a live, authenticated
//! [`LockConnection`].

use std::time::Duration;

use futures::SinkExt;
use pedidos_core::locking::DEFAULT_HEARTBEAT_INTERVAL_SECS;
use pedidos_core::protocol::ClientMessage;
use pedidos_core::session::Identity;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::reconnect::ReconnectConfig;

/// Raw socket type of a [`LockConnection`].
pub type LockStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// Everything a client needs to reach the server and edit as someone.
pub struct ClientConfig {
    /// Full WebSocket URL, e.g. `ws://host:8080/api/v1/ws`.
    pub ws_url: String,
    pub identity: Identity,
    /// How often a held lock is refreshed. Must match the server's expectation.
    pub heartbeat_interval: Duration,
    pub reconnect: ReconnectConfig,
}

impl ClientConfig {
    /// Config with the default heartbeat period and backoff.
    pub fn new(ws_url: impl Into<String>, identity: Identity) -> Self {
        Self {
            ws_url: ws_url.into(),
            identity,
            heartbeat_interval: Duration::from_secs(DEFAULT_HEARTBEAT_INTERVAL_SECS),
            reconnect: ReconnectConfig::default(),
        }
    }
}

/// Connection factory for one identity.
pub struct LockClient {
    config: ClientConfig,
}

/// A live, authenticated connection to the lock server.
pub struct LockConnection {
    pub ws_stream: LockStream,
}

impl LockClient {
    pub fn new(config: ClientConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn identity(&self) -> &Identity {
        &self.config.identity
    }

    /// Connect and send the `authenticate` frame.
    pub async fn connect(&self) -> Result<LockConnection, ClientError> {
        let (mut ws_stream, _response) = connect_async(self.config.ws_url.as_str())
            .await
            .map_err(|e| {
                ClientError::Connection(format!(
                    "Failed to connect to {}: {e}",
                    self.config.ws_url
                ))
            })?;

        let identity = &self.config.identity;
        let frame = ClientMessage::Authenticate {
            user_id: identity.user_id.clone(),
            display_name: identity.display_name.clone(),
        };
        send_frame(&mut ws_stream, &frame).await?;

        tracing::info!(
            user_id = %identity.user_id,
            "Connected to lock server at {}",
            self.config.ws_url,
        );

        Ok(LockConnection { ws_stream })
    }
}

/// Serialize and send one client frame.
pub(crate) async fn send_frame<S>(sink: &mut S, frame: &ClientMessage) -> Result<(), ClientError>
where
    S: futures::Sink<Message, Error = tokio_tungstenite::tungstenite::Error> + Unpin,
{
    let json = frame
        .to_json()
        .map_err(|e| ClientError::Protocol(e.to_string()))?;
    sink.send(Message::Text(json))
        .await
        .map_err(|_| ClientError::Closed)
}

/// Errors that can occur when working with the lock client.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Failed to establish the WebSocket connection.
    #[error("Connection error: {0}")]
    Connection(String),

    /// A frame could not be encoded or decoded.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The connection or the session runtime is gone.
    #[error("Connection closed")]
    Closed,
}
