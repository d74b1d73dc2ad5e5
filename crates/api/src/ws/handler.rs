use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use pedidos_core::protocol::{error_codes, ServerMessage};

use crate::locks::{Broadcaster, LockCoordinator};
use crate::state::AppState;
use crate::ws::dispatch::handle_client_frame;

/// HTTP handler that upgrades the connection to WebSocket.
///
/// After the upgrade the connection is registered with `WsManager` and
/// managed by two tasks (sender + receiver).
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    let broadcaster = Broadcaster::new(state.ws_manager);
    ws.on_upgrade(move |socket| handle_socket(socket, broadcaster, state.coordinator))
}

/// Manage a single WebSocket connection after upgrade.
///
/// Splits the socket into a sink (outbound) and stream (inbound), then:
///   1. Registers the connection with `WsManager`.
///   2. Spawns a sender task that forwards messages from the manager channel.
///   3. Dispatches inbound text frames on the current task.
///   4. Cleans up on disconnect.
///
/// Locks held by the connection are left in place on disconnect; the
/// eviction sweep releases them with reason `disconnect`.
async fn handle_socket(socket: WebSocket, broadcaster: Broadcaster, coordinator: LockCoordinator) {
    let conn_id = uuid::Uuid::new_v4().to_string();
    tracing::info!(conn_id = %conn_id, "WebSocket connected");

    let ws_manager = std::sync::Arc::clone(broadcaster.ws_manager());
    let mut rx = ws_manager.add(conn_id.clone()).await;

    let (mut sink, mut stream) = socket.split();

    // Sender task: forward channel messages to the WebSocket sink.
    let sender_conn_id = conn_id.clone();
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let closing = matches!(msg, Message::Close(_));
            if sink.send(msg).await.is_err() {
                tracing::debug!(conn_id = %sender_conn_id, "WebSocket sink closed");
                break;
            }
            if closing {
                break;
            }
        }
    });

    while let Some(result) = stream.next().await {
        match result {
            Ok(Message::Text(text)) => {
                handle_client_frame(&broadcaster, &coordinator, &conn_id, text.as_str()).await;
            }
            Ok(Message::Binary(_)) => {
                broadcaster
                    .send_to(
                        &conn_id,
                        &ServerMessage::error(
                            error_codes::INVALID_MESSAGE,
                            "Binary frames are not supported",
                        ),
                    )
                    .await;
            }
            Ok(Message::Close(_)) => break,
            Ok(Message::Pong(_)) => {
                tracing::trace!(conn_id = %conn_id, "Pong received");
            }
            Ok(Message::Ping(_)) => {}
            Err(e) => {
                tracing::debug!(conn_id = %conn_id, error = %e, "WebSocket receive error");
                break;
            }
        }
    }

    let identity = ws_manager.remove(&conn_id).await;
    send_task.abort();
    if identity.is_some() {
        broadcaster.broadcast_users_list().await;
    }
    tracing::info!(
        conn_id = %conn_id,
        user_id = identity.as_ref().map(|i| i.user_id.as_str()),
        "WebSocket disconnected"
    );
}
