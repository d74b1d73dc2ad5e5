//! Routing of inbound client frames.
//!
//! A frame that cannot be processed gets an `error` frame back on the same
//! connection; the connection itself stays open.

use pedidos_core::protocol::{error_codes, ClientMessage, ServerMessage};

use crate::locks::{Broadcaster, LockCoordinator, LockRequest};

/// Parse, check, and execute one text frame from `conn_id`.
pub async fn handle_client_frame(
    broadcaster: &Broadcaster,
    coordinator: &LockCoordinator,
    conn_id: &str,
    text: &str,
) {
    let message = match ClientMessage::parse(text) {
        Ok(message) => message,
        Err(e) => {
            tracing::debug!(conn_id = %conn_id, error = %e, "Unparsable client frame");
            reject(broadcaster, conn_id, error_codes::INVALID_MESSAGE, e.to_string()).await;
            return;
        }
    };

    if let Err(msg) = message.validate() {
        reject(broadcaster, conn_id, error_codes::VALIDATION_ERROR, msg).await;
        return;
    }

    if let ClientMessage::Authenticate {
        user_id,
        display_name,
    } = &message
    {
        if broadcaster
            .ws_manager()
            .authenticate(conn_id, user_id.clone(), display_name.clone())
            .await
        {
            tracing::info!(conn_id = %conn_id, user_id = %user_id, "WebSocket authenticated");
            broadcaster.broadcast_users_list().await;
        }
        return;
    }

    if let Some(claimed) = message.user_id() {
        match broadcaster.ws_manager().identity(conn_id).await {
            None => {
                reject(
                    broadcaster,
                    conn_id,
                    error_codes::UNAUTHENTICATED,
                    "Authenticate before sending lock frames",
                )
                .await;
                return;
            }
            Some(identity) if identity.user_id != claimed => {
                tracing::warn!(
                    conn_id = %conn_id,
                    user_id = %identity.user_id,
                    claimed = %claimed,
                    "Frame claims a different identity"
                );
                reject(
                    broadcaster,
                    conn_id,
                    error_codes::IDENTITY_MISMATCH,
                    "userId does not match the authenticated identity",
                )
                .await;
                return;
            }
            Some(_) => {}
        }
    }

    let result = match message {
        ClientMessage::RequestLock {
            resource_kind,
            resource_id,
            user_id,
            display_name,
        } => coordinator
            .request_lock(LockRequest {
                resource_kind,
                resource_id,
                user_id,
                display_name,
                connection_id: conn_id.to_string(),
            })
            .await
            .map(|_| ()),
        ClientMessage::ReleaseLock {
            resource_kind,
            resource_id,
            user_id,
        } => coordinator
            .release_lock(&resource_kind, &resource_id, &user_id)
            .await
            .map(|_| ()),
        ClientMessage::Heartbeat {
            resource_kind,
            resource_id,
            user_id,
        } => coordinator
            .heartbeat(&resource_kind, &resource_id, &user_id)
            .await
            .map(|_| ()),
        ClientMessage::GetLocks { resource_kind } => coordinator
            .send_snapshot(&resource_kind, conn_id)
            .await
            .map(|_| ()),
        ClientMessage::Authenticate { .. } => Ok(()),
    };

    if let Err(e) = result {
        tracing::error!(conn_id = %conn_id, error = %e, "Lock command failed");
        reject(
            broadcaster,
            conn_id,
            error_codes::INTERNAL_ERROR,
            "Lock service is unavailable",
        )
        .await;
    }
}

async fn reject(broadcaster: &Broadcaster, conn_id: &str, code: &str, message: impl Into<String>) {
    broadcaster
        .send_to(conn_id, &ServerMessage::error(code, message))
        .await;
}
