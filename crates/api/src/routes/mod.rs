pub mod health;
pub mod locks;

use axum::routing::get;
use axum::Router;

use crate::state::AppState;
use crate::ws;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /ws                                  WebSocket lock channel
///
/// /locks/{resource_kind}               snapshot of one kind
/// /locks/{resource_kind}/{resource_id} lock on one record
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/ws", get(ws::ws_handler))
        .nest("/locks", locks::router())
}
