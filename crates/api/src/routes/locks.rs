use axum::routing::get;
use axum::Router;

use crate::handlers::locks;
use crate::state::AppState;

/// Lock query routes mounted at `/locks`.
///
/// ```text
/// GET /{resource_kind}                 -> list_locks
/// GET /{resource_kind}/{resource_id}   -> get_lock
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{resource_kind}", get(locks::list_locks))
        .route("/{resource_kind}/{resource_id}", get(locks::get_lock))
}
