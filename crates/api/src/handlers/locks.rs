//! Read-only lock queries over HTTP.
//!
//! Lock mutation happens only over the WebSocket channel; these endpoints
//! serve pages that render before the channel is up.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use pedidos_core::locking::{is_valid_resource_kind, validate_resource_ref};

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/locks/{resource_kind}
///
/// Every current lock of one kind, oldest first.
pub async fn list_locks(
    State(state): State<AppState>,
    Path(resource_kind): Path<String>,
) -> AppResult<impl IntoResponse> {
    if !is_valid_resource_kind(&resource_kind) {
        return Err(AppError::BadRequest(format!(
            "Invalid resourceKind '{resource_kind}'"
        )));
    }
    let locks = state.coordinator.snapshot(&resource_kind).await?;
    Ok(Json(DataResponse { data: locks }))
}

/// GET /api/v1/locks/{resource_kind}/{resource_id}
///
/// The lock on one record, or `null` if it is free.
pub async fn get_lock(
    State(state): State<AppState>,
    Path((resource_kind, resource_id)): Path<(String, String)>,
) -> AppResult<impl IntoResponse> {
    validate_resource_ref(&resource_kind, &resource_id).map_err(AppError::BadRequest)?;
    let lock = state.coordinator.get(&resource_kind, &resource_id).await?;
    Ok(Json(DataResponse { data: lock }))
}
