use std::sync::Arc;

use crate::config::ServerConfig;
use crate::locks::LockCoordinator;
use crate::ws::WsManager;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable: everything is behind `Arc` or is a channel handle.
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// WebSocket connection registry.
    pub ws_manager: Arc<WsManager>,
    /// Handle to the single-writer lock coordinator.
    pub coordinator: LockCoordinator,
}
