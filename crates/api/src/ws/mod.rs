//! WebSocket infrastructure for the lock channel.
//!
//! Provides connection management, inbound frame dispatch, the keep-alive
//! ping task, and the HTTP upgrade handler used by Axum routes.

mod dispatch;
mod handler;
pub mod manager;
mod ping;

pub use dispatch::handle_client_frame;
pub use handler::ws_handler;
pub use manager::WsManager;
pub use ping::start_ping;
