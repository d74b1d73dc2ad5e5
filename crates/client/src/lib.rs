//! Native client for the edit-lock channel.
//!
//! [`client::LockClient`] opens connections, [`reconnect`] retries them with
//! exponential backoff, and [`runtime`] drives a
//! [`LockSession`](pedidos_core::session::LockSession) over a live socket.

pub mod client;
pub mod reconnect;
pub mod runtime;

pub use client::{ClientConfig, ClientError, LockClient, LockConnection};
pub use runtime::{spawn_session, SessionEvent, SessionHandle};
