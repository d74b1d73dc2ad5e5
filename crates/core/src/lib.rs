//! Domain types for collaborative edit locks.
//!
//! Zero internal dependencies: the server, the client runtime, and tests all
//! share these types.
//!
//! - [`lock_table`]: the authoritative in-memory lock map.
//! - [`session`]: the per-view client state machine.
//! - [`observer`]: the read-only per-kind lock view.
//! - [`protocol`]: wire frames.

pub mod error;
pub mod lock_table;
pub mod locking;
pub mod observer;
pub mod protocol;
pub mod session;
pub mod types;
