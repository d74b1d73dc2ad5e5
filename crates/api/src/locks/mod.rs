//! Authoritative lock state and its fan-out.
//!
//! [`LockCoordinator`] is the only writer of the lock table; every change
//! it makes is pushed to clients through the [`Broadcaster`] before the
//! next command is processed.

mod broadcast;
mod coordinator;

pub use broadcast::Broadcaster;
pub use coordinator::{CoordinatorError, LockCoordinator, LockRequest};
