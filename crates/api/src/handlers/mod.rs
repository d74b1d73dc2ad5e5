//! Request handlers for the REST surface.
//!
//! Handlers delegate to the lock coordinator and map errors via
//! [`AppError`](crate::error::AppError).

pub mod locks;
