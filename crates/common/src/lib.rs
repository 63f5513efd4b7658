//! Shared wire types for the machine fleet console.
//!
//! Keep DTOs exchanged with the monitoring server here so the transport,
//! the controller, and the tests agree on a single shape.

#![warn(missing_docs)]

/// Shared API DTOs for cross-crate use.
pub mod api;
