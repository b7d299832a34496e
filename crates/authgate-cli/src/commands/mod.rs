//! Command implementations.

pub mod api;
pub mod session;
pub mod visit;
