//! View routing and the navigation guard.
//!
//! Rendering views is someone else's job; this module only decides where the
//! user is allowed to go and tells a [`Navigator`] about it.

mod guard;
mod navigator;
mod reason;
mod routes;

pub use guard::{GuardDecision, NavigationGuard, Router};
pub use navigator::{Navigation, NavigationLog, Navigator};
pub use reason::LoginReason;
pub use routes::{RouteTable, View};
