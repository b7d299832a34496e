//! The request/response interception pipeline.
//!
//! Outgoing requests pass through [`CredentialAttacher`]; responses pass
//! through [`AuthResponseHandler`], which owns the refresh-and-replay state
//! machine.

mod attach;
mod response;

pub use attach::CredentialAttacher;
pub use response::{AuthResponseHandler, HandlerState, PendingReplay};
