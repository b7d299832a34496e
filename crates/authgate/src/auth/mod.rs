//! Authentication primitives: who the user is and what proves it.
//!
//! An [`Identity`] is what the server says about the user. An
//! [`AccessToken`] is the optional bearer credential that proves it on each
//! request. [`Credentials`] are only used to sign in.

mod credentials;
mod identity;
mod tokens;

pub use credentials::Credentials;
pub use identity::{Identity, UserId};
pub use tokens::AccessToken;
