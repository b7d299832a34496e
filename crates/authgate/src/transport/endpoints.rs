//! Wire types of the backend's session endpoints.

use serde::{Deserialize, Serialize};

use crate::auth::{AccessToken, Identity, UserId};

/// Request body for the sign-in endpoint.
#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

/// Identity payload returned by sign-in and refresh.
///
/// `uid` may be a number or a string. `access_token` is only sent by
/// backends that use bearer tokens instead of cookies.
#[derive(Debug, Deserialize)]
pub struct IdentityResponse {
    pub uid: UserId,
    pub email: String,
    #[serde(default)]
    pub access_token: Option<String>,
}

impl IdentityResponse {
    /// Split into the identity and the optional bearer credential.
    pub fn into_parts(self) -> (Identity, Option<AccessToken>) {
        (
            Identity::new(self.uid, self.email),
            self.access_token.map(AccessToken::new),
        )
    }
}

/// Error body returned by the backend.
#[derive(Debug, Default, Deserialize)]
pub struct ErrorResponse {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}
