//! Pre-send hook adding the current credential to a request.

use std::sync::Arc;

use reqwest::header::{AUTHORIZATION, HeaderValue};
use tracing::{trace, warn};

use crate::auth::AccessToken;
use crate::session::SessionStore;
use crate::transport::ApiRequest;

/// Adds the session's bearer credential to outgoing requests.
///
/// When the session has no bearer token (cookie-managed credentials, or
/// logged out) the request passes through unchanged. An `Authorization`
/// header set by the caller is never overridden.
#[derive(Debug, Clone)]
pub struct CredentialAttacher {
    store: Arc<SessionStore>,
}

impl CredentialAttacher {
    /// Create an attacher reading the given session.
    pub fn new(store: Arc<SessionStore>) -> Self {
        Self { store }
    }

    /// Attach the current credential, if any.
    pub fn attach(&self, request: ApiRequest) -> ApiRequest {
        Self::with_credential(request, self.store.credential().as_ref())
    }

    /// Attach the current credential and report the session epoch it was
    /// read at.
    pub(crate) fn attach_at_epoch(&self, request: ApiRequest) -> (ApiRequest, u64) {
        let (credential, epoch) = self.store.credential_at_epoch();
        (Self::with_credential(request, credential.as_ref()), epoch)
    }

    /// Attach `credential` to `request`.
    pub fn with_credential(mut request: ApiRequest, credential: Option<&AccessToken>) -> ApiRequest {
        let Some(token) = credential else {
            return request;
        };
        if request.headers().contains_key(AUTHORIZATION) {
            trace!(id = %request.id(), "Caller supplied Authorization, leaving it");
            return request;
        }
        match HeaderValue::from_str(&token.bearer()) {
            Ok(mut value) => {
                value.set_sensitive(true);
                request.headers_mut().insert(AUTHORIZATION, value);
            }
            Err(_) => warn!(id = %request.id(), "Credential is not a valid header value, sending without it"),
        }
        request
    }
}
