//! Post-receive hook: the refresh and replay state machine.

use std::fmt;
use std::sync::Arc;

use reqwest::StatusCode;
use tracing::{debug, info, instrument, warn};

use crate::config::{AuthConfig, StatusClass};
use crate::error::{AuthError, Error, TransportError};
use crate::refresh::{RefreshCoordinator, RefreshState};
use crate::routing::{LoginReason, Navigation, Navigator};
use crate::session::SessionStore;
use crate::transport::{ApiRequest, ApiResponse, Transport};

use super::CredentialAttacher;

/// The original, unattached request kept for a possible replay.
///
/// Also records the session epoch its credential was read at, so a failure
/// that arrives after the session was already renewed can be told apart from
/// a fresh one.
#[derive(Debug, Clone)]
pub struct PendingReplay {
    request: ApiRequest,
    epoch: u64,
}

impl PendingReplay {
    /// Keep `request` for replay. `epoch` is the session epoch at attach time.
    pub fn new(request: ApiRequest, epoch: u64) -> Self {
        Self { request, epoch }
    }

    /// Returns the request as the caller built it.
    pub fn request(&self) -> &ApiRequest {
        &self.request
    }

    /// Returns the session epoch the credential was read at.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Consume the replay, returning the request.
    pub fn into_request(self) -> ApiRequest {
        self.request
    }
}

/// Where the session stands, from the handler's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerState {
    /// A user is logged in and no refresh is running.
    Authenticated,
    /// A refresh is in flight; failing requests wait on it.
    RefreshPending,
    /// Nobody is logged in.
    Unauthenticated,
}

/// Classifies completed requests and drives refresh, replay and forced
/// logout.
///
/// | response class | action |
/// |---|---|
/// | success | returned unchanged |
/// | expired, on the refresh endpoint | logout (`session_expired`), no refresh |
/// | expired, elsewhere | single-flight refresh, then replay |
/// | invalid | logout (`invalid_credentials`), no refresh |
/// | anything else | returned as [`Error::Protocol`] |
#[derive(Clone)]
pub struct AuthResponseHandler {
    config: AuthConfig,
    transport: Arc<dyn Transport>,
    store: Arc<SessionStore>,
    attacher: CredentialAttacher,
    coordinator: RefreshCoordinator,
    navigator: Arc<dyn Navigator>,
}

impl AuthResponseHandler {
    /// Create a handler. `coordinator` must be shared by every handler
    /// talking to the same session.
    pub fn new(
        config: AuthConfig,
        transport: Arc<dyn Transport>,
        store: Arc<SessionStore>,
        coordinator: RefreshCoordinator,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self {
            config,
            transport,
            attacher: CredentialAttacher::new(Arc::clone(&store)),
            store,
            coordinator,
            navigator,
        }
    }

    /// Returns the current state of the session.
    pub fn state(&self) -> HandlerState {
        if self.coordinator.state() == RefreshState::InFlight {
            HandlerState::RefreshPending
        } else if self.store.is_authenticated() {
            HandlerState::Authenticated
        } else {
            HandlerState::Unauthenticated
        }
    }

    /// Resolve the outcome of sending `pending`'s request.
    ///
    /// Returns the response the caller should see: either the original
    /// success, or the response to the replayed request after a refresh.
    #[instrument(skip_all, fields(id = %pending.request.id(), method = %pending.request.method(), path = pending.request.path()))]
    pub async fn handle(
        &self,
        pending: PendingReplay,
        outcome: Result<ApiResponse, TransportError>,
    ) -> Result<ApiResponse, Error> {
        let response = outcome?;
        let status = response.status();
        match self.config.status_codes.classify(status) {
            StatusClass::Success => Ok(response),
            StatusClass::InvalidCredential => {
                self.force_logout(LoginReason::InvalidCredentials);
                Err(invalid(status, pending.request.path()))
            }
            StatusClass::ExpiredCredential => self.recover(pending, status).await,
            StatusClass::Other => {
                debug!(%status, "Request failed outside the credential classes");
                Err(response.to_protocol_error().into())
            }
        }
    }

    async fn recover(&self, pending: PendingReplay, status: StatusCode) -> Result<ApiResponse, Error> {
        let original = AuthError::ExpiredCredential {
            status: status.as_u16(),
            path: pending.request.path().to_string(),
        };

        if self.config.is_refresh_path(pending.request.path()) {
            warn!("Refresh endpoint reported an expired credential");
            self.force_logout(LoginReason::SessionExpired);
            return Err(original.into());
        }

        let epoch = self.store.epoch();
        if pending.epoch != epoch {
            if self.store.is_authenticated() {
                debug!(
                    sent_at = pending.epoch,
                    now = epoch,
                    "Session renewed since the request was sent"
                );
                return self.replay(pending, original).await;
            }
            // Already logged out and redirected for this failure.
            debug!(
                sent_at = pending.epoch,
                now = epoch,
                "Session ended since the request was sent"
            );
            return Err(original.into());
        }

        let handle = self.coordinator.acquire_refresh();
        let id = handle.id();
        debug!(refresh_id = id, initiated = handle.initiated(), "Waiting for refresh");

        match handle.wait().await {
            Ok(identity) => {
                debug!(user_id = %identity.user_id(), "Replaying after refresh");
                self.replay(pending, original).await
            }
            Err(failure) => {
                if self.coordinator.claim_failure(id) {
                    self.force_logout(failure.login_reason());
                }
                Err(original.into())
            }
        }
    }

    /// Resend the original request with the current credential.
    ///
    /// Never refreshes: a replay that fails with a credential status ends
    /// the session.
    async fn replay(&self, pending: PendingReplay, original: AuthError) -> Result<ApiResponse, Error> {
        let request = self.attacher.attach(pending.into_request());
        let path = request.path().to_string();
        let timeout = self.config.replay_timeout();

        let response = match tokio::time::timeout(timeout, self.transport.send(request)).await {
            Ok(result) => result?,
            Err(_) => {
                warn!(timeout_ms = self.config.replay_timeout_ms, "Replay timed out");
                self.force_logout(LoginReason::RefreshFailed);
                return Err(TransportError::Timeout {
                    duration_ms: self.config.replay_timeout_ms,
                }
                .into());
            }
        };

        let status = response.status();
        match self.config.status_codes.classify(status) {
            StatusClass::Success => {
                info!(%status, "Replay succeeded");
                Ok(response)
            }
            StatusClass::ExpiredCredential => {
                warn!(%status, "Replay rejected the refreshed credential");
                self.force_logout(LoginReason::RefreshFailed);
                Err(original.into())
            }
            StatusClass::InvalidCredential => {
                self.force_logout(LoginReason::InvalidCredentials);
                Err(invalid(status, &path))
            }
            StatusClass::Other => Err(response.to_protocol_error().into()),
        }
    }

    pub(crate) fn force_logout(&self, reason: LoginReason) {
        let was_authenticated = self.store.logout();
        warn!(%reason, was_authenticated, "Forcing logout");
        self.navigator.navigate(Navigation::login(reason));
    }
}

fn invalid(status: StatusCode, path: &str) -> Error {
    AuthError::InvalidCredential {
        status: status.as_u16(),
        path: path.to_string(),
    }
    .into()
}

impl fmt::Debug for AuthResponseHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthResponseHandler")
            .field("state", &self.state())
            .field("coordinator", &self.coordinator)
            .finish_non_exhaustive()
    }
}
