//! The authenticated API client.

use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use tracing::{debug, info, instrument, warn};

use crate::auth::{Credentials, Identity};
use crate::config::{AuthConfig, StatusClass};
use crate::error::{AuthError, Error, InvalidInputError};
use crate::interceptor::{AuthResponseHandler, CredentialAttacher, HandlerState, PendingReplay};
use crate::refresh::RefreshCoordinator;
use crate::routing::{Navigation, NavigationGuard, Navigator, RouteTable, Router};
use crate::session::SessionStore;
use crate::transport::endpoints::{IdentityResponse, LoginRequest};
use crate::transport::{ApiRequest, ApiResponse, Transport};

/// Sends API requests through the credential attacher and the response
/// state machine.
///
/// Every request that should take part in refresh and replay must go through
/// the same `AuthClient` (or one of its clones), since they share one
/// [`RefreshCoordinator`].
///
/// # Thread Safety
///
/// Clients are cheap to clone (they use internal `Arc`) and are safe to
/// share across tasks.
#[derive(Clone)]
pub struct AuthClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    config: AuthConfig,
    transport: Arc<dyn Transport>,
    store: Arc<SessionStore>,
    attacher: CredentialAttacher,
    coordinator: RefreshCoordinator,
    handler: AuthResponseHandler,
    navigator: Arc<dyn Navigator>,
}

impl AuthClient {
    /// Wire a client around a session store and a navigator.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if `config` does not validate.
    pub fn new(
        config: AuthConfig,
        transport: Arc<dyn Transport>,
        store: Arc<SessionStore>,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self, Error> {
        config.validate()?;

        let coordinator =
            RefreshCoordinator::new(&config, Arc::clone(&transport), Arc::clone(&store));
        let handler = AuthResponseHandler::new(
            config.clone(),
            Arc::clone(&transport),
            Arc::clone(&store),
            coordinator.clone(),
            Arc::clone(&navigator),
        );

        Ok(Self {
            inner: Arc::new(ClientInner {
                attacher: CredentialAttacher::new(Arc::clone(&store)),
                config,
                transport,
                store,
                coordinator,
                handler,
                navigator,
            }),
        })
    }

    /// Send a request, refreshing and replaying it if its credential expired.
    ///
    /// # Errors
    ///
    /// - [`Error::Auth`] if the session ended; the login redirect has already
    ///   been issued.
    /// - [`Error::Protocol`] for any other non-success response.
    /// - [`Error::Transport`] if no response was obtained.
    #[instrument(skip_all, fields(id = %request.id(), method = %request.method(), path = request.path()))]
    pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse, Error> {
        let (attached, epoch) = self.inner.attacher.attach_at_epoch(request.clone());
        let outcome = self.inner.transport.send(attached).await;
        self.inner
            .handler
            .handle(PendingReplay::new(request, epoch), outcome)
            .await
    }

    /// `GET` a path and decode the JSON response.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
        self.send(ApiRequest::get(path)).await?.json()
    }

    /// `POST` a JSON body to a path and decode the JSON response.
    pub async fn post_json<T: DeserializeOwned>(
        &self,
        path: &str,
        body: serde_json::Value,
    ) -> Result<T, Error> {
        self.send(ApiRequest::post(path).with_json(body)).await?.json()
    }

    /// Sign in with email and password.
    ///
    /// Sign-in is not routed through the response state machine: a rejected
    /// sign-in returns [`AuthError::LoginRejected`] and leaves the session
    /// and navigation alone.
    #[instrument(skip(self, credentials), fields(email = %credentials.email()))]
    pub async fn sign_in(&self, credentials: Credentials) -> Result<Identity, Error> {
        info!("Signing in");

        let body = serde_json::to_value(LoginRequest {
            email: credentials.email(),
            password: credentials.password(),
        })
        .map_err(|e| InvalidInputError::Other {
            message: e.to_string(),
        })?;
        let request = ApiRequest::post(self.inner.config.login_path.clone()).with_json(body);
        let response = self.inner.transport.send(request).await?;

        let status = response.status();
        if !status.is_success() {
            let error = response.to_protocol_error();
            warn!(%status, "Sign-in rejected");
            return Err(AuthError::LoginRejected {
                status: status.as_u16(),
                message: error.message.or(error.error),
            }
            .into());
        }

        let (identity, credential) = response.json::<IdentityResponse>()?.into_parts();
        self.inner
            .store
            .login_with_credential(identity.clone(), credential);

        info!(user_id = %identity.user_id(), "Signed in");
        Ok(identity)
    }

    /// Sign out.
    ///
    /// Asks the server to revoke the session, then clears the local session
    /// and navigates to the login view whatever the server said.
    ///
    /// # Errors
    ///
    /// Returns the revocation failure, if any. Local state is cleared
    /// regardless. A credential-class answer means the server session is
    /// already gone and is not an error.
    #[instrument(skip(self))]
    pub async fn sign_out(&self) -> Result<(), Error> {
        info!("Signing out");

        let request = self
            .inner
            .attacher
            .attach(ApiRequest::post(self.inner.config.logout_path.clone()));
        let revoked = self.inner.transport.send(request).await;

        self.inner.store.logout();
        self.inner.navigator.navigate(Navigation::login_plain());

        let response = revoked?;
        match self.inner.config.status_codes.classify(response.status()) {
            StatusClass::Other => {
                warn!(status = %response.status(), "Server-side sign-out failed");
                Err(response.to_protocol_error().into())
            }
            class => {
                debug!(?class, "Server-side sign-out done");
                Ok(())
            }
        }
    }

    /// Refresh the credential now.
    ///
    /// Joins a refresh already in flight. If it fails, the session is ended
    /// and the login redirect issued, once per refresh operation.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> Result<Identity, Error> {
        let handle = self.inner.coordinator.acquire_refresh();
        let id = handle.id();

        handle.wait().await.map_err(|failure| {
            if self.inner.coordinator.claim_failure(id) {
                self.inner.handler.force_logout(failure.login_reason());
            }
            AuthError::RefreshFailed {
                reason: failure.to_string(),
            }
            .into()
        })
    }

    /// Build a [`Router`] over `routes` guarded by this client's session.
    pub fn router(&self, routes: RouteTable) -> Router {
        Router::new(
            routes,
            NavigationGuard::new(Arc::clone(&self.inner.store)),
            Arc::clone(&self.inner.navigator),
        )
    }

    /// Returns the session store.
    pub fn store(&self) -> &Arc<SessionStore> {
        &self.inner.store
    }

    /// Returns the configuration.
    pub fn config(&self) -> &AuthConfig {
        &self.inner.config
    }

    /// Returns the refresh coordinator.
    pub fn coordinator(&self) -> &RefreshCoordinator {
        &self.inner.coordinator
    }

    /// Returns the current session state.
    pub fn state(&self) -> HandlerState {
        self.inner.handler.state()
    }
}

impl fmt::Debug for AuthClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthClient")
            .field("config", &self.inner.config)
            .field("store", &self.inner.store)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}
