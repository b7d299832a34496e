//! Single-flight credential refresh.
//!
//! However many requests fail with an expired credential at the same time,
//! [`RefreshCoordinator`] issues one refresh call and hands its outcome to
//! every one of them.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};
use tracing::{Instrument, debug, info, info_span, warn};

use crate::auth::Identity;
use crate::config::{AuthConfig, StatusClass, StatusClassifier};
use crate::interceptor::CredentialAttacher;
use crate::routing::LoginReason;
use crate::session::SessionStore;
use crate::transport::endpoints::IdentityResponse;
use crate::transport::{ApiRequest, ApiResponse, Transport};

/// Lifecycle of the coordinator's refresh operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshState {
    /// No refresh is running.
    Idle,
    /// A refresh call is outstanding.
    InFlight,
    /// The last refresh produced a new credential.
    Succeeded,
    /// The last refresh failed.
    Failed,
}

/// Why a refresh did not produce a credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshFailureKind {
    /// The refresh endpoint answered with the expired-credential class:
    /// the refresh credential itself has lapsed.
    Expired,
    /// The refresh endpoint answered with the invalid-credential class.
    Rejected,
    /// Any other non-success status.
    Status(u16),
    /// A success response without a usable identity payload.
    Malformed,
    /// No response could be obtained.
    Transport,
    /// No response within the refresh timeout.
    Timeout,
}

/// A failed refresh, shared by every request that waited on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshFailure {
    kind: RefreshFailureKind,
    detail: String,
}

impl RefreshFailure {
    fn new(kind: RefreshFailureKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }

    /// Returns what went wrong.
    pub fn kind(&self) -> RefreshFailureKind {
        self.kind
    }

    /// The reason code to show on the login view.
    pub fn login_reason(&self) -> LoginReason {
        match self.kind {
            RefreshFailureKind::Expired => LoginReason::SessionExpired,
            _ => LoginReason::RefreshFailed,
        }
    }
}

impl fmt::Display for RefreshFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            RefreshFailureKind::Expired => write!(f, "refresh token expired")?,
            RefreshFailureKind::Rejected => write!(f, "refresh rejected")?,
            RefreshFailureKind::Status(code) => write!(f, "refresh returned HTTP {}", code)?,
            RefreshFailureKind::Malformed => write!(f, "malformed refresh response")?,
            RefreshFailureKind::Transport => write!(f, "refresh request failed")?,
            RefreshFailureKind::Timeout => write!(f, "refresh timed out")?,
        }
        if !self.detail.is_empty() {
            write!(f, ": {}", self.detail)?;
        }
        Ok(())
    }
}

/// Result of one refresh operation.
pub type RefreshOutcome = Result<Identity, RefreshFailure>;

type SharedRefresh = Shared<BoxFuture<'static, RefreshOutcome>>;

/// A caller's view of the refresh operation it started or joined.
#[must_use = "a refresh handle does nothing unless waited on"]
pub struct RefreshHandle {
    id: u64,
    initiated: bool,
    outcome: SharedRefresh,
}

impl RefreshHandle {
    /// Returns the operation id. Joined handles share their initiator's id.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Returns true if this handle started the operation rather than
    /// joining one already in flight.
    pub fn initiated(&self) -> bool {
        self.initiated
    }

    /// Wait for the operation's outcome.
    ///
    /// On success the session has already been updated.
    pub async fn wait(self) -> RefreshOutcome {
        self.outcome.await
    }
}

impl fmt::Debug for RefreshHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefreshHandle")
            .field("id", &self.id)
            .field("initiated", &self.initiated)
            .finish_non_exhaustive()
    }
}

/// Deduplicates concurrent refresh attempts into one in-flight call.
///
/// Cheap to clone; clones share the same operation slot.
#[derive(Clone)]
pub struct RefreshCoordinator {
    inner: Arc<CoordinatorInner>,
}

struct CoordinatorInner {
    transport: Arc<dyn Transport>,
    store: Arc<SessionStore>,
    attacher: CredentialAttacher,
    refresh_path: String,
    classifier: StatusClassifier,
    timeout: Duration,
    slot: Mutex<Slot>,
    issued: AtomicU64,
}

struct Slot {
    current: Option<(u64, SharedRefresh)>,
    next_id: u64,
    last: RefreshState,
    failure_claimed: u64,
}

impl RefreshCoordinator {
    /// Create a coordinator refreshing through `transport` into `store`.
    pub fn new(config: &AuthConfig, transport: Arc<dyn Transport>, store: Arc<SessionStore>) -> Self {
        Self {
            inner: Arc::new(CoordinatorInner {
                transport,
                attacher: CredentialAttacher::new(Arc::clone(&store)),
                store,
                refresh_path: config.refresh_path.clone(),
                classifier: config.status_codes.clone(),
                timeout: config.refresh_timeout(),
                slot: Mutex::new(Slot {
                    current: None,
                    next_id: 1,
                    last: RefreshState::Idle,
                    failure_claimed: 0,
                }),
                issued: AtomicU64::new(0),
            }),
        }
    }

    /// Join the in-flight refresh, or start one if none is running.
    ///
    /// The refresh call is issued when the first handle is waited on.
    pub fn acquire_refresh(&self) -> RefreshHandle {
        let mut slot = self.inner.slot();
        if let Some((id, outcome)) = &slot.current {
            debug!(refresh_id = id, "Joining in-flight refresh");
            return RefreshHandle {
                id: *id,
                initiated: false,
                outcome: outcome.clone(),
            };
        }

        let id = slot.next_id;
        slot.next_id += 1;
        let span = info_span!("refresh", refresh_id = id, path = %self.inner.refresh_path);
        let outcome = Arc::clone(&self.inner)
            .run(id)
            .instrument(span)
            .boxed()
            .shared();
        slot.current = Some((id, outcome.clone()));
        debug!(refresh_id = id, "Starting refresh");

        RefreshHandle {
            id,
            initiated: true,
            outcome,
        }
    }

    /// Returns `InFlight` while a refresh is outstanding, `Idle` otherwise.
    pub fn state(&self) -> RefreshState {
        if self.inner.slot().current.is_some() {
            RefreshState::InFlight
        } else {
            RefreshState::Idle
        }
    }

    /// Returns how the most recent refresh ended, or `Idle` if none has.
    pub fn last_completed(&self) -> RefreshState {
        self.inner.slot().last
    }

    /// Claim the follow-up for failed operation `id`.
    ///
    /// Returns true for exactly one caller per operation, whichever waiter
    /// observes the failure first, so the session is ended once even when
    /// the initiating caller was cancelled.
    pub(crate) fn claim_failure(&self, id: u64) -> bool {
        let mut slot = self.inner.slot();
        if slot.failure_claimed < id {
            slot.failure_claimed = id;
            true
        } else {
            false
        }
    }

    /// Returns how many refresh calls have been issued.
    pub fn refresh_count(&self) -> u64 {
        self.inner.issued.load(Ordering::SeqCst)
    }
}

impl CoordinatorInner {
    fn slot(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn run(self: Arc<Self>, id: u64) -> RefreshOutcome {
        self.issued.fetch_add(1, Ordering::SeqCst);
        info!("Issuing credential refresh");

        let request = self.attacher.attach(ApiRequest::post(self.refresh_path.clone()));
        let outcome = match tokio::time::timeout(self.timeout, self.transport.send(request)).await {
            Err(_) => Err(RefreshFailure::new(
                RefreshFailureKind::Timeout,
                format!("no response within {}ms", self.timeout.as_millis()),
            )),
            Ok(Err(e)) => Err(RefreshFailure::new(
                RefreshFailureKind::Transport,
                e.to_string(),
            )),
            Ok(Ok(response)) => self.apply(&response),
        };

        self.finish(id, &outcome);
        outcome
    }

    /// Update the session from a refresh response. Failures leave it as is.
    fn apply(&self, response: &ApiResponse) -> RefreshOutcome {
        let status = response.status();
        match self.classifier.classify(status) {
            StatusClass::Success => {
                let payload: IdentityResponse = response.json().map_err(|e| {
                    RefreshFailure::new(RefreshFailureKind::Malformed, e.to_string())
                })?;
                let (identity, credential) = payload.into_parts();
                self.store
                    .login_with_credential(identity.clone(), credential);
                Ok(identity)
            }
            StatusClass::ExpiredCredential => Err(RefreshFailure::new(
                RefreshFailureKind::Expired,
                format!("HTTP {}", status.as_u16()),
            )),
            StatusClass::InvalidCredential => Err(RefreshFailure::new(
                RefreshFailureKind::Rejected,
                format!("HTTP {}", status.as_u16()),
            )),
            StatusClass::Other => Err(RefreshFailure::new(
                RefreshFailureKind::Status(status.as_u16()),
                response.to_protocol_error().message.unwrap_or_default(),
            )),
        }
    }

    fn finish(&self, id: u64, outcome: &RefreshOutcome) {
        let mut slot = self.slot();
        if matches!(&slot.current, Some((current, _)) if *current == id) {
            slot.current = None;
        }
        match outcome {
            Ok(identity) => {
                slot.last = RefreshState::Succeeded;
                info!(refresh_id = id, user_id = %identity.user_id(), "Refresh succeeded");
            }
            Err(failure) => {
                slot.last = RefreshState::Failed;
                warn!(refresh_id = id, %failure, "Refresh failed");
            }
        }
    }
}

impl fmt::Debug for RefreshCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefreshCoordinator")
            .field("refresh_path", &self.inner.refresh_path)
            .field("state", &self.state())
            .field("issued", &self.refresh_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::UserId;
    use crate::session::MemoryStorage;
    use crate::testing::{ScriptedTransport, identity_body};
    use futures_util::future::join_all;
    use reqwest::StatusCode;
    use serde_json::json;

    fn setup(transport: Arc<ScriptedTransport>) -> (RefreshCoordinator, Arc<SessionStore>) {
        let store = Arc::new(SessionStore::init(Arc::new(MemoryStorage::new())));
        let coordinator = RefreshCoordinator::new(&AuthConfig::default(), transport, store.clone());
        (coordinator, store)
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_acquires_share_one_call() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .route("/api/refresh", |_| identity_body("u1", "u1@example.com"))
                .delay("/api/refresh", Duration::from_millis(100)),
        );
        let (coordinator, store) = setup(transport.clone());

        let handles: Vec<_> = (0..5).map(|_| coordinator.acquire_refresh()).collect();
        assert_eq!(handles.iter().filter(|h| h.initiated()).count(), 1);
        assert!(handles.iter().all(|h| h.id() == handles[0].id()));
        assert_eq!(coordinator.state(), RefreshState::InFlight);

        let outcomes = join_all(handles.into_iter().map(RefreshHandle::wait)).await;

        assert_eq!(transport.calls("/api/refresh"), 1);
        assert_eq!(coordinator.refresh_count(), 1);
        for outcome in outcomes {
            assert_eq!(outcome.unwrap().user_id().as_str(), "u1");
        }
        assert_eq!(store.user_id(), Some(UserId::new("u1").unwrap()));
        assert_eq!(coordinator.state(), RefreshState::Idle);
        assert_eq!(coordinator.last_completed(), RefreshState::Succeeded);
    }

    #[tokio::test]
    async fn completed_operation_resets_for_next_cycle() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .route("/api/refresh", |_| identity_body("u1", "u1@example.com")),
        );
        let (coordinator, _) = setup(transport.clone());

        let first = coordinator.acquire_refresh();
        let first_id = first.id();
        first.wait().await.unwrap();

        let second = coordinator.acquire_refresh();
        assert!(second.initiated());
        assert_ne!(second.id(), first_id);
        second.wait().await.unwrap();

        assert_eq!(transport.calls("/api/refresh"), 2);
    }

    #[tokio::test]
    async fn failure_leaves_session_untouched() {
        let transport = Arc::new(ScriptedTransport::new().route("/api/refresh", |_| {
            ApiResponse::json_body(StatusCode::FORBIDDEN, &json!({}))
        }));
        let (coordinator, store) = setup(transport);
        store.login(Identity::new(UserId::new("u9").unwrap(), "u9@example.com"));
        let epoch = store.epoch();

        let failure = coordinator.acquire_refresh().wait().await.unwrap_err();

        assert_eq!(failure.kind(), RefreshFailureKind::Rejected);
        assert_eq!(failure.login_reason(), LoginReason::RefreshFailed);
        assert_eq!(store.epoch(), epoch);
        assert_eq!(coordinator.last_completed(), RefreshState::Failed);
    }

    #[tokio::test]
    async fn expired_refresh_credential_maps_to_session_expired() {
        let transport = Arc::new(ScriptedTransport::new().route("/api/refresh", |_| {
            ApiResponse::json_body(StatusCode::from_u16(498).unwrap(), &json!({}))
        }));
        let (coordinator, _) = setup(transport);

        let failure = coordinator.acquire_refresh().wait().await.unwrap_err();

        assert_eq!(failure.kind(), RefreshFailureKind::Expired);
        assert_eq!(failure.login_reason(), LoginReason::SessionExpired);
    }

    #[tokio::test]
    async fn failure_is_claimed_once_per_operation() {
        let transport = Arc::new(ScriptedTransport::new().route("/api/refresh", |_| {
            ApiResponse::json_body(StatusCode::INTERNAL_SERVER_ERROR, &json!({}))
        }));
        let (coordinator, _) = setup(transport);

        let first = coordinator.acquire_refresh();
        let joined = coordinator.acquire_refresh();
        let id = first.id();
        drop(first);
        joined.wait().await.unwrap_err();

        assert!(coordinator.claim_failure(id));
        assert!(!coordinator.claim_failure(id));

        let next = coordinator.acquire_refresh();
        let next_id = next.id();
        next.wait().await.unwrap_err();
        assert!(coordinator.claim_failure(next_id));
    }

    #[tokio::test]
    async fn malformed_payload_is_failure() {
        let transport = Arc::new(ScriptedTransport::new().route("/api/refresh", |_| {
            ApiResponse::json_body(StatusCode::OK, &json!({"unexpected": true}))
        }));
        let (coordinator, store) = setup(transport);

        let failure = coordinator.acquire_refresh().wait().await.unwrap_err();

        assert_eq!(failure.kind(), RefreshFailureKind::Malformed);
        assert!(!store.is_authenticated());
    }

    #[tokio::test(start_paused = true)]
    async fn refresh_times_out() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .route("/api/refresh", |_| identity_body("u1", "u1@example.com"))
                .delay("/api/refresh", Duration::from_secs(60)),
        );
        let (coordinator, store) = setup(transport);

        let failure = coordinator.acquire_refresh().wait().await.unwrap_err();

        assert_eq!(failure.kind(), RefreshFailureKind::Timeout);
        assert!(!store.is_authenticated());
        assert_eq!(coordinator.state(), RefreshState::Idle);
    }

    #[tokio::test]
    async fn bearer_token_from_refresh_is_stored() {
        let transport = Arc::new(ScriptedTransport::new().route("/api/refresh", |_| {
            ApiResponse::json_body(
                StatusCode::OK,
                &json!({"uid": 5, "email": "five@example.com", "access_token": "fresh"}),
            )
        }));
        let (coordinator, store) = setup(transport);

        coordinator.acquire_refresh().wait().await.unwrap();

        assert_eq!(store.credential(), Some(crate::AccessToken::new("fresh")));
        assert_eq!(store.user_id().unwrap().as_str(), "5");
    }
}
