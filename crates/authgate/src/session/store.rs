//! The session store: current identity, in-memory credential, persistence.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::ser::{Serialize, SerializeStruct, Serializer};
use tracing::{debug, info, instrument, warn};

use crate::auth::{AccessToken, Identity, UserId};

use super::storage::KeyValueStore;

/// Durable storage key for the user id.
pub const USER_ID_KEY: &str = "uid";

/// Durable storage key for the display email.
pub const EMAIL_KEY: &str = "email";

/// A snapshot of who is logged in.
///
/// The user id and email are held as one [`Identity`], so they are always
/// both present or both absent.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionRecord {
    identity: Option<Identity>,
}

impl SessionRecord {
    /// A logged-out record.
    pub fn logged_out() -> Self {
        Self::default()
    }

    /// Returns the user id, or `None` when logged out.
    pub fn user_id(&self) -> Option<&UserId> {
        self.identity.as_ref().map(Identity::user_id)
    }

    /// Returns the display email, or `None` when logged out.
    pub fn display_email(&self) -> Option<&str> {
        self.identity.as_ref().map(Identity::display_email)
    }

    /// Returns the full identity, or `None` when logged out.
    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    /// Returns true when a user is logged in.
    pub fn is_authenticated(&self) -> bool {
        self.identity.is_some()
    }
}

/// Serializes as `{ "user_id", "display_email" }`, both null when logged out.
impl Serialize for SessionRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut record = serializer.serialize_struct("SessionRecord", 2)?;
        record.serialize_field("user_id", &self.user_id())?;
        record.serialize_field("display_email", &self.display_email())?;
        record.end()
    }
}

#[derive(Default)]
struct SessionState {
    record: SessionRecord,
    credential: Option<AccessToken>,
    epoch: u64,
}

/// Holds the current identity and is the only thing allowed to change it.
///
/// Mutations go through [`SessionStore::login`] and [`SessionStore::logout`],
/// each applied under one write lock so a reader never sees half a session.
/// Every mutation advances the store's epoch.
///
/// Persistence is best-effort: storage failures are logged and the
/// in-memory state stays authoritative for the running process.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use authgate::{Identity, MemoryStorage, SessionStore, UserId};
///
/// let store = SessionStore::init(Arc::new(MemoryStorage::new()));
/// assert!(store.user_id().is_none());
///
/// store.login(Identity::new(UserId::new("u1").unwrap(), "u1@example.com"));
/// assert_eq!(store.user_id().unwrap().as_str(), "u1");
///
/// store.logout();
/// assert!(store.display_email().is_none());
/// ```
pub struct SessionStore {
    state: RwLock<SessionState>,
    storage: Arc<dyn KeyValueStore>,
}

impl SessionStore {
    /// Create a store, restoring the identity from durable storage.
    ///
    /// Only reads storage. If either key is missing or unreadable the
    /// session starts logged out.
    #[instrument(skip(storage))]
    pub fn init(storage: Arc<dyn KeyValueStore>) -> Self {
        let record = SessionRecord {
            identity: Self::restore(storage.as_ref()),
        };
        if let Some(identity) = record.identity() {
            info!(user_id = %identity.user_id(), "Restored session from storage");
        } else {
            debug!("No stored session");
        }

        Self {
            state: RwLock::new(SessionState {
                record,
                credential: None,
                epoch: 0,
            }),
            storage,
        }
    }

    fn restore(storage: &dyn KeyValueStore) -> Option<Identity> {
        let read = |key: &str| match storage.get(key) {
            Ok(value) => value,
            Err(e) => {
                warn!(error = %e, key, "Failed to read session from storage");
                None
            }
        };

        match (read(USER_ID_KEY), read(EMAIL_KEY)) {
            (Some(uid), Some(email)) => match UserId::new(uid) {
                Ok(user_id) => Some(Identity::new(user_id, email)),
                Err(e) => {
                    warn!(error = %e, "Ignoring stored session with invalid user id");
                    None
                }
            },
            (None, None) => None,
            _ => {
                warn!("Ignoring partially stored session");
                None
            }
        }
    }

    /// Log in: set the identity in memory and persist it.
    ///
    /// Any bearer credential from a previous login is dropped.
    pub fn login(&self, identity: Identity) {
        self.login_with_credential(identity, None);
    }

    /// Log in with an optional bearer credential.
    ///
    /// The credential lives in memory only. Storage is written under the
    /// same lock as memory, so concurrent logins and logouts land in the
    /// same order in both.
    #[instrument(skip(self, identity, credential), fields(user_id = %identity.user_id()))]
    pub fn login_with_credential(&self, identity: Identity, credential: Option<AccessToken>) {
        let mut state = self.write();
        if let Err(e) = self.storage.set(USER_ID_KEY, identity.user_id().as_str()) {
            warn!(error = %e, "Failed to persist user id");
        }
        if let Err(e) = self.storage.set(EMAIL_KEY, identity.display_email()) {
            warn!(error = %e, "Failed to persist email");
        }
        state.record = SessionRecord {
            identity: Some(identity),
        };
        state.credential = credential;
        state.epoch += 1;
        info!("Logged in");
    }

    /// Log out: clear the identity and credential and remove them from storage.
    ///
    /// Idempotent. Returns true if a user was logged in.
    #[instrument(skip(self))]
    pub fn logout(&self) -> bool {
        let mut state = self.write();
        if let Err(e) = self.storage.remove(EMAIL_KEY) {
            warn!(error = %e, "Failed to remove stored email");
        }
        if let Err(e) = self.storage.remove(USER_ID_KEY) {
            warn!(error = %e, "Failed to remove stored user id");
        }

        let was_authenticated = state.record.is_authenticated();
        state.record = SessionRecord::logged_out();
        state.credential = None;
        state.epoch += 1;
        if was_authenticated {
            info!("Logged out");
        } else {
            debug!("Logout with no active session");
        }

        was_authenticated
    }

    /// Returns the current user id.
    pub fn user_id(&self) -> Option<UserId> {
        self.read().record.user_id().cloned()
    }

    /// Returns the current display email.
    pub fn display_email(&self) -> Option<String> {
        self.read().record.display_email().map(str::to_string)
    }

    /// Returns the current identity.
    pub fn identity(&self) -> Option<Identity> {
        self.read().record.identity().cloned()
    }

    /// Returns a snapshot of the whole record.
    pub fn record(&self) -> SessionRecord {
        self.read().record.clone()
    }

    /// Returns true when a user is logged in.
    pub fn is_authenticated(&self) -> bool {
        self.read().record.is_authenticated()
    }

    /// Returns the in-memory bearer credential, if any.
    pub fn credential(&self) -> Option<AccessToken> {
        self.read().credential.clone()
    }

    /// Returns the number of logins and logouts applied so far.
    pub fn epoch(&self) -> u64 {
        self.read().epoch
    }

    /// Returns the credential and the epoch it belongs to, read together.
    pub(crate) fn credential_at_epoch(&self) -> (Option<AccessToken>, u64) {
        let state = self.read();
        (state.credential.clone(), state.epoch)
    }

    fn read(&self) -> RwLockReadGuard<'_, SessionState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, SessionState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.read();
        f.debug_struct("SessionStore")
            .field("record", &state.record)
            .field("credential", &state.credential)
            .field("epoch", &state.epoch)
            .finish()
    }
}
