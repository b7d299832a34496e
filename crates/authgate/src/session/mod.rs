//! Session state and its durable persistence.
//!
//! [`SessionStore`] is the single source of truth for who is logged in. It
//! persists the identity (never the credential) through a [`KeyValueStore`].

mod storage;
mod store;

pub use storage::{FileStorage, KeyValueStore, MemoryStorage, StorageError};
pub use store::{EMAIL_KEY, SessionRecord, SessionStore, USER_ID_KEY};
