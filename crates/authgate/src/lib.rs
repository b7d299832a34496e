//! authgate - client-side session and authentication manager.
//!
//! This library tracks whether a user is authenticated, attaches credentials
//! to outgoing API requests, detects credential expiry on responses, refreshes
//! the credential exactly once for any number of concurrent failures, replays
//! the failed requests and keeps route access in step with session validity.
//!
//! All authenticated traffic flows through an [`AuthClient`].
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use authgate::{
//!     ApiRequest, ApiUrl, AuthClient, AuthConfig, Credentials, HttpTransport, MemoryStorage,
//!     NavigationLog, SessionStore,
//! };
//!
//! # async fn example() -> Result<(), authgate::Error> {
//! let api = ApiUrl::new("https://cam.example.com")?;
//! let store = Arc::new(SessionStore::init(Arc::new(MemoryStorage::new())));
//! let navigator = Arc::new(NavigationLog::new());
//! let client = AuthClient::new(
//!     AuthConfig::default(),
//!     Arc::new(HttpTransport::new(api)?),
//!     store,
//!     navigator,
//! )?;
//!
//! client
//!     .sign_in(Credentials::new("alice@example.com", "hunter2"))
//!     .await?;
//! let response = client.send(ApiRequest::get("/api/images")).await?;
//! println!("{}", response.status());
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod interceptor;
pub mod refresh;
pub mod routing;
pub mod session;
pub mod transport;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

// Re-export primary types at crate root for convenience
pub use auth::{AccessToken, Credentials, Identity, UserId};
pub use client::AuthClient;
pub use config::{AuthConfig, StatusClass, StatusClassifier};
pub use error::Error;
pub use interceptor::{AuthResponseHandler, CredentialAttacher, HandlerState, PendingReplay};
pub use refresh::{
    RefreshCoordinator, RefreshFailure, RefreshFailureKind, RefreshHandle, RefreshOutcome,
    RefreshState,
};
pub use routing::{
    GuardDecision, LoginReason, Navigation, NavigationGuard, NavigationLog, Navigator, RouteTable,
    Router, View,
};
pub use session::{FileStorage, KeyValueStore, MemoryStorage, SessionRecord, SessionStore};
pub use transport::{ApiRequest, ApiResponse, HttpTransport, Transport};
pub use types::ApiUrl;

/// Result type alias using the crate's Error type.
pub type Result<T> = std::result::Result<T, Error>;
