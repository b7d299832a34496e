//! Client configuration: endpoints, status classification, timeouts.

use std::collections::BTreeSet;
use std::path::Path;
use std::time::Duration;

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use crate::error::{Error, InvalidInputError};

/// How a response status is treated by the auth state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    /// A 2xx response; handed back untouched.
    Success,
    /// The request's credential lapsed; the session may be recoverable.
    ExpiredCredential,
    /// The session is permanently rejected; never refresh.
    InvalidCredential,
    /// Any other failure; not session related.
    Other,
}

/// Maps status codes onto [`StatusClass`]es.
///
/// Deployments disagree on which codes mean "expired" (401 and 498 are both
/// common), so both sets are configuration rather than constants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusClassifier {
    /// Codes signalling an expired credential.
    pub expired: BTreeSet<u16>,
    /// Codes signalling a permanently rejected credential.
    pub invalid: BTreeSet<u16>,
}

impl Default for StatusClassifier {
    fn default() -> Self {
        Self {
            expired: BTreeSet::from([401, 498]),
            invalid: BTreeSet::from([403]),
        }
    }
}

impl StatusClassifier {
    /// Create a classifier from explicit code sets.
    pub fn new(
        expired: impl IntoIterator<Item = u16>,
        invalid: impl IntoIterator<Item = u16>,
    ) -> Self {
        Self {
            expired: expired.into_iter().collect(),
            invalid: invalid.into_iter().collect(),
        }
    }

    /// Classify a response status.
    pub fn classify(&self, status: StatusCode) -> StatusClass {
        let code = status.as_u16();
        if self.invalid.contains(&code) {
            StatusClass::InvalidCredential
        } else if self.expired.contains(&code) {
            StatusClass::ExpiredCredential
        } else if status.is_success() {
            StatusClass::Success
        } else {
            StatusClass::Other
        }
    }

    fn validate(&self) -> Result<(), Error> {
        for &code in self.expired.iter().chain(self.invalid.iter()) {
            if !(100..=599).contains(&code) {
                return Err(config_error(format!("{} is not an HTTP status code", code)));
            }
            if (200..300).contains(&code) {
                return Err(config_error(format!(
                    "success status {} cannot signal a credential failure",
                    code
                )));
            }
        }
        if let Some(code) = self.expired.intersection(&self.invalid).next() {
            return Err(config_error(format!(
                "status {} is listed as both expired and invalid",
                code
            )));
        }
        Ok(())
    }
}

/// Configuration for an [`AuthClient`](crate::AuthClient).
///
/// Every field has a default matching a conventional `/api/*` backend, so a
/// JSON config file only needs the fields it changes.
///
/// # Example
///
/// ```
/// use authgate::AuthConfig;
///
/// let config: AuthConfig =
///     serde_json::from_str(r#"{ "status_codes": { "expired": [498] } }"#).unwrap();
/// assert_eq!(config.refresh_path, "/api/refresh");
/// assert!(config.status_codes.expired.contains(&498));
/// assert!(!config.status_codes.expired.contains(&401));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Sign-in endpoint.
    pub login_path: String,
    /// Server-side sign-out endpoint.
    pub logout_path: String,
    /// Credential refresh endpoint.
    pub refresh_path: String,
    /// Status code classification.
    pub status_codes: StatusClassifier,
    /// Upper bound on the refresh call, in milliseconds.
    pub refresh_timeout_ms: u64,
    /// Upper bound on a replayed request, in milliseconds.
    pub replay_timeout_ms: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            login_path: "/api/login".to_string(),
            logout_path: "/api/logout".to_string(),
            refresh_path: "/api/refresh".to_string(),
            status_codes: StatusClassifier::default(),
            refresh_timeout_ms: 10_000,
            replay_timeout_ms: 30_000,
        }
    }
}

impl AuthConfig {
    /// Load a configuration from a JSON file and validate it.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            config_error(format!("failed to read {}: {}", path.display(), e))
        })?;
        let config: Self = serde_json::from_str(&json)
            .map_err(|e| config_error(format!("failed to parse {}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Check the configuration for contradictions.
    pub fn validate(&self) -> Result<(), Error> {
        for (name, path) in [
            ("login_path", &self.login_path),
            ("logout_path", &self.logout_path),
            ("refresh_path", &self.refresh_path),
        ] {
            if !path.starts_with('/') {
                return Err(config_error(format!("{} must start with '/'", name)));
            }
        }
        if self.refresh_timeout_ms == 0 || self.replay_timeout_ms == 0 {
            return Err(config_error("timeouts must be greater than zero"));
        }
        self.status_codes.validate()
    }

    /// Upper bound on the refresh call.
    pub fn refresh_timeout(&self) -> Duration {
        Duration::from_millis(self.refresh_timeout_ms)
    }

    /// Upper bound on a replayed request.
    pub fn replay_timeout(&self) -> Duration {
        Duration::from_millis(self.replay_timeout_ms)
    }

    /// Returns true if `path` addresses the refresh endpoint.
    ///
    /// Query strings are ignored.
    pub fn is_refresh_path(&self, path: &str) -> bool {
        strip_query(path) == self.refresh_path
    }
}

fn strip_query(path: &str) -> &str {
    path.split(['?', '#']).next().unwrap_or(path)
}

fn config_error(message: impl Into<String>) -> Error {
    InvalidInputError::Config {
        message: message.into(),
    }
    .into()
}
