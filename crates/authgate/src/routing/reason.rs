//! Reason codes attached to a forced logout.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, InvalidInputError};

/// Why the user was sent back to the login view.
///
/// Carries a stable numeric code and a stable slug so a login view can
/// explain what happened instead of showing a generic error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoginReason {
    /// The refresh credential itself has expired.
    SessionExpired,
    /// The server permanently rejected the session.
    InvalidCredentials,
    /// A refresh was attempted and did not produce a usable credential.
    RefreshFailed,
}

impl LoginReason {
    /// Returns the numeric reason code.
    pub fn code(self) -> u8 {
        match self {
            LoginReason::SessionExpired => 1,
            LoginReason::InvalidCredentials => 2,
            LoginReason::RefreshFailed => 3,
        }
    }

    /// Looks a reason up by numeric code.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(LoginReason::SessionExpired),
            2 => Some(LoginReason::InvalidCredentials),
            3 => Some(LoginReason::RefreshFailed),
            _ => None,
        }
    }

    /// Returns the slug form, e.g. `refresh_failed`.
    pub fn as_str(self) -> &'static str {
        match self {
            LoginReason::SessionExpired => "session_expired",
            LoginReason::InvalidCredentials => "invalid_credentials",
            LoginReason::RefreshFailed => "refresh_failed",
        }
    }

    /// A short sentence a login view can show.
    pub fn message(self) -> &'static str {
        match self {
            LoginReason::SessionExpired => "Your session has expired. Please log in again.",
            LoginReason::InvalidCredentials => "You have been logged out.",
            LoginReason::RefreshFailed => "Your session could not be renewed. Please log in again.",
        }
    }
}

impl fmt::Display for LoginReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LoginReason {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let by_code = s.parse::<u8>().ok().and_then(LoginReason::from_code);
        let by_slug = [
            LoginReason::SessionExpired,
            LoginReason::InvalidCredentials,
            LoginReason::RefreshFailed,
        ]
        .into_iter()
        .find(|r| r.as_str() == s);

        by_code.or(by_slug).ok_or_else(|| {
            InvalidInputError::Other {
                message: format!("unknown login reason '{}'", s),
            }
            .into()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(LoginReason::SessionExpired.code(), 1);
        assert_eq!(LoginReason::InvalidCredentials.code(), 2);
        assert_eq!(LoginReason::RefreshFailed.code(), 3);
        assert_eq!(LoginReason::from_code(3), Some(LoginReason::RefreshFailed));
        assert_eq!(LoginReason::from_code(0), None);
    }

    #[test]
    fn parses_code_or_slug() {
        assert_eq!(
            "2".parse::<LoginReason>().unwrap(),
            LoginReason::InvalidCredentials
        );
        assert_eq!(
            "session_expired".parse::<LoginReason>().unwrap(),
            LoginReason::SessionExpired
        );
        assert!("teapot".parse::<LoginReason>().is_err());
    }

    #[test]
    fn serializes_as_slug() {
        assert_eq!(
            serde_json::to_string(&LoginReason::RefreshFailed).unwrap(),
            "\"refresh_failed\""
        );
    }
}
