//! Authenticated identity types.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, InvalidInputError};

/// The authoritative, stable identifier of a user.
///
/// Servers may send it as a JSON number or string; both normalize to the
/// same textual identifier.
///
/// # Example
///
/// ```
/// use authgate::UserId;
///
/// let id: UserId = serde_json::from_str("42").unwrap();
/// assert_eq!(id.as_str(), "42");
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "String")]
pub struct UserId(String);

impl UserId {
    /// Create a new user id, validating the format.
    ///
    /// # Errors
    ///
    /// Returns an error if the id is empty or contains whitespace.
    pub fn new(s: impl Into<String>) -> Result<Self, Error> {
        let s = s.into();
        Self::validate(&s)?;
        Ok(Self(s))
    }

    /// Returns the identifier string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn validate(s: &str) -> Result<(), Error> {
        if s.is_empty() {
            return Err(InvalidInputError::UserId {
                value: s.to_string(),
                reason: "must not be empty".to_string(),
            }
            .into());
        }
        if s.chars().any(char::is_whitespace) {
            return Err(InvalidInputError::UserId {
                value: s.to_string(),
                reason: "must not contain whitespace".to_string(),
            }
            .into());
        }
        Ok(())
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for UserId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl From<UserId> for String {
    fn from(id: UserId) -> Self {
        id.0
    }
}

impl<'de> Deserialize<'de> for UserId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Wire {
            Text(String),
            Number(u64),
        }

        let raw = match Wire::deserialize(deserializer)? {
            Wire::Text(s) => s,
            Wire::Number(n) => n.to_string(),
        };
        UserId::new(raw).map_err(serde::de::Error::custom)
    }
}

/// An authenticated user: the authoritative id plus a display-only email.
///
/// The email is informational; authorization decisions only ever look at
/// [`Identity::user_id`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    user_id: UserId,
    display_email: String,
}

impl Identity {
    /// Create a new identity.
    pub fn new(user_id: UserId, display_email: impl Into<String>) -> Self {
        Self {
            user_id,
            display_email: display_email.into(),
        }
    }

    /// Returns the authoritative user id.
    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    /// Returns the display email.
    pub fn display_email(&self) -> &str {
        &self.display_email
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <{}>", self.user_id, self.display_email)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_id_from_number_or_string() {
        let from_number: UserId = serde_json::from_str("7").unwrap();
        let from_string: UserId = serde_json::from_str("\"7\"").unwrap();
        assert_eq!(from_number, from_string);
    }

    #[test]
    fn user_id_serializes_as_string() {
        let id = UserId::new("u1").unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"u1\"");
    }

    #[test]
    fn user_id_rejects_empty_and_whitespace() {
        assert!(UserId::new("").is_err());
        assert!(UserId::new("u 1").is_err());
        assert!(serde_json::from_str::<UserId>("\"\"").is_err());
    }

    #[test]
    fn identity_display() {
        let identity = Identity::new(UserId::new("u1").unwrap(), "u1@example.com");
        assert_eq!(identity.to_string(), "u1 <u1@example.com>");
    }
}
