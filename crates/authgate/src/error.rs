//! Error types for the authgate library.
//!
//! This module provides a unified error type with explicit variants for
//! transport, session, protocol, and input validation errors.

use std::fmt;

use reqwest::StatusCode;
use thiserror::Error;

/// The unified error type for authgate operations.
///
/// Session failures ([`AuthError`]) are kept apart from plain server or
/// transport failures so callers can tell "you were logged out" from
/// "the request failed".
#[derive(Debug, Error)]
pub enum Error {
    /// Network transport errors (DNS, TLS, connection, timeout).
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Session errors (expired or rejected credential, failed refresh).
    #[error("authentication error: {0}")]
    Auth(#[from] AuthError),

    /// A response outside both credential classes that is not a success.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Input validation errors (URL, user id, configuration, view name).
    #[error("invalid input: {0}")]
    InvalidInput(#[from] InvalidInputError),
}

impl Error {
    /// Returns the HTTP status behind this error, if a response was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Auth(err) => err.status(),
            Error::Protocol(err) => Some(err.status),
            Error::Transport(_) | Error::InvalidInput(_) => None,
        }
    }

    /// Returns true if this error ended the session.
    pub fn is_session_error(&self) -> bool {
        matches!(self, Error::Auth(_))
    }
}

/// Transport-level errors.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// Network connection failed.
    #[error("connection failed: {message}")]
    Connection { message: String },

    /// DNS resolution failed.
    #[error("DNS resolution failed: {host}")]
    Dns { host: String },

    /// TLS/SSL error.
    #[error("TLS error: {message}")]
    Tls { message: String },

    /// Request timed out.
    #[error("request timed out after {duration_ms}ms")]
    Timeout { duration_ms: u64 },

    /// Generic HTTP error.
    #[error("HTTP error: {message}")]
    Http { message: String },
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout { duration_ms: 0 }
        } else if err.is_connect() {
            TransportError::Connection {
                message: err.to_string(),
            }
        } else {
            TransportError::Http {
                message: err.to_string(),
            }
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Transport(TransportError::from(err))
    }
}

/// Session-related errors.
#[derive(Debug, Clone, Error)]
pub enum AuthError {
    /// The request's credential has lapsed and could not be renewed.
    ///
    /// This is the original failure handed back to a caller whose request
    /// could not be replayed.
    #[error("credential expired (HTTP {status}) for {path}")]
    ExpiredCredential { status: u16, path: String },

    /// The server permanently rejected the session.
    #[error("credential rejected (HTTP {status}) for {path}")]
    InvalidCredential { status: u16, path: String },

    /// The refresh endpoint could not issue a new credential.
    #[error("refresh failed: {reason}")]
    RefreshFailed { reason: String },

    /// Sign-in was refused by the server.
    #[error("login rejected (HTTP {status}){}", message_suffix(.message))]
    LoginRejected {
        status: u16,
        message: Option<String>,
    },
}

impl AuthError {
    /// Returns the HTTP status that caused this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            AuthError::ExpiredCredential { status, .. }
            | AuthError::InvalidCredential { status, .. }
            | AuthError::LoginRejected { status, .. } => Some(*status),
            AuthError::RefreshFailed { .. } => None,
        }
    }
}

fn message_suffix(message: &Option<String>) -> String {
    message
        .as_deref()
        .map(|m| format!(": {m}"))
        .unwrap_or_default()
}

/// Protocol-level errors from API responses.
#[derive(Debug, Clone)]
pub struct ProtocolError {
    /// HTTP status code.
    pub status: u16,
    /// Error code from the response body (if present).
    pub error: Option<String>,
    /// Error message from the server.
    pub message: Option<String>,
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HTTP {}", self.status)?;
        if let Some(ref error) = self.error {
            write!(f, " [{}]", error)?;
        }
        if let Some(ref message) = self.message {
            write!(f, ": {}", message)?;
        }
        Ok(())
    }
}

impl std::error::Error for ProtocolError {}

impl ProtocolError {
    /// Create a new protocol error.
    pub fn new(status: u16, error: Option<String>, message: Option<String>) -> Self {
        Self {
            status,
            error,
            message,
        }
    }

    /// A success response whose body did not match the expected shape.
    pub fn malformed(status: StatusCode, err: &serde_json::Error) -> Self {
        Self::new(
            status.as_u16(),
            Some("MalformedResponse".to_string()),
            Some(err.to_string()),
        )
    }

    /// Returns true if the server reported an internal failure.
    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.status)
    }
}

/// Input validation errors.
#[derive(Debug, Clone, Error)]
pub enum InvalidInputError {
    /// Invalid API base URL.
    #[error("invalid API URL '{value}': {reason}")]
    ApiUrl { value: String, reason: String },

    /// Invalid user identifier.
    #[error("invalid user id '{value}': {reason}")]
    UserId { value: String, reason: String },

    /// Invalid request path.
    #[error("invalid path '{value}': {reason}")]
    Path { value: String, reason: String },

    /// Rejected configuration.
    #[error("invalid configuration: {message}")]
    Config { message: String },

    /// Navigation to a view that is not in the route table.
    #[error("unknown view '{name}'")]
    UnknownView { name: String },

    /// Generic invalid input.
    #[error("invalid input: {message}")]
    Other { message: String },
}
