//! Navigation targets and the navigator seam.

use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tracing::debug;

use super::reason::LoginReason;

/// Where the application should go next.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "to", rename_all = "snake_case")]
pub enum Navigation {
    /// The login view, optionally explaining why the user landed there.
    Login { reason: Option<LoginReason> },
    /// A named view from the route table.
    View { name: String },
}

impl Navigation {
    /// The login view with a reason code.
    pub fn login(reason: LoginReason) -> Self {
        Navigation::Login {
            reason: Some(reason),
        }
    }

    /// The login view without a reason code.
    pub fn login_plain() -> Self {
        Navigation::Login { reason: None }
    }

    /// A named view.
    pub fn view(name: impl Into<String>) -> Self {
        Navigation::View { name: name.into() }
    }

    /// Returns true if this goes to the login view.
    pub fn is_login(&self) -> bool {
        matches!(self, Navigation::Login { .. })
    }

    /// Returns the reason code of a login navigation.
    pub fn reason(&self) -> Option<LoginReason> {
        match self {
            Navigation::Login { reason } => *reason,
            Navigation::View { .. } => None,
        }
    }
}

impl fmt::Display for Navigation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Navigation::Login { reason: Some(r) } => write!(f, "login (reason: {})", r),
            Navigation::Login { reason: None } => f.write_str("login"),
            Navigation::View { name } => write!(f, "view {}", name),
        }
    }
}

/// Receives navigation commands. Implemented by whatever renders views.
pub trait Navigator: Send + Sync {
    /// Go to `to`.
    fn navigate(&self, to: Navigation);
}

/// A [`Navigator`] that records every navigation in order.
///
/// Headless front ends (the CLI, tests) use it to find out where the session
/// logic sent the user.
#[derive(Debug, Default)]
pub struct NavigationLog {
    history: Mutex<Vec<Navigation>>,
}

impl NavigationLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every navigation so far, oldest first.
    pub fn history(&self) -> Vec<Navigation> {
        self.entries().clone()
    }

    /// Returns the most recent navigation.
    pub fn current(&self) -> Option<Navigation> {
        self.entries().last().cloned()
    }

    /// Returns how many times the login view was navigated to.
    pub fn login_count(&self) -> usize {
        self.entries().iter().filter(|n| n.is_login()).count()
    }

    /// Forget the recorded history.
    pub fn clear(&self) {
        self.entries().clear();
    }

    fn entries(&self) -> MutexGuard<'_, Vec<Navigation>> {
        self.history.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Navigator for NavigationLog {
    fn navigate(&self, to: Navigation) {
        debug!(%to, "Navigating");
        self.entries().push(to);
    }
}
