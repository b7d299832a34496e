//! The navigation guard and the router that runs it.

use std::sync::Arc;

use tracing::{debug, instrument, warn};

use crate::error::{Error, InvalidInputError};
use crate::session::SessionStore;

use super::navigator::{Navigation, Navigator};
use super::routes::{RouteTable, View};

/// Outcome of checking a view transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// Enter the requested view.
    Proceed,
    /// Go here instead.
    Redirect(Navigation),
}

/// Checked before every transition into a view.
///
/// Entering a protected view without a user id logs out (clearing any stray
/// residue of an old session) and redirects to the login view. This runs
/// independently of request-level auth failures.
#[derive(Debug, Clone)]
pub struct NavigationGuard {
    store: Arc<SessionStore>,
}

impl NavigationGuard {
    /// Create a guard reading the given session.
    pub fn new(store: Arc<SessionStore>) -> Self {
        Self { store }
    }

    /// Decide whether `to` may be entered.
    #[instrument(skip(self, to), fields(view = to.name()))]
    pub fn before_enter(&self, to: &View) -> GuardDecision {
        if to.requires_auth() && self.store.user_id().is_none() {
            warn!("Protected view requested without a session, logging out");
            self.store.logout();
            return GuardDecision::Redirect(Navigation::login_plain());
        }
        debug!("Transition allowed");
        GuardDecision::Proceed
    }
}

/// Resolves view names, runs the guard, and drives the [`Navigator`].
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use authgate::{
///     MemoryStorage, Navigation, NavigationGuard, NavigationLog, RouteTable, Router,
///     SessionStore,
/// };
///
/// let store = Arc::new(SessionStore::init(Arc::new(MemoryStorage::new())));
/// let log = Arc::new(NavigationLog::new());
/// let router = Router::new(RouteTable::camera_app(), NavigationGuard::new(store), log.clone());
///
/// let landed = router.push("Index").unwrap();
/// assert_eq!(landed, Navigation::login_plain());
/// ```
pub struct Router {
    routes: RouteTable,
    guard: NavigationGuard,
    navigator: Arc<dyn Navigator>,
}

impl Router {
    /// Create a router.
    pub fn new(routes: RouteTable, guard: NavigationGuard, navigator: Arc<dyn Navigator>) -> Self {
        Self {
            routes,
            guard,
            navigator,
        }
    }

    /// Returns the route table.
    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// Navigate to the view called `name`.
    ///
    /// Returns where the user actually ended up.
    ///
    /// # Errors
    ///
    /// Returns an error if no view has that name.
    pub fn push(&self, name: &str) -> Result<Navigation, Error> {
        let view = self
            .routes
            .get(name)
            .ok_or_else(|| InvalidInputError::UnknownView {
                name: name.to_string(),
            })?;
        Ok(self.enter(view))
    }

    /// Navigate to the view mounted at `path`.
    pub fn push_path(&self, path: &str) -> Result<Navigation, Error> {
        let view = self
            .routes
            .by_path(path)
            .ok_or_else(|| InvalidInputError::UnknownView {
                name: path.to_string(),
            })?;
        Ok(self.enter(view))
    }

    fn enter(&self, view: &View) -> Navigation {
        let target = match self.guard.before_enter(view) {
            GuardDecision::Proceed => Navigation::view(view.name()),
            GuardDecision::Redirect(redirect) => redirect,
        };
        self.navigator.navigate(target.clone());
        target
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("routes", &self.routes)
            .field("guard", &self.guard)
            .finish_non_exhaustive()
    }
}
