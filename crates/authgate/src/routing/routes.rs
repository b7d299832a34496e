//! The route table.

use std::collections::BTreeMap;

use serde::Serialize;

/// A navigable view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct View {
    name: String,
    path: String,
    requires_auth: bool,
}

impl View {
    /// A view anyone may enter.
    pub fn public(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            requires_auth: false,
        }
    }

    /// A view that requires a live session.
    pub fn protected(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            requires_auth: true,
        }
    }

    /// Returns the view name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the view path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns true if entering the view requires a session.
    pub fn requires_auth(&self) -> bool {
        self.requires_auth
    }
}

/// Named views, looked up by name or path.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    views: BTreeMap<String, View>,
}

impl RouteTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a view, replacing any view with the same name.
    pub fn with_view(mut self, view: View) -> Self {
        self.insert(view);
        self
    }

    /// Add a view, replacing any view with the same name.
    pub fn insert(&mut self, view: View) {
        self.views.insert(view.name.clone(), view);
    }

    /// Look a view up by name.
    pub fn get(&self, name: &str) -> Option<&View> {
        self.views.get(name)
    }

    /// Look a view up by path.
    pub fn by_path(&self, path: &str) -> Option<&View> {
        self.views.values().find(|v| v.path == path)
    }

    /// Iterate over the views in name order.
    pub fn iter(&self) -> impl Iterator<Item = &View> {
        self.views.values()
    }

    /// The camera front end's table: a public `Login` view and the
    /// protected `Index` and `Stream` views.
    pub fn camera_app() -> Self {
        Self::new()
            .with_view(View::public("Login", "/login"))
            .with_view(View::protected("Stream", "/stream"))
            .with_view(View::protected("Index", "/"))
    }
}
