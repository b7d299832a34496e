//! In-process transport for unit tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::HeaderMap;
use serde_json::json;

use crate::error::TransportError;
use crate::transport::{ApiRequest, ApiResponse, Transport};

type Responder = Box<dyn Fn(&ApiRequest, usize) -> Result<ApiResponse, TransportError> + Send + Sync>;

/// Answers each path from a scripted responder and records every request.
///
/// Unscripted paths answer 404.
pub(crate) struct ScriptedTransport {
    routes: HashMap<String, Responder>,
    delays: HashMap<String, Duration>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl ScriptedTransport {
    pub(crate) fn new() -> Self {
        Self {
            routes: HashMap::new(),
            delays: HashMap::new(),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Answer `path` with `f(request)`.
    pub(crate) fn route(
        self,
        path: &str,
        f: impl Fn(&ApiRequest) -> ApiResponse + Send + Sync + 'static,
    ) -> Self {
        self.respond(path, move |request, _| Ok(f(request)))
    }

    /// Answer `path` with `f(n)`, where `n` counts earlier calls to `path`.
    pub(crate) fn route_nth(
        self,
        path: &str,
        f: impl Fn(usize) -> ApiResponse + Send + Sync + 'static,
    ) -> Self {
        self.respond(path, move |_, n| Ok(f(n)))
    }

    /// Fail every call to `path` with `error`.
    pub(crate) fn fail(self, path: &str, error: TransportError) -> Self {
        self.respond(path, move |_, _| Err(error.clone()))
    }

    pub(crate) fn respond(
        mut self,
        path: &str,
        f: impl Fn(&ApiRequest, usize) -> Result<ApiResponse, TransportError> + Send + Sync + 'static,
    ) -> Self {
        self.routes.insert(path.to_string(), Box::new(f));
        self
    }

    /// Hold every response for `path` back by `delay`.
    pub(crate) fn delay(mut self, path: &str, delay: Duration) -> Self {
        self.delays.insert(path.to_string(), delay);
        self
    }

    /// Number of requests sent to `path`.
    pub(crate) fn calls(&self, path: &str) -> usize {
        self.requests(path).len()
    }

    /// Requests sent to `path`, in order.
    pub(crate) fn requests(&self, path: &str) -> Vec<ApiRequest> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.path() == path)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
        let n = {
            let mut requests = self.requests.lock().unwrap();
            let n = requests.iter().filter(|r| r.path() == request.path()).count();
            requests.push(request.clone());
            n
        };
        if let Some(delay) = self.delays.get(request.path()) {
            tokio::time::sleep(*delay).await;
        }
        match self.routes.get(request.path()) {
            Some(responder) => responder(&request, n),
            None => Ok(status(StatusCode::NOT_FOUND)),
        }
    }
}

/// A 200 identity payload as returned by sign-in and refresh.
pub(crate) fn identity_body(uid: &str, email: &str) -> ApiResponse {
    ApiResponse::json_body(StatusCode::OK, &json!({"uid": uid, "email": email}))
}

/// An empty-bodied response with the given status.
pub(crate) fn status(status: StatusCode) -> ApiResponse {
    ApiResponse::new(status, HeaderMap::new(), "")
}

/// An empty-bodied response with a non-standard status code.
pub(crate) fn code(code: u16) -> ApiResponse {
    status(StatusCode::from_u16(code).unwrap())
}
