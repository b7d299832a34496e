//! HTTP transport implementation.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::cookie::{CookieStore, Jar};
use tracing::{debug, instrument, trace};

use crate::error::{Error, TransportError};
use crate::types::ApiUrl;

use super::{ApiRequest, ApiResponse, Transport};

/// reqwest-backed [`Transport`] with a cookie jar.
///
/// Cookies set by the backend (typically the access and refresh cookies
/// issued at sign-in and refresh) are kept in the jar and sent on every later
/// request, which is what makes a cookie-managed credential work.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    api: ApiUrl,
    jar: Arc<Jar>,
}

impl HttpTransport {
    /// Create a transport for the given API base URL.
    pub fn new(api: ApiUrl) -> Result<Self, Error> {
        let jar = Arc::new(Jar::default());
        let client = reqwest::Client::builder()
            .user_agent(concat!("authgate/", env!("CARGO_PKG_VERSION")))
            .cookie_provider(Arc::clone(&jar))
            .build()?;

        Ok(Self { client, api, jar })
    }

    /// Returns the API base URL this transport is configured for.
    pub fn api(&self) -> &ApiUrl {
        &self.api
    }

    /// Returns the `Cookie` header value the jar would send to `path`.
    ///
    /// Lets a caller persist the transport credential between processes.
    pub fn export_cookies(&self, path: &str) -> Option<String> {
        let url = self.api.join(path).ok()?;
        self.jar
            .cookies(&url)
            .and_then(|value| value.to_str().ok().map(str::to_string))
    }

    /// Seed the jar with cookies previously returned by
    /// [`HttpTransport::export_cookies`], scoped to `path`.
    pub fn import_cookies(&self, path: &str, cookie_header: &str) -> Result<(), Error> {
        let url = self.api.join(path)?;
        let scope = url.path().to_string();
        for cookie in cookie_header
            .split(';')
            .map(str::trim)
            .filter(|c| !c.is_empty())
        {
            self.jar
                .add_cookie_str(&format!("{}; Path={}", cookie, scope), &url);
        }
        Ok(())
    }
}

#[async_trait]
impl Transport for HttpTransport {
    #[instrument(skip(self, request), fields(api = %self.api, id = %request.id(), method = %request.method(), path = request.path()))]
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
        let url = self.api.endpoint_url(request.path());
        debug!(%url, "Sending request");

        let mut builder = self
            .client
            .request(request.method().clone(), &url)
            .headers(request.headers().clone());
        if let Some(body) = request.body() {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?;
        trace!(%status, bytes = body.len(), "Received response");

        Ok(ApiResponse::new(status, headers, body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_creation() {
        let api = ApiUrl::new("https://cam.example.com").unwrap();
        let transport = HttpTransport::new(api.clone()).unwrap();
        assert_eq!(transport.api().as_str(), api.as_str());
    }

    #[test]
    fn cookies_roundtrip_through_jar() {
        let api = ApiUrl::new("https://cam.example.com").unwrap();
        let transport = HttpTransport::new(api).unwrap();
        assert!(transport.export_cookies("/api/images").is_none());

        transport
            .import_cookies("/api/images", "access_token_cookie=abc; csrf=1")
            .unwrap();
        let exported = transport.export_cookies("/api/images").unwrap();
        assert!(exported.contains("access_token_cookie=abc"));
        assert!(exported.contains("csrf=1"));
    }

    #[test]
    fn imported_cookies_stay_on_their_path() {
        let api = ApiUrl::new("https://cam.example.com").unwrap();
        let transport = HttpTransport::new(api).unwrap();

        transport
            .import_cookies("/api/refresh", "refresh_token_cookie=r1")
            .unwrap();

        assert!(transport.export_cookies("/api/images").is_none());
        assert_eq!(
            transport.export_cookies("/api/refresh").as_deref(),
            Some("refresh_token_cookie=r1")
        );
    }
}
