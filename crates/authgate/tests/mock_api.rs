//! Mock API tests for the authgate library.
//!
//! These tests use wiremock to simulate the backend and drive the full
//! pipeline: attach, send over HTTP, classify, refresh, replay.

use std::sync::Arc;
use std::time::Duration;

use authgate::error::AuthError;
use authgate::{
    AccessToken, ApiRequest, ApiUrl, AuthClient, AuthConfig, Credentials, Error, FileStorage,
    HttpTransport, Identity, KeyValueStore, LoginReason, MemoryStorage, Navigation, NavigationLog,
    SessionStore, StatusClassifier, UserId,
};
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Helper to create an API URL from a mock server.
fn mock_api_url(server: &MockServer) -> ApiUrl {
    ApiUrl::new(&format!("http://127.0.0.1:{}", server.address().port())).unwrap()
}

struct TestApp {
    client: AuthClient,
    nav: Arc<NavigationLog>,
}

impl TestApp {
    fn store(&self) -> &Arc<SessionStore> {
        self.client.store()
    }
}

fn app_with(server: &MockServer, config: AuthConfig) -> TestApp {
    let transport = Arc::new(HttpTransport::new(mock_api_url(server)).unwrap());
    let store = Arc::new(SessionStore::init(Arc::new(MemoryStorage::new())));
    let nav = Arc::new(NavigationLog::new());
    let client = AuthClient::new(config, transport, store, nav.clone()).unwrap();
    TestApp { client, nav }
}

/// An app whose session is logged in as u0 with bearer token "old".
fn logged_in_app(server: &MockServer) -> TestApp {
    let app = app_with(server, AuthConfig::default());
    app.store().login_with_credential(
        Identity::new(UserId::new("u0").unwrap(), "u0@example.com"),
        Some(AccessToken::new("old")),
    );
    app
}

async fn mount_refresh(server: &MockServer, delay: Duration, expected: u64) {
    Mock::given(method("POST"))
        .and(path("/api/refresh"))
        .and(header("authorization", "Bearer old"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({
                    "uid": "u1",
                    "email": "u1@example.com",
                    "access_token": "new"
                }))
                .set_delay(delay),
        )
        .expect(expected)
        .mount(server)
        .await;
}

async fn mount_images(server: &MockServer, token: &str, status: u16) {
    let template = if status == 200 {
        ResponseTemplate::new(200).set_body_json(json!(["cat.jpg", "dog.jpg"]))
    } else {
        ResponseTemplate::new(status)
    };
    Mock::given(method("GET"))
        .and(path("/api/images"))
        .and(header("authorization", format!("Bearer {}", token).as_str()))
        .respond_with(template)
        .mount(server)
        .await;
}

// ============================================================================
// Refresh and replay
// ============================================================================

#[tokio::test]
async fn test_successful_refresh_is_transparent() {
    let server = MockServer::start().await;
    mount_images(&server, "old", 401).await;
    mount_images(&server, "new", 200).await;
    mount_refresh(&server, Duration::ZERO, 1).await;

    let app = logged_in_app(&server);
    let response = app.client.send(ApiRequest::get("/api/images")).await.unwrap();

    assert_eq!(response.status().as_u16(), 200);
    let images: Vec<String> = response.json().unwrap();
    assert_eq!(images, ["cat.jpg", "dog.jpg"]);
    assert_eq!(app.store().user_id().unwrap().as_str(), "u1");
    assert_eq!(app.store().display_email().as_deref(), Some("u1@example.com"));
    assert!(app.nav.history().is_empty());
}

#[tokio::test]
async fn test_concurrent_expiries_issue_one_refresh() {
    let server = MockServer::start().await;
    mount_images(&server, "old", 401).await;
    mount_images(&server, "new", 200).await;
    mount_refresh(&server, Duration::from_millis(300), 1).await;

    let app = logged_in_app(&server);
    let client = &app.client;
    let (a, b, c, d) = tokio::join!(
        client.send(ApiRequest::get("/api/images")),
        client.send(ApiRequest::get("/api/images")),
        client.send(ApiRequest::get("/api/images")),
        client.send(ApiRequest::get("/api/images")),
    );

    for result in [a, b, c, d] {
        assert_eq!(result.unwrap().status().as_u16(), 200);
    }
    assert_eq!(app.client.coordinator().refresh_count(), 1);
    server.verify().await;
}

#[tokio::test]
async fn test_refresh_endpoint_expiry_never_recurses() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/refresh"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    let app = logged_in_app(&server);
    let err = app
        .client
        .send(ApiRequest::post("/api/refresh"))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        Error::Auth(AuthError::ExpiredCredential { status: 401, .. })
    ));
    assert!(app.store().user_id().is_none());
    assert_eq!(
        app.nav.history(),
        vec![Navigation::login(LoginReason::SessionExpired)]
    );
}

#[tokio::test]
async fn test_refresh_failure_ends_session() {
    let server = MockServer::start().await;
    mount_images(&server, "old", 401).await;
    Mock::given(method("POST"))
        .and(path("/api/refresh"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let app = logged_in_app(&server);
    let err = app
        .client
        .send(ApiRequest::get("/api/images"))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        Error::Auth(AuthError::ExpiredCredential { status: 401, .. })
    ));
    assert!(app.store().user_id().is_none());
    assert!(app.store().display_email().is_none());
    assert_eq!(
        app.nav.history(),
        vec![Navigation::login(LoginReason::RefreshFailed)]
    );
}

#[tokio::test]
async fn test_invalid_credential_short_circuits() {
    let server = MockServer::start().await;
    mount_images(&server, "old", 403).await;
    mount_refresh(&server, Duration::ZERO, 0).await;

    let app = logged_in_app(&server);
    let err = app
        .client
        .send(ApiRequest::get("/api/images"))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        Error::Auth(AuthError::InvalidCredential { status: 403, .. })
    ));
    assert!(app.store().user_id().is_none());
    assert_eq!(
        app.nav.history(),
        vec![Navigation::login(LoginReason::InvalidCredentials)]
    );
    server.verify().await;
}

#[tokio::test]
async fn test_custom_expired_code() {
    let server = MockServer::start().await;
    mount_images(&server, "old", 498).await;
    mount_images(&server, "new", 200).await;
    mount_refresh(&server, Duration::ZERO, 1).await;

    let config = AuthConfig {
        status_codes: StatusClassifier::new([498], [401, 403]),
        ..AuthConfig::default()
    };
    let app = app_with(&server, config);
    app.store().login_with_credential(
        Identity::new(UserId::new("u0").unwrap(), "u0@example.com"),
        Some(AccessToken::new("old")),
    );

    let response = app.client.send(ApiRequest::get("/api/images")).await.unwrap();
    assert_eq!(response.status().as_u16(), 200);
}

#[tokio::test]
async fn test_server_errors_leave_session_alone() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/images"))
        .respond_with(ResponseTemplate::new(503).set_body_json(json!({
            "error": "Unavailable",
            "message": "try later"
        })))
        .mount(&server)
        .await;
    mount_refresh(&server, Duration::ZERO, 0).await;

    let app = logged_in_app(&server);
    let err = app
        .client
        .send(ApiRequest::get("/api/images"))
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(503));
    assert!(!err.is_session_error());
    assert!(app.store().is_authenticated());
    assert!(app.nav.history().is_empty());
}

// ============================================================================
// Sign-in and sign-out
// ============================================================================

#[tokio::test]
async fn test_sign_in_then_authenticated_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/login"))
        .and(body_json(json!({
            "email": "alice@example.com",
            "password": "secret123"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "uid": 42,
            "email": "alice@example.com",
            "access_token": "old"
        })))
        .mount(&server)
        .await;
    mount_images(&server, "old", 200).await;

    let app = app_with(&server, AuthConfig::default());
    let identity = app
        .client
        .sign_in(Credentials::new("alice@example.com", "secret123"))
        .await
        .unwrap();

    assert_eq!(identity.user_id().as_str(), "42");
    let images: Vec<String> = app.client.get_json("/api/images").await.unwrap();
    assert_eq!(images.len(), 2);
}

#[tokio::test]
async fn test_sign_in_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/login"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "message": "Invalid email or password"
        })))
        .mount(&server)
        .await;
    mount_refresh(&server, Duration::ZERO, 0).await;

    let app = app_with(&server, AuthConfig::default());
    let err = app
        .client
        .sign_in(Credentials::new("bad@example.com", "wrong"))
        .await
        .unwrap_err();

    assert!(err.to_string().contains("401"));
    assert!(err.to_string().contains("Invalid email or password"));
    assert!(app.nav.history().is_empty());
}

#[tokio::test]
async fn test_sign_out_revokes_and_redirects() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/logout"))
        .and(header("authorization", "Bearer old"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let app = logged_in_app(&server);
    app.client.sign_out().await.unwrap();

    assert!(!app.store().is_authenticated());
    assert!(app.store().credential().is_none());
    assert_eq!(app.nav.history(), vec![Navigation::login_plain()]);
}

// ============================================================================
// Persistence
// ============================================================================

#[test]
fn test_restore_on_init() {
    let dir = TempDir::new().unwrap();
    let storage = Arc::new(FileStorage::new(dir.path().join("session.json")));
    storage.set("uid", "u2").unwrap();
    storage.set("email", "u2@x.com").unwrap();

    let store = SessionStore::init(storage);

    assert_eq!(store.user_id().unwrap().as_str(), "u2");
    assert_eq!(store.display_email().as_deref(), Some("u2@x.com"));
}

#[test]
fn test_login_survives_restart() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("session.json");

    let store = SessionStore::init(Arc::new(FileStorage::new(&file)));
    store.login_with_credential(
        Identity::new(UserId::new("u3").unwrap(), "u3@x.com"),
        Some(AccessToken::new("never-persisted")),
    );
    drop(store);

    let restored = SessionStore::init(Arc::new(FileStorage::new(&file)));
    assert_eq!(restored.user_id().unwrap().as_str(), "u3");
    assert!(restored.credential().is_none());
    let raw = std::fs::read_to_string(&file).unwrap();
    assert!(!raw.contains("never-persisted"));

    restored.logout();
    let empty = SessionStore::init(Arc::new(FileStorage::new(&file)));
    assert!(empty.user_id().is_none());
}
