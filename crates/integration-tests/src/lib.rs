//! Integration test harness for the marketplace API.
//!
//! [`TestApp`] builds the same router the binary serves, backed by the
//! in-memory store, a recording mailer and a temporary upload directory.
//! Requests are dispatched in-process with `tower::ServiceExt::oneshot`.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p marketplace-integration-tests
//! ```

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::path::Path;
use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use chrono::Duration;
use http_body_util::BodyExt;
use secrecy::SecretString;
use serde_json::Value;
use tower::ServiceExt;

use marketplace_api::config::{ApiConfig, SessionConfig};
use marketplace_api::db::{AccountStore, MemoryStore};
use marketplace_api::middleware::ACCESS_TOKEN_HEADER;
use marketplace_api::services::email::{MemoryMailer, OutboundEmail};
use marketplace_api::state::AppState;
use marketplace_core::{AccountKind, Email};

/// Public base URL the test server believes it lives at.
pub const PUBLIC_URL: &str = "http://shop.test";

const MULTIPART_BOUNDARY: &str = "marketplace-test-boundary";

/// A running in-process application.
pub struct TestApp {
    router: Router,
    pub store: Arc<MemoryStore>,
    pub mailer: Arc<MemoryMailer>,
    uploads: tempfile::TempDir,
}

/// Status, headers and parsed JSON body of a response.
pub struct TestResponse {
    pub status: StatusCode,
    pub location: Option<String>,
    pub body: Value,
}

impl TestApp {
    #[must_use]
    pub fn new() -> Self {
        let uploads = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryStore::new());
        let mailer = Arc::new(MemoryMailer::new());

        let state = AppState::new(config(uploads.path()), store.clone(), mailer.clone());

        Self {
            router: marketplace_api::app(state),
            store,
            mailer,
            uploads,
        }
    }

    /// Root of the attachment store.
    #[must_use]
    pub fn upload_root(&self) -> &Path {
        self.uploads.path()
    }

    /// Whether a stored attachment path exists on disk.
    #[must_use]
    pub fn file_exists(&self, stored: &str) -> bool {
        self.uploads.path().join(stored).is_file()
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let location = response
            .headers()
            .get(header::LOCATION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

        TestResponse {
            status,
            location,
            body,
        }
    }

    pub async fn json(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: &Value,
    ) -> TestResponse {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(ACCESS_TOKEN_HEADER, token);
        }
        self.send(builder.body(Body::from(body.to_string())).unwrap())
            .await
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> TestResponse {
        self.bodyless(Method::GET, uri, token).await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> TestResponse {
        self.bodyless(Method::DELETE, uri, token).await
    }

    async fn bodyless(&self, method: Method, uri: &str, token: Option<&str>) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    /// Send a multipart form of text `fields` and `(field, filename, bytes)` files.
    pub async fn multipart(
        &self,
        method: Method,
        uri: &str,
        token: &str,
        fields: &[(&str, &str)],
        files: &[(&str, &str, &[u8])],
    ) -> TestResponse {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header(ACCESS_TOKEN_HEADER, token)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={MULTIPART_BOUNDARY}"),
            )
            .body(Body::from(multipart_body(fields, files)))
            .unwrap();
        self.send(request).await
    }

    /// Register an account and return its session token.
    pub async fn register(&self, name: &str, email: &str, password: &str) -> String {
        let response = self
            .json(
                Method::POST,
                "/api/user/register",
                None,
                &serde_json::json!({ "name": name, "email": email, "password": password }),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
        response.body["token"].as_str().unwrap().to_string()
    }

    /// Promote an account to vendor, the way an operator does.
    pub async fn promote_to_vendor(&self, email: &str) {
        let email = Email::parse(email).unwrap();
        let mut account = self.store.account_by_email(&email).await.unwrap().unwrap();
        account.kind = AccountKind::Vendor;
        assert!(self.store.save_account(&account).await.unwrap());
    }

    /// Register a vendor account and log in as the vendor.
    ///
    /// Returns the vendor token and the vendor JSON.
    pub async fn vendor(&self, email: &str) -> (String, Value) {
        self.register("Seller", email, "hunter22").await;
        self.promote_to_vendor(email).await;
        let response = self
            .json(
                Method::POST,
                "/api/vendor/login",
                None,
                &serde_json::json!({ "email": email, "password": "hunter22" }),
            )
            .await;
        assert_eq!(response.status, StatusCode::OK, "{}", response.body);
        (
            response.body["token"].as_str().unwrap().to_string(),
            response.body["vendor"].clone(),
        )
    }

    /// The last message sent to `to`.
    #[must_use]
    pub fn last_email(&self, to: &str) -> OutboundEmail {
        self.mailer.last_to(to).unwrap()
    }
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

/// Query parameters of the first link in a message's text body.
#[must_use]
pub fn link_params(email: &OutboundEmail) -> Vec<(String, String)> {
    let link = email
        .text_body
        .lines()
        .map(str::trim)
        .find(|line| line.starts_with(PUBLIC_URL))
        .unwrap();
    let (_, query) = link.split_once('?').unwrap();
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
}

/// Value of one link parameter.
#[must_use]
pub fn link_param(email: &OutboundEmail, key: &str) -> String {
    link_params(email)
        .into_iter()
        .find(|(name, _)| name == key)
        .map(|(_, value)| value)
        .unwrap()
}

fn config(upload_dir: &Path) -> ApiConfig {
    ApiConfig {
        database_url: None,
        host: "127.0.0.1".parse().unwrap(),
        port: 0,
        public_url: PUBLIC_URL.to_string(),
        upload_dir: upload_dir.to_path_buf(),
        sessions: SessionConfig {
            account_secret: SecretString::from(random_secret()),
            vendor_secret: SecretString::from(random_secret()),
            ttl: Duration::hours(1),
        },
        reset_token_ttl: Duration::minutes(15),
        email: None,
        email_from: "Marketplace <no-reply@shop.test>".to_string(),
        sentry_dsn: None,
        sentry_environment: None,
    }
}

fn random_secret() -> String {
    format!("{}{}", uuid::Uuid::new_v4().simple(), uuid::Uuid::new_v4().simple())
}

fn multipart_body(fields: &[(&str, &str)], files: &[(&str, &str, &[u8])]) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{MULTIPART_BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    for (name, filename, bytes) in files {
        body.extend_from_slice(
            format!(
                "--{MULTIPART_BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{MULTIPART_BOUNDARY}--\r\n").as_bytes());
    body
}
