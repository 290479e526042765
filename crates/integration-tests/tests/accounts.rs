//! Account lifecycle: registration, sessions, verification and reset.

#![allow(clippy::unwrap_used)]

use axum::http::{Method, StatusCode};
use marketplace_integration_tests::{PUBLIC_URL, TestApp, link_param};
use serde_json::json;

#[tokio::test]
async fn test_register_login_and_profile() {
    let app = TestApp::new();
    let registered = app.register("Ada", "ada@example.com", "hunter22").await;

    let login = app
        .json(
            Method::POST,
            "/api/user/login",
            None,
            &json!({ "email": "ada@example.com", "password": "hunter22" }),
        )
        .await;
    assert_eq!(login.status, StatusCode::OK);
    let token = login.body["token"].as_str().unwrap();
    assert_ne!(token, registered);

    let profile = app.get("/api/user/profile", Some(token)).await;
    assert_eq!(profile.status, StatusCode::OK);
    assert_eq!(profile.body["name"], "Ada");
    assert_eq!(profile.body["email"], "ada@example.com");
    assert_eq!(profile.body["kind"], "user");
    assert_eq!(profile.body["isVerified"], false);

    let fields = profile.body.as_object().unwrap();
    assert!(!fields.contains_key("password"));
    assert!(!fields.contains_key("passwordHash"));
    assert!(!fields.contains_key("verificationCode"));
}

#[tokio::test]
async fn test_register_duplicate_email_conflicts() {
    let app = TestApp::new();
    app.register("Ada", "ada@example.com", "hunter22").await;

    let again = app
        .json(
            Method::POST,
            "/api/user/register",
            None,
            &json!({ "name": "Other", "email": "ada@example.com", "password": "hunter23" }),
        )
        .await;
    assert_eq!(again.status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_register_reports_invalid_fields() {
    let app = TestApp::new();

    let response = app
        .json(
            Method::POST,
            "/api/user/register",
            None,
            &json!({ "name": "", "email": "not-an-email", "password": "abc" }),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["errors"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_login_rejects_wrong_password() {
    let app = TestApp::new();
    app.register("Ada", "ada@example.com", "hunter22").await;

    let login = app
        .json(
            Method::POST,
            "/api/user/login",
            None,
            &json!({ "email": "ada@example.com", "password": "wrong-one" }),
        )
        .await;
    assert_eq!(login.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_profile_requires_token() {
    let app = TestApp::new();

    assert_eq!(
        app.get("/api/user/profile", None).await.status,
        StatusCode::UNAUTHORIZED
    );
    assert_eq!(
        app.get("/api/user/profile", Some("garbage")).await.status,
        StatusCode::UNAUTHORIZED
    );
}

#[tokio::test]
async fn test_email_verification_redirects_to_profile() {
    let app = TestApp::new();
    let token = app.register("Ada", "ada@example.com", "hunter22").await;

    let sent = app.get("/api/user/send-otp", Some(&token)).await;
    assert_eq!(sent.status, StatusCode::OK);

    let email = app.last_email("ada@example.com");
    let code = link_param(&email, "code");
    let uid = link_param(&email, "uid");

    let wrong = app
        .get(&format!("/api/user/verify-otp?code=000000x&uid={uid}"), None)
        .await;
    assert_eq!(wrong.status, StatusCode::BAD_REQUEST);

    let verified = app
        .get(&format!("/api/user/verify-otp?code={code}&uid={uid}"), None)
        .await;
    assert_eq!(verified.status, StatusCode::SEE_OTHER);
    assert_eq!(verified.location.as_deref(), Some(format!("{PUBLIC_URL}/profile").as_str()));

    let profile = app.get("/api/user/profile", Some(&token)).await;
    assert_eq!(profile.body["isVerified"], true);

    // Nothing left to verify.
    let again = app.get("/api/user/send-otp", Some(&token)).await;
    assert_eq!(again.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_password_reset_flow() {
    let app = TestApp::new();
    app.register("Ada", "ada@example.com", "hunter22").await;

    let unknown = app
        .json(
            Method::POST,
            "/api/user/forgot-password",
            None,
            &json!({ "email": "nobody@example.com" }),
        )
        .await;
    assert_eq!(unknown.status, StatusCode::NOT_FOUND);

    let requested = app
        .json(
            Method::POST,
            "/api/user/forgot-password",
            None,
            &json!({ "email": "ada@example.com" }),
        )
        .await;
    assert_eq!(requested.status, StatusCode::OK);

    let email = app.last_email("ada@example.com");
    let code = link_param(&email, "code");
    let uid = link_param(&email, "uid");

    let reset = app
        .json(
            Method::POST,
            "/api/user/reset-password",
            None,
            &json!({ "code": code, "uid": uid, "newPassword": "brand-new-pass" }),
        )
        .await;
    assert_eq!(reset.status, StatusCode::OK);

    // The code is single use.
    let replay = app
        .json(
            Method::POST,
            "/api/user/reset-password",
            None,
            &json!({ "code": code, "uid": uid, "newPassword": "another-pass" }),
        )
        .await;
    assert_eq!(replay.status, StatusCode::BAD_REQUEST);

    let old = app
        .json(
            Method::POST,
            "/api/user/login",
            None,
            &json!({ "email": "ada@example.com", "password": "hunter22" }),
        )
        .await;
    assert_eq!(old.status, StatusCode::UNAUTHORIZED);

    let new = app
        .json(
            Method::POST,
            "/api/user/login",
            None,
            &json!({ "email": "ada@example.com", "password": "brand-new-pass" }),
        )
        .await;
    assert_eq!(new.status, StatusCode::OK);
}

#[tokio::test]
async fn test_update_password_and_delete_account() {
    let app = TestApp::new();
    let token = app.register("Ada", "ada@example.com", "hunter22").await;

    let wrong = app
        .json(
            Method::PATCH,
            "/api/user/update-password",
            Some(&token),
            &json!({ "oldPassword": "nope-nope", "newPassword": "changed-pass" }),
        )
        .await;
    assert_eq!(wrong.status, StatusCode::UNAUTHORIZED);

    let changed = app
        .json(
            Method::PATCH,
            "/api/user/update-password",
            Some(&token),
            &json!({ "oldPassword": "hunter22", "newPassword": "changed-pass" }),
        )
        .await;
    assert_eq!(changed.status, StatusCode::OK);

    let renamed = app
        .json(
            Method::PATCH,
            "/api/user/update-profile",
            Some(&token),
            &json!({ "name": "Ada L." }),
        )
        .await;
    assert_eq!(renamed.status, StatusCode::OK);
    assert_eq!(renamed.body["name"], "Ada L.");

    let deleted = app.delete("/api/user/delete-account", Some(&token)).await;
    assert_eq!(deleted.status, StatusCode::OK);

    let gone = app.get("/api/user/profile", Some(&token)).await;
    assert_eq!(gone.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_health_endpoints() {
    let app = TestApp::new();
    assert_eq!(app.get("/health", None).await.status, StatusCode::OK);
    assert_eq!(app.get("/health/ready", None).await.status, StatusCode::OK);
}
