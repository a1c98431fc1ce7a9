mod common;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode, header},
};
use common::{PASSWORD, login, register, send, signup, spawn_app, spawn_app_with, test_config};
use inventory_master::domain::AccountId;
use inventory_master::services::{AuthenticatedAccount, ResetNotifier, SessionIssuer};
use serde_json::json;
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

#[tokio::test]
async fn signup_rejects_duplicate_email_case_insensitively() {
    let (_state, app) = spawn_app().await;
    signup(&app, "Acme", "owner@acme.test").await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/auth/signup",
        None,
        Some(json!({
            "companyName": "Acme Again",
            "email": "  OWNER@acme.test ",
            "password": PASSWORD,
        })),
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], false);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn signup_validates_required_fields() {
    let (_state, app) = spawn_app().await;

    let (status, _) = send(
        &app,
        "POST",
        "/api/auth/signup",
        None,
        Some(json!({ "companyName": "", "email": "a@b.test", "password": PASSWORD })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        "POST",
        "/api/auth/signup",
        None,
        Some(json!({ "companyName": "Acme", "email": "a@b.test", "password": "short" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn login_failures_are_indistinguishable() {
    let (_state, app) = spawn_app().await;
    signup(&app, "Acme", "owner@acme.test").await;

    let (wrong_password, wrong_body) = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "email": "owner@acme.test", "password": "not-the-password" })),
    )
    .await;
    let (unknown_email, unknown_body) = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "email": "nobody@acme.test", "password": PASSWORD })),
    )
    .await;

    assert_eq!(wrong_password, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_email, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_body["error"], unknown_body["error"]);
}

#[tokio::test]
async fn login_sets_cookie_and_token_resolves_account() {
    let (_state, app) = spawn_app().await;
    signup(&app, "Acme", "owner@acme.test").await;

    let request = Request::builder()
        .method("POST")
        .uri("/api/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({ "email": "Owner@Acme.test", "password": PASSWORD }).to_string(),
        ))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap()
        .to_string();
    assert!(cookie.starts_with("session="));
    assert!(cookie.contains("HttpOnly"));

    let session = cookie.split(';').next().unwrap().to_string();
    let request = Request::builder()
        .uri("/api/auth/me")
        .header(header::COOKIE, session)
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let (token, account_id) = login(&app, "owner@acme.test", PASSWORD).await;
    let (status, body) = send(&app, "GET", "/api/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["id"], account_id);
    assert_eq!(body["data"]["email"], "owner@acme.test");
    assert_eq!(body["data"]["companyName"], "Acme");
}

#[tokio::test]
async fn each_token_resolves_to_its_own_account() {
    let (_state, app) = spawn_app().await;
    let (token_a, id_a) = register(&app, "Acme", "a@acme.test").await;
    let (token_b, id_b) = register(&app, "Bolt", "b@bolt.test").await;
    assert_ne!(id_a, id_b);

    let (_, me_a) = send(&app, "GET", "/api/auth/me", Some(&token_a), None).await;
    let (_, me_b) = send(&app, "GET", "/api/auth/me", Some(&token_b), None).await;
    assert_eq!(me_a["data"]["id"], id_a);
    assert_eq!(me_b["data"]["id"], id_b);
}

#[tokio::test]
async fn protected_routes_reject_bad_sessions() {
    let (state, app) = spawn_app().await;
    let (_token, account_id) = register(&app, "Acme", "owner@acme.test").await;
    let account = AuthenticatedAccount {
        id: AccountId::new(account_id),
        email: "owner@acme.test".to_string(),
        company_name: "Acme".to_string(),
    };

    let (status, _) = send(&app, "GET", "/api/inventory", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, "GET", "/api/inventory", Some("not-a-jwt"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let foreign = SessionIssuer::new(b"some-other-secret", 3600)
        .issue(&account)
        .unwrap();
    let (status, _) = send(&app, "GET", "/api/inventory", Some(&foreign), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let issued_long_ago = chrono::Utc::now().timestamp() - state.sessions().ttl_seconds() - 60;
    let expired = state.sessions().issue_at(&account, issued_long_ago).unwrap();
    let (status, _) = send(&app, "GET", "/api/inventory", Some(&expired), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn logout_clears_cookie() {
    let (_state, app) = spawn_app().await;

    let request = Request::builder()
        .method("POST")
        .uri("/api/auth/logout")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let cookie = response.headers().get(header::SET_COOKIE).unwrap();
    let cookie = cookie.to_str().unwrap();
    assert!(cookie.starts_with("session=;"));
    assert!(cookie.contains("Max-Age=0"));
}

async fn request_reset(app: &axum::Router, email: &str) -> serde_json::Value {
    let (status, body) = send(
        app,
        "POST",
        "/api/auth/request-password-reset",
        None,
        Some(json!({ "email": email })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body["data"].clone()
}

async fn reset_password(
    app: &axum::Router,
    email: &str,
    token: &str,
    new_password: &str,
) -> StatusCode {
    let (status, _) = send(
        app,
        "POST",
        "/api/auth/reset-password",
        None,
        Some(json!({ "email": email, "token": token, "newPassword": new_password })),
    )
    .await;
    status
}

#[tokio::test]
async fn unknown_email_gets_generic_acknowledgement() {
    let (_state, app) = spawn_app().await;

    let data = request_reset(&app, "ghost@nowhere.test").await;
    assert_eq!(data["delivery"], "email");
    assert!(data.get("resetLink").is_none());
    assert!(data.get("resetToken").is_none());
}

#[tokio::test]
async fn direct_reset_link_flow() {
    let (_state, app) = spawn_app().await;
    signup(&app, "Acme", "owner@acme.test").await;

    let data = request_reset(&app, "owner@acme.test").await;
    assert_eq!(data["delivery"], "direct");
    let token = data["resetToken"].as_str().unwrap().to_string();
    assert_eq!(token.len(), 43);

    let link = data["resetLink"].as_str().unwrap();
    assert!(link.contains("/reset-password?"));
    assert!(link.contains(&format!("token={token}")));

    assert_eq!(
        reset_password(&app, "owner@acme.test", &token, "a-brand-new-password").await,
        StatusCode::OK
    );
    login(&app, "owner@acme.test", "a-brand-new-password").await;

    let (status, _) = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "email": "owner@acme.test", "password": PASSWORD })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Single use.
    assert_eq!(
        reset_password(&app, "owner@acme.test", &token, "yet-another-password").await,
        StatusCode::BAD_REQUEST
    );
}

#[tokio::test]
async fn newer_reset_token_replaces_older_one() {
    let (_state, app) = spawn_app().await;
    signup(&app, "Acme", "owner@acme.test").await;

    let first = request_reset(&app, "owner@acme.test").await["resetToken"]
        .as_str()
        .unwrap()
        .to_string();
    let second = request_reset(&app, "owner@acme.test").await["resetToken"]
        .as_str()
        .unwrap()
        .to_string();
    assert_ne!(first, second);

    assert_eq!(
        reset_password(&app, "owner@acme.test", &first, "a-brand-new-password").await,
        StatusCode::BAD_REQUEST
    );
    assert_eq!(
        reset_password(&app, "owner@acme.test", &second, "a-brand-new-password").await,
        StatusCode::OK
    );
}

#[tokio::test]
async fn expired_or_mismatched_reset_token_is_rejected() {
    let (state, app) = spawn_app().await;
    let (_token, account_id) = register(&app, "Acme", "owner@acme.test").await;

    let token = request_reset(&app, "owner@acme.test").await["resetToken"]
        .as_str()
        .unwrap()
        .to_string();

    assert_eq!(
        reset_password(&app, "other@acme.test", &token, "a-brand-new-password").await,
        StatusCode::BAD_REQUEST
    );
    assert_eq!(
        reset_password(&app, "owner@acme.test", "wrong-token", "a-brand-new-password").await,
        StatusCode::BAD_REQUEST
    );

    state
        .store()
        .account_repo()
        .set_reset_token_expiry(account_id, chrono::Utc::now().timestamp() - 1)
        .await
        .unwrap();

    assert_eq!(
        reset_password(&app, "owner@acme.test", &token, "a-brand-new-password").await,
        StatusCode::BAD_REQUEST
    );
    login(&app, "owner@acme.test", PASSWORD).await;
}

#[derive(Default)]
struct RecordingNotifier {
    sent: Mutex<Vec<(String, String)>>,
    fail: bool,
}

#[async_trait]
impl ResetNotifier for RecordingNotifier {
    async fn send_password_reset(
        &self,
        to: &str,
        reset_link: &str,
        _ttl_minutes: i64,
    ) -> anyhow::Result<()> {
        self.sent
            .lock()
            .unwrap()
            .push((to.to_string(), reset_link.to_string()));
        if self.fail {
            anyhow::bail!("provider unavailable");
        }
        Ok(())
    }
}

#[tokio::test]
async fn configured_notifier_receives_link_and_response_hides_it() {
    let notifier = Arc::new(RecordingNotifier::default());
    let (_state, app) = spawn_app_with(test_config(), Some(notifier.clone())).await;
    signup(&app, "Acme", "owner@acme.test").await;

    let data = request_reset(&app, "owner@acme.test").await;
    assert_eq!(data["delivery"], "email");
    assert!(data.get("resetLink").is_none());

    let sent = notifier.sent.lock().unwrap().clone();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, "owner@acme.test");

    let link = url::Url::parse(&sent[0].1).unwrap();
    let token = link
        .query_pairs()
        .find(|(k, _)| k == "token")
        .map(|(_, v)| v.into_owned())
        .unwrap();

    assert_eq!(
        reset_password(&app, "owner@acme.test", &token, "a-brand-new-password").await,
        StatusCode::OK
    );
}

#[tokio::test]
async fn notifier_failure_still_acknowledges() {
    let notifier = Arc::new(RecordingNotifier {
        fail: true,
        ..RecordingNotifier::default()
    });
    let (_state, app) = spawn_app_with(test_config(), Some(notifier.clone())).await;
    signup(&app, "Acme", "owner@acme.test").await;

    let data = request_reset(&app, "owner@acme.test").await;
    assert_eq!(data["delivery"], "email");
    assert_eq!(notifier.sent.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn direct_links_can_be_disabled() {
    let mut config = test_config();
    config.email.expose_reset_link_when_unconfigured = false;
    let (_state, app) = spawn_app_with(config, None).await;
    signup(&app, "Acme", "owner@acme.test").await;

    let data = request_reset(&app, "owner@acme.test").await;
    assert_eq!(data["delivery"], "email");
    assert!(data.get("resetToken").is_none());
}
