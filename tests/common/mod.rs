//! Shared harness for the HTTP integration tests.
#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use http_body_util::BodyExt;
use inventory_master::api::AppState;
use inventory_master::config::Config;
use inventory_master::services::ResetNotifier;
use inventory_master::state::SharedState;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

pub const PASSWORD: &str = "correct-horse-battery";

/// Defaults with a fresh temp database and cheap password hashing.
pub fn test_config() -> Config {
    let db_path = std::env::temp_dir().join(format!(
        "inventory-master-test-{}.db",
        uuid::Uuid::new_v4()
    ));

    let mut config = Config::default();
    config.general.database_path = format!("sqlite:{}", db_path.display());
    config.security.jwt_secret = "integration-test-secret".to_string();
    config.security.argon2_memory_cost_kib = 1024;
    config.security.argon2_time_cost = 1;
    config.server.secure_cookies = false;
    config
}

pub async fn spawn_app() -> (Arc<AppState>, Router) {
    spawn_app_with(test_config(), None).await
}

pub async fn spawn_app_with(
    config: Config,
    notifier: Option<Arc<dyn ResetNotifier>>,
) -> (Arc<AppState>, Router) {
    let shared = SharedState::with_notifier(config, notifier)
        .await
        .expect("Failed to create shared state");
    let state = inventory_master::api::create_app_state(Arc::new(shared), None);
    let router = inventory_master::api::router(state.clone());
    (state, router)
}

/// Sends a JSON request and returns the status with the parsed body
/// (`Value::Null` when the body is empty or not JSON).
pub async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

pub async fn signup(app: &Router, company: &str, email: &str) {
    let (status, _) = send(
        app,
        "POST",
        "/api/auth/signup",
        None,
        Some(serde_json::json!({
            "companyName": company,
            "email": email,
            "password": PASSWORD,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
}

/// Returns `(token, account_id)`.
pub async fn login(app: &Router, email: &str, password: &str) -> (String, i32) {
    let (status, body) = send(
        app,
        "POST",
        "/api/auth/login",
        None,
        Some(serde_json::json!({ "email": email, "password": password })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "login failed: {body}");
    (
        body["data"]["token"].as_str().unwrap().to_string(),
        i32::try_from(body["data"]["user"]["id"].as_i64().unwrap()).unwrap(),
    )
}

pub async fn register(app: &Router, company: &str, email: &str) -> (String, i32) {
    signup(app, company, email).await;
    login(app, email, PASSWORD).await
}

pub async fn create_category(app: &Router, token: &str, name: &str) -> i64 {
    let (status, body) = send(
        app,
        "POST",
        "/api/inventory/categories",
        Some(token),
        Some(serde_json::json!({ "name": name })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "create category failed: {body}");
    body["data"]["id"].as_i64().unwrap()
}

pub async fn create_item(app: &Router, token: &str, category_id: i64, body: Value) -> Value {
    let mut payload = body;
    payload["categoryId"] = serde_json::json!(category_id);
    let (status, body) = send(
        app,
        "POST",
        "/api/inventory/items",
        Some(token),
        Some(payload),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "create item failed: {body}");
    body["data"].clone()
}
