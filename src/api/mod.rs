use axum::{
    Router,
    http::HeaderValue,
    middleware,
    routing::{get, post, put},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::state::SharedState;

mod activity;
pub mod auth;
mod error;
pub mod inventory;
mod observability;
mod system;
mod types;
mod validation;

pub use error::ApiError;
pub use types::*;

use crate::services::{AuditService, AuthService, InventoryService, SessionIssuer};
use metrics_exporter_prometheus::PrometheusHandle;

#[derive(Clone)]
pub struct AppState {
    pub shared: Arc<SharedState>,

    pub start_time: std::time::Instant,

    pub prometheus_handle: Option<PrometheusHandle>,
}

impl AppState {
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.shared.config
    }

    #[must_use]
    pub fn store(&self) -> &crate::db::Store {
        &self.shared.store
    }

    #[must_use]
    pub fn sessions(&self) -> &SessionIssuer {
        &self.shared.sessions
    }

    #[must_use]
    pub fn auth_service(&self) -> &Arc<dyn AuthService> {
        &self.shared.auth_service
    }

    #[must_use]
    pub fn inventory_service(&self) -> &Arc<dyn InventoryService> {
        &self.shared.inventory_service
    }

    #[must_use]
    pub fn audit_service(&self) -> &Arc<dyn AuditService> {
        &self.shared.audit_service
    }
}

#[must_use]
pub fn create_app_state(
    shared: Arc<SharedState>,
    prometheus_handle: Option<PrometheusHandle>,
) -> Arc<AppState> {
    Arc::new(AppState {
        shared,
        start_time: std::time::Instant::now(),
        prometheus_handle,
    })
}

pub async fn create_app_state_from_config(
    config: Config,
    prometheus_handle: Option<PrometheusHandle>,
) -> anyhow::Result<Arc<AppState>> {
    let shared = Arc::new(SharedState::new(config).await?);
    Ok(create_app_state(shared, prometheus_handle))
}

pub fn router(state: Arc<AppState>) -> Router {
    let cors_origins = state.config().server.cors_allowed_origins.clone();

    let protected_routes = create_protected_router(state.clone());

    let api_router = Router::new()
        .merge(protected_routes)
        .route("/health", get(system::health))
        .route("/health/ready", get(system::health_ready))
        .route("/auth/signup", post(auth::signup))
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route(
            "/auth/request-password-reset",
            post(auth::request_password_reset),
        )
        .route("/auth/reset-password", post(auth::reset_password))
        .with_state(state.clone());

    // Credentialed requests (the session cookie) need explicit origins.
    let cors_layer = if cors_origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<HeaderValue> =
            cors_origins.iter().filter_map(|s| s.parse().ok()).collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                axum::http::Method::GET,
                axum::http::Method::POST,
                axum::http::Method::PUT,
                axum::http::Method::DELETE,
            ])
            .allow_headers([
                axum::http::header::AUTHORIZATION,
                axum::http::header::CONTENT_TYPE,
            ])
            .allow_credentials(true)
    };

    Router::new()
        .nest("/api", api_router)
        .route("/metrics", get(observability::get_metrics))
        .with_state(state)
        .layer(cors_layer)
        // Inside TraceLayer so the auth middleware records into the request span.
        .layer(middleware::from_fn(observability::logging_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(observability::security_headers_middleware))
}

fn create_protected_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/me", get(auth::get_current_account))
        .route("/inventory", get(inventory::list_inventory))
        .route("/inventory/categories", post(inventory::create_category))
        .route(
            "/inventory/categories/{id}",
            put(inventory::rename_category).delete(inventory::delete_category),
        )
        .route("/inventory/items", post(inventory::create_item))
        .route(
            "/inventory/items/{id}",
            put(inventory::update_item).delete(inventory::delete_item),
        )
        .route("/inventory/items/{id}/add", put(inventory::add_quantity))
        .route("/inventory/items/{id}/take", put(inventory::take_quantity))
        .route(
            "/inventory/items/{id}/history",
            get(activity::get_item_history),
        )
        .route(
            "/inventory/activity-logs",
            get(activity::list_activity_logs),
        )
        .route_layer(middleware::from_fn_with_state(state, auth::auth_middleware))
}
