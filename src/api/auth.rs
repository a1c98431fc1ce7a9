use axum::{
    Extension, Json,
    extract::{Request, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::{ApiError, ApiResponse, AppState, MessageResponse};
use crate::services::{AccountSummary, AuthenticatedAccount, ResetRequestOutcome};

/// Name of the cookie that carries the session token for browser clients.
pub const SESSION_COOKIE: &str = "session";

const GENERIC_RESET_MESSAGE: &str =
    "If the email exists, a reset link has been sent to your email address";

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    #[serde(default)]
    pub company_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Serialize)]
pub struct SignupResponse {
    pub message: String,
    pub user: AccountSummary,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub expires_in: i64,
    pub user: AccountSummary,
}

#[derive(Deserialize)]
pub struct PasswordResetRequest {
    #[serde(default)]
    pub email: String,
}

/// `resetLink`/`resetToken` are only present when `delivery` is `direct`.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordResetRequestResponse {
    pub message: String,
    pub delivery: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reset_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reset_token: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub new_password: String,
}

// ============================================================================
// Middleware
// ============================================================================

/// Authentication middleware that checks:
/// 1. `Authorization: Bearer <token>` header
/// 2. `session` cookie (set at login)
///
/// On success the resolved [`AuthenticatedAccount`] is added to the request
/// extensions for handlers to extract.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_session_token(request.headers()).ok_or_else(ApiError::unauthorized)?;

    let account = state
        .sessions()
        .verify(&token)
        .ok_or_else(|| ApiError::Unauthorized("Invalid or expired session".to_string()))?;

    tracing::Span::current().record("account_id", account.id.value());
    request.extensions_mut().insert(account);

    Ok(next.run(request).await)
}

fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    if let Some(auth_header) = headers.get(header::AUTHORIZATION)
        && let Ok(auth_str) = auth_header.to_str()
        && let Some(token) = auth_str.strip_prefix("Bearer ")
        && !token.trim().is_empty()
    {
        return Some(token.trim().to_string());
    }

    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|cookies| cookies.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == SESSION_COOKIE && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

fn session_cookie(token: &str, max_age: i64, secure: bool) -> Result<HeaderValue, ApiError> {
    let mut cookie =
        format!("{SESSION_COOKIE}={token}; HttpOnly; Path=/; SameSite=Lax; Max-Age={max_age}");
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie).map_err(|e| ApiError::internal(format!("Bad cookie: {e}")))
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /auth/signup
/// Create an account. The caller must log in afterwards.
pub async fn signup(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<SignupRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .auth_service()
        .signup(&payload.company_name, &payload.email, &payload.password)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(SignupResponse {
            message: "Account created successfully".to_string(),
            user,
        })),
    ))
}

/// POST /auth/login
/// Authenticate with email and password, returns a session token on success
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let result = state
        .auth_service()
        .login(&payload.email, &payload.password)
        .await?;

    let cookie = session_cookie(
        &result.token,
        result.expires_in,
        state.config().server.secure_cookies,
    )?;

    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(ApiResponse::success(LoginResponse {
            token: result.token,
            expires_in: result.expires_in,
            user: result.user,
        })),
    ))
}

/// POST /auth/logout
/// Clear the session cookie. Bearer tokens stay valid until they expire.
pub async fn logout(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let cookie = session_cookie("", 0, state.config().server.secure_cookies)?;
    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(ApiResponse::success(MessageResponse::new("Logged out"))),
    ))
}

/// GET /auth/me
/// Get the account behind the current session
pub async fn get_current_account(
    State(state): State<Arc<AppState>>,
    Extension(account): Extension<AuthenticatedAccount>,
) -> Result<Json<ApiResponse<AccountSummary>>, ApiError> {
    let summary = state.auth_service().get_account(account.id).await?;
    Ok(Json(ApiResponse::success(summary)))
}

/// POST /auth/request-password-reset
/// Issue a reset token. The answer does not reveal whether the email exists.
pub async fn request_password_reset(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<PasswordResetRequest>,
) -> Result<Json<ApiResponse<PasswordResetRequestResponse>>, ApiError> {
    let outcome = state
        .auth_service()
        .request_password_reset(&payload.email)
        .await?;

    let response = match outcome {
        ResetRequestOutcome::Acknowledged => PasswordResetRequestResponse {
            message: GENERIC_RESET_MESSAGE.to_string(),
            delivery: "email",
            reset_link: None,
            reset_token: None,
        },
        ResetRequestOutcome::DirectLink {
            reset_link,
            reset_token,
        } => PasswordResetRequestResponse {
            message: "Reset link generated. Copy the link below to reset your password."
                .to_string(),
            delivery: "direct",
            reset_link: Some(reset_link),
            reset_token: Some(reset_token),
        },
    };

    Ok(Json(ApiResponse::success(response)))
}

/// POST /auth/reset-password
/// Consume a reset token and set a new password
pub async fn reset_password(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    state
        .auth_service()
        .reset_password(&payload.email, &payload.token, &payload.new_password)
        .await?;

    Ok(Json(ApiResponse::success(MessageResponse::new(
        "Password updated successfully",
    ))))
}
