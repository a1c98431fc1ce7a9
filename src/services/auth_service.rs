//! Domain service for accounts, sessions, and password resets.
//!
//! Handles signup, credential checks, session issuance, and the reset-token
//! lifecycle (request, validate, consume).

use serde::Serialize;
use thiserror::Error;

use crate::db::Account;
use crate::domain::AccountId;

/// Errors specific to authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Email already registered")]
    EmailTaken,

    #[error("Invalid or expired token")]
    InvalidOrExpiredToken,

    #[error("Account not found")]
    AccountNotFound,

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for AuthError {
    fn from(err: sea_orm::DbErr) -> Self {
        if crate::db::is_unique_violation(&err) {
            return Self::EmailTaken;
        }
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for AuthError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// Public account fields, safe to return to the account holder.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AccountSummary {
    pub id: i32,
    pub email: String,
    pub company_name: String,
}

impl From<Account> for AccountSummary {
    fn from(account: Account) -> Self {
        Self {
            id: account.id,
            email: account.email,
            company_name: account.company_name,
        }
    }
}

/// Login result containing the session token and the account it names.
#[derive(Debug, Clone, Serialize)]
pub struct LoginResult {
    pub token: String,
    pub expires_in: i64,
    pub user: AccountSummary,
}

/// How a reset request was answered. The variants produce differently shaped
/// responses: only `DirectLink` carries secret material.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResetRequestOutcome {
    /// Generic acknowledgement. Returned whether or not the account exists and
    /// whether or not the email was actually delivered.
    Acknowledged,

    /// No email provider is configured, so the link is handed back directly.
    DirectLink {
        reset_link: String,
        reset_token: String,
    },
}

/// Domain service trait for authentication.
#[async_trait::async_trait]
pub trait AuthService: Send + Sync {
    /// Creates an account. Does not log the new account in.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::EmailTaken`] if the normalized email is registered.
    async fn signup(
        &self,
        company_name: &str,
        email: &str,
        password: &str,
    ) -> Result<AccountSummary, AuthError>;

    /// Verifies credentials and issues a session token.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidCredentials`] for an unknown email or a wrong password.
    async fn login(&self, email: &str, password: &str) -> Result<LoginResult, AuthError>;

    /// Gets the account a session belongs to.
    async fn get_account(&self, id: AccountId) -> Result<AccountSummary, AuthError>;

    /// Issues a fresh reset token, replacing any pending one, and dispatches it.
    async fn request_password_reset(&self, email: &str)
    -> Result<ResetRequestOutcome, AuthError>;

    /// Consumes a pending reset token and sets a new password.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidOrExpiredToken`] when the account is unknown,
    /// nothing is pending, the token differs, or it has expired.
    async fn reset_password(
        &self,
        email: &str,
        token: &str,
        new_password: &str,
    ) -> Result<(), AuthError>;
}

/// Lower-cases and trims an email for lookup and storage.
#[must_use]
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emails_are_normalized() {
        assert_eq!(normalize_email("  Ops@ACME.test "), "ops@acme.test");
    }
}
