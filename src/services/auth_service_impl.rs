//! `SeaORM` implementation of the `AuthService` trait.

use async_trait::async_trait;
use std::sync::Arc;
use subtle::ConstantTimeEq;
use tracing::{info, warn};

use crate::config::{Config, SecurityConfig};
use crate::db::Store;
use crate::db::repositories::account::{
    generate_reset_token, hash_password_blocking, verify_password,
};
use crate::domain::AccountId;
use crate::services::auth_service::{
    AccountSummary, AuthError, AuthService, LoginResult, ResetRequestOutcome, normalize_email,
};
use crate::services::notifier::{ResetNotifier, build_reset_link};
use crate::services::session::{AuthenticatedAccount, SessionIssuer};

pub struct SeaOrmAuthService {
    store: Store,
    sessions: SessionIssuer,
    security: SecurityConfig,
    frontend_url: String,
    notifier: Option<Arc<dyn ResetNotifier>>,
    expose_reset_link: bool,
}

impl SeaOrmAuthService {
    #[must_use]
    pub fn new(
        store: Store,
        sessions: SessionIssuer,
        config: &Config,
        notifier: Option<Arc<dyn ResetNotifier>>,
    ) -> Self {
        Self {
            store,
            sessions,
            security: config.security.clone(),
            frontend_url: config.server.frontend_url.clone(),
            notifier,
            expose_reset_link: config.email.expose_reset_link_when_unconfigured,
        }
    }

    fn check_password_strength(&self, password: &str) -> Result<(), AuthError> {
        if password.chars().count() < self.security.min_password_length {
            return Err(AuthError::Validation(format!(
                "Password must be at least {} characters",
                self.security.min_password_length
            )));
        }
        Ok(())
    }

    /// Token comparison that does not leak the matching prefix length.
    fn tokens_match(stored: &str, presented: &str) -> bool {
        bool::from(stored.as_bytes().ct_eq(presented.as_bytes()))
    }
}

#[async_trait]
impl AuthService for SeaOrmAuthService {
    async fn signup(
        &self,
        company_name: &str,
        email: &str,
        password: &str,
    ) -> Result<AccountSummary, AuthError> {
        let company_name = company_name.trim();
        let email = normalize_email(email);

        if company_name.is_empty() || email.is_empty() || password.is_empty() {
            return Err(AuthError::Validation(
                "companyName, email and password are required".to_string(),
            ));
        }
        if !email.contains('@') {
            return Err(AuthError::Validation("Email address is invalid".to_string()));
        }
        self.check_password_strength(password)?;

        let repo = self.store.account_repo();
        if repo.find_by_email(&email).await?.is_some() {
            return Err(AuthError::EmailTaken);
        }

        let password_hash = hash_password_blocking(password, &self.security).await?;

        // A concurrent signup for the same email trips the unique index here.
        let account = repo.create(company_name, &email, password_hash).await?;

        info!(event = "account_created", account_id = account.id, "Account created");

        Ok(account.into())
    }

    async fn login(&self, email: &str, password: &str) -> Result<LoginResult, AuthError> {
        let email = normalize_email(email);
        if email.is_empty() || password.is_empty() {
            return Err(AuthError::Validation(
                "email and password are required".to_string(),
            ));
        }

        let Some(account) = self.store.account_repo().find_by_email(&email).await? else {
            return Err(AuthError::InvalidCredentials);
        };

        if !verify_password(&account.password_hash, password).await? {
            return Err(AuthError::InvalidCredentials);
        }

        let identity = AuthenticatedAccount {
            id: AccountId::new(account.id),
            email: account.email.clone(),
            company_name: account.company_name.clone(),
        };
        let token = self
            .sessions
            .issue(&identity)
            .map_err(|e| AuthError::Internal(format!("Failed to sign session: {e}")))?;

        info!(event = "login_succeeded", account_id = account.id, "Account logged in");

        Ok(LoginResult {
            token,
            expires_in: self.sessions.ttl_seconds(),
            user: AccountSummary {
                id: account.id,
                email: account.email,
                company_name: account.company_name,
            },
        })
    }

    async fn get_account(&self, id: AccountId) -> Result<AccountSummary, AuthError> {
        self.store
            .get_account(id)
            .await?
            .map(AccountSummary::from)
            .ok_or(AuthError::AccountNotFound)
    }

    async fn request_password_reset(
        &self,
        email: &str,
    ) -> Result<ResetRequestOutcome, AuthError> {
        let email = normalize_email(email);
        if email.is_empty() {
            return Err(AuthError::Validation("email is required".to_string()));
        }

        let repo = self.store.account_repo();
        let Some(account) = repo.find_by_email(&email).await? else {
            metrics::counter!("password_reset_requests_total", "outcome" => "unknown_account")
                .increment(1);
            return Ok(ResetRequestOutcome::Acknowledged);
        };

        let token = generate_reset_token();
        let expires_at =
            chrono::Utc::now().timestamp() + self.security.reset_token_ttl_minutes * 60;
        repo.set_reset_token(account.id, &token, expires_at).await?;

        let link = build_reset_link(&self.frontend_url, &token, &account.email)?;

        if let Some(notifier) = &self.notifier {
            let outcome = match notifier
                .send_password_reset(
                    &account.email,
                    link.as_str(),
                    self.security.reset_token_ttl_minutes,
                )
                .await
            {
                Ok(()) => "emailed",
                Err(e) => {
                    // The caller still gets the generic answer.
                    warn!(
                        event = "reset_email_failed",
                        account_id = account.id,
                        error = %e,
                        "Failed to send password reset email"
                    );
                    "email_failed"
                }
            };
            metrics::counter!("password_reset_requests_total", "outcome" => outcome).increment(1);
            return Ok(ResetRequestOutcome::Acknowledged);
        }

        if self.expose_reset_link {
            metrics::counter!("password_reset_requests_total", "outcome" => "direct").increment(1);
            info!(
                event = "reset_link_returned",
                account_id = account.id,
                "No email provider configured; returning reset link directly"
            );
            return Ok(ResetRequestOutcome::DirectLink {
                reset_link: link.to_string(),
                reset_token: token,
            });
        }

        metrics::counter!("password_reset_requests_total", "outcome" => "logged").increment(1);
        warn!(
            event = "reset_link_not_delivered",
            account_id = account.id,
            reset_link = %link,
            "No email provider configured; reset link only written to the log"
        );
        Ok(ResetRequestOutcome::Acknowledged)
    }

    async fn reset_password(
        &self,
        email: &str,
        token: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        let email = normalize_email(email);
        if email.is_empty() || token.is_empty() || new_password.is_empty() {
            return Err(AuthError::Validation(
                "email, token and newPassword are required".to_string(),
            ));
        }

        let repo = self.store.account_repo();
        let account = repo
            .find_by_email(&email)
            .await?
            .ok_or(AuthError::InvalidOrExpiredToken)?;

        let (Some(stored), Some(expires_at)) =
            (account.reset_token.as_deref(), account.reset_token_expires_at)
        else {
            return Err(AuthError::InvalidOrExpiredToken);
        };

        if !Self::tokens_match(stored, token) || chrono::Utc::now().timestamp() > expires_at {
            return Err(AuthError::InvalidOrExpiredToken);
        }

        self.check_password_strength(new_password)?;

        let password_hash = hash_password_blocking(new_password, &self.security).await?;

        // Guarded on the token so a concurrent reset cannot consume it twice.
        if !repo
            .consume_reset_token(account.id, stored, password_hash)
            .await?
        {
            return Err(AuthError::InvalidOrExpiredToken);
        }

        info!(event = "password_reset", account_id = account.id, "Password reset completed");

        Ok(())
    }
}
