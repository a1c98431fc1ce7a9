use anyhow::{Context, Result};
use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
};
use tokio::task;

use crate::config::SecurityConfig;
use crate::db::WriteGate;
use crate::entities::{accounts, prelude::*};

/// Bytes of entropy in a password-reset token.
pub const RESET_TOKEN_BYTES: usize = 32;

const SALT_BYTES: usize = 16;

/// Account data returned from the repository (without credential material).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub id: i32,
    pub company_name: String,
    pub email: String,
    pub created_at: i64,
}

impl From<accounts::Model> for Account {
    fn from(model: accounts::Model) -> Self {
        Self {
            id: model.id,
            company_name: model.company_name,
            email: model.email,
            created_at: model.created_at,
        }
    }
}

pub struct AccountRepository {
    conn: DatabaseConnection,
    writes: WriteGate,
}

impl AccountRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection, writes: WriteGate) -> Self {
        Self { conn, writes }
    }

    /// Full row lookup, including the password hash and reset-token state.
    /// `email` must already be normalized.
    pub async fn find_by_email(&self, email: &str) -> Result<Option<accounts::Model>> {
        Accounts::find()
            .filter(accounts::Column::Email.eq(email))
            .one(&self.conn)
            .await
            .context("Failed to query account by email")
    }

    pub async fn get_by_id(&self, id: i32) -> Result<Option<Account>> {
        let account = Accounts::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query account by ID")?;

        Ok(account.map(Account::from))
    }

    /// Inserts a new account. A duplicate email surfaces as a unique-constraint
    /// `DbErr` so callers can map it to a conflict.
    pub async fn create(
        &self,
        company_name: &str,
        email: &str,
        password_hash: String,
    ) -> Result<Account, sea_orm::DbErr> {
        let _gate = self.writes.lock().await;
        let model = accounts::ActiveModel {
            company_name: Set(company_name.to_string()),
            email: Set(email.to_string()),
            password_hash: Set(password_hash),
            reset_token: Set(None),
            reset_token_expires_at: Set(None),
            created_at: Set(chrono::Utc::now().timestamp()),
            ..Default::default()
        }
        .insert(&self.conn)
        .await?;

        Ok(Account::from(model))
    }

    /// Stores a pending reset token, replacing whatever token was there before.
    pub async fn set_reset_token(&self, id: i32, token: &str, expires_at: i64) -> Result<()> {
        let _gate = self.writes.lock().await;
        let account = Accounts::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query account for reset token")?
            .ok_or_else(|| anyhow::anyhow!("Account not found: {id}"))?;

        let mut active: accounts::ActiveModel = account.into();
        active.reset_token = Set(Some(token.to_string()));
        active.reset_token_expires_at = Set(Some(expires_at));
        active.update(&self.conn).await?;

        Ok(())
    }

    /// Replaces the password hash and clears the pending reset token in one
    /// statement, guarded on the token still being the one that was validated.
    ///
    /// Returns `false` when the guard did not match (the token was consumed or
    /// replaced concurrently), in which case nothing was written.
    pub async fn consume_reset_token(
        &self,
        id: i32,
        token: &str,
        new_password_hash: String,
    ) -> Result<bool> {
        let _gate = self.writes.lock().await;
        let result = Accounts::update_many()
            .col_expr(accounts::Column::PasswordHash, Expr::value(new_password_hash))
            .col_expr(
                accounts::Column::ResetToken,
                Expr::value(Option::<String>::None),
            )
            .col_expr(
                accounts::Column::ResetTokenExpiresAt,
                Expr::value(Option::<i64>::None),
            )
            .filter(accounts::Column::Id.eq(id))
            .filter(accounts::Column::ResetToken.eq(token))
            .exec(&self.conn)
            .await
            .context("Failed to update password")?;

        Ok(result.rows_affected == 1)
    }

    /// Overwrites the stored reset expiry, leaving the token itself in place.
    pub async fn set_reset_token_expiry(&self, id: i32, expires_at: i64) -> Result<()> {
        let _gate = self.writes.lock().await;
        Accounts::update_many()
            .col_expr(accounts::Column::ResetTokenExpiresAt, Expr::value(expires_at))
            .filter(accounts::Column::Id.eq(id))
            .exec(&self.conn)
            .await
            .context("Failed to update reset token expiry")?;
        Ok(())
    }
}

/// Hash a password using Argon2id with the configured cost parameters.
pub fn hash_password(password: &str, config: &SecurityConfig) -> Result<String> {
    use rand::Rng;

    let salt_bytes: [u8; SALT_BYTES] = rand::rng().random();
    let salt = SaltString::encode_b64(&salt_bytes)
        .map_err(|e| anyhow::anyhow!("Failed to encode salt: {e}"))?;

    let params = Params::new(
        config.argon2_memory_cost_kib,
        config.argon2_time_cost,
        config.argon2_parallelism,
        None,
    )
    .map_err(|e| anyhow::anyhow!("Invalid Argon2 params: {e}"))?;
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {e}"))?;

    Ok(hash.to_string())
}

/// Hashes on the blocking pool; Argon2 would otherwise stall the async runtime.
pub async fn hash_password_blocking(password: &str, config: &SecurityConfig) -> Result<String> {
    let password = password.to_string();
    let config = config.clone();
    task::spawn_blocking(move || hash_password(&password, &config))
        .await
        .context("Password hashing task panicked")?
}

/// Verifies `password` against a stored PHC string. Cost parameters are read
/// from the hash itself, so hashes made under older settings still verify.
pub async fn verify_password(password_hash: &str, password: &str) -> Result<bool> {
    let password_hash = password_hash.to_string();
    let password = password.to_string();

    task::spawn_blocking(move || {
        let parsed_hash = PasswordHash::new(&password_hash)
            .map_err(|e| anyhow::anyhow!("Invalid password hash format: {e}"))?;

        Ok::<bool, anyhow::Error>(
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed_hash)
                .is_ok(),
        )
    })
    .await
    .context("Password verification task panicked")?
}

/// Generate a URL-safe reset token carrying 256 bits of entropy.
#[must_use]
pub fn generate_reset_token() -> String {
    use rand::Rng;

    let bytes: [u8; RESET_TOKEN_BYTES] = rand::rng().random();
    URL_SAFE_NO_PAD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cheap_config() -> SecurityConfig {
        SecurityConfig {
            argon2_memory_cost_kib: 1024,
            argon2_time_cost: 1,
            ..SecurityConfig::default()
        }
    }

    #[test]
    fn reset_tokens_are_url_safe_and_unique() {
        let a = generate_reset_token();
        let b = generate_reset_token();

        assert_eq!(a.len(), 43);
        assert_ne!(a, b);
        assert!(
            a.chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
    }

    #[tokio::test]
    async fn hashed_password_verifies_only_with_original() {
        let hash = hash_password_blocking("correct horse", &cheap_config())
            .await
            .unwrap();

        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password(&hash, "correct horse").await.unwrap());
        assert!(!verify_password(&hash, "battery staple").await.unwrap());
    }

    #[test]
    fn each_hash_gets_a_fresh_salt() {
        let a = hash_password("same password", &cheap_config()).unwrap();
        let b = hash_password("same password", &cheap_config()).unwrap();
        assert_ne!(a, b);

        let salt = PasswordHash::new(&a).unwrap().salt.unwrap();
        assert_eq!(salt.as_str().len(), 22);
    }

    #[tokio::test]
    async fn malformed_hash_is_an_error() {
        assert!(verify_password("not-a-hash", "anything").await.is_err());
    }
}
