//! Signed, time-bounded session tokens.

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::config::SecurityConfig;
use crate::domain::AccountId;

/// Claims carried by a session token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SessionClaims {
    /// Account id, as a string per the JWT `sub` convention.
    pub sub: String,
    pub email: String,
    pub company_name: String,
    pub iat: i64,
    pub exp: i64,
}

/// The identity a verified token resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedAccount {
    pub id: AccountId,
    pub email: String,
    pub company_name: String,
}

#[derive(Clone)]
pub struct SessionIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl_seconds: i64,
}

impl std::fmt::Debug for SessionIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionIssuer")
            .field("ttl_seconds", &self.ttl_seconds)
            .finish_non_exhaustive()
    }
}

impl SessionIssuer {
    #[must_use]
    pub fn new(secret: &[u8], ttl_seconds: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl_seconds,
        }
    }

    #[must_use]
    pub fn from_config(config: &SecurityConfig) -> Self {
        Self::new(
            config.jwt_secret.as_bytes(),
            config.session_ttl_days * 24 * 60 * 60,
        )
    }

    #[must_use]
    pub const fn ttl_seconds(&self) -> i64 {
        self.ttl_seconds
    }

    pub fn issue(
        &self,
        account: &AuthenticatedAccount,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        self.issue_at(account, chrono::Utc::now().timestamp())
    }

    /// Issues a token as if the current time were `issued_at`.
    pub fn issue_at(
        &self,
        account: &AuthenticatedAccount,
        issued_at: i64,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        let claims = SessionClaims {
            sub: account.id.to_string(),
            email: account.email.clone(),
            company_name: account.company_name.clone(),
            iat: issued_at,
            exp: issued_at + self.ttl_seconds,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
    }

    /// Returns `None` for anything other than an unexpired HS256 token signed
    /// with this issuer's key.
    #[must_use]
    pub fn verify(&self, token: &str) -> Option<AuthenticatedAccount> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        let data = decode::<SessionClaims>(token, &self.decoding, &validation).ok()?;
        let id: i32 = data.claims.sub.parse().ok()?;

        Some(AuthenticatedAccount {
            id: AccountId::new(id),
            email: data.claims.email,
            company_name: data.claims.company_name,
        })
    }
}
