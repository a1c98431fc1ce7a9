//! Outbound password-reset notifications.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

use crate::config::EmailConfig;

const RESET_SUBJECT: &str = "Reset Your Password - Inventory Master";

/// Delivers a reset link to an account's email address.
#[async_trait]
pub trait ResetNotifier: Send + Sync {
    /// Sends the link. An `Err` means the message was not accepted for delivery.
    async fn send_password_reset(&self, to: &str, reset_link: &str, ttl_minutes: i64)
    -> Result<()>;
}

/// Builds `<frontend>/reset-password?token=..&email=..`, keeping any path
/// prefix the frontend is mounted under.
pub fn build_reset_link(frontend_url: &str, token: &str, email: &str) -> Result<Url> {
    let mut url = Url::parse(frontend_url).context("Invalid frontend URL")?;

    let path = format!("{}/reset-password", url.path().trim_end_matches('/'));
    url.set_path(&path);
    url.query_pairs_mut()
        .clear()
        .append_pair("token", token)
        .append_pair("email", email);

    Ok(url)
}

#[must_use]
pub fn reset_email_html(reset_link: &str, ttl_minutes: i64) -> String {
    // Escaped for attribute context; the visible copy reuses it.
    let link = html_escape::encode_double_quoted_attribute(reset_link);

    format!(
        r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"></head>
<body style="font-family: Arial, sans-serif; line-height: 1.6; color: #333;">
  <div style="max-width: 600px; margin: 0 auto; padding: 20px;">
    <h1>Inventory Master</h1>
    <p>We received a request to reset the password for your Inventory Master account.</p>
    <p><a href="{link}">Reset Password</a></p>
    <p>Or copy and paste this link into your browser:</p>
    <p style="font-family: monospace; word-break: break-all;">{link}</p>
    <p><strong>This link will expire in {ttl_minutes} minutes.</strong></p>
    <p>If you didn't request a password reset, you can safely ignore this email.</p>
  </div>
</body>
</html>
"#
    )
}

#[must_use]
pub fn reset_email_text(reset_link: &str, ttl_minutes: i64) -> String {
    format!(
        "Password Reset Request - Inventory Master\n\n\
         We received a request to reset your password.\n\n\
         Reset link:\n{reset_link}\n\n\
         This link will expire in {ttl_minutes} minutes.\n\n\
         If you didn't request this, you can safely ignore this email.\n"
    )
}

#[derive(Debug, Serialize)]
struct SendEmailRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: String,
    text: String,
}

#[derive(Debug, Deserialize)]
struct SendEmailResponse {
    id: Option<String>,
}

/// Sends mail through the Resend HTTP API.
#[derive(Clone)]
pub struct ResendNotifier {
    client: Client,
    endpoint: Url,
    api_key: String,
    from: String,
}

impl ResendNotifier {
    pub fn new(config: &EmailConfig, api_key: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .user_agent(concat!("InventoryMaster/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build email HTTP client")?;

        let endpoint = Url::parse(&config.api_base_url)
            .and_then(|base| base.join("/emails"))
            .context("Invalid email API base URL")?;

        Ok(Self {
            client,
            endpoint,
            api_key,
            from: config.from_address.clone(),
        })
    }

    /// Returns a notifier when an API key is configured.
    pub fn from_config(config: &EmailConfig) -> Result<Option<Self>> {
        if !config.is_configured() {
            return Ok(None);
        }
        let key = config.resend_api_key.clone().unwrap_or_default();
        Self::new(config, key).map(Some)
    }
}

#[async_trait]
impl ResetNotifier for ResendNotifier {
    async fn send_password_reset(
        &self,
        to: &str,
        reset_link: &str,
        ttl_minutes: i64,
    ) -> Result<()> {
        let body = SendEmailRequest {
            from: &self.from,
            to: [to],
            subject: RESET_SUBJECT,
            html: reset_email_html(reset_link, ttl_minutes),
            text: reset_email_text(reset_link, ttl_minutes),
        };

        debug!(endpoint = %self.endpoint, "Sending password reset email");

        let response = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .context("Email provider request failed")?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            anyhow::bail!("Email provider returned {status}: {detail}");
        }

        let sent: SendEmailResponse = response
            .json()
            .await
            .context("Invalid email provider response")?;

        info!(
            event = "reset_email_sent",
            provider = "resend",
            message_id = sent.id.as_deref().unwrap_or("unknown"),
            "Password reset email accepted"
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_link_carries_token_and_encoded_email() {
        let link = build_reset_link("http://localhost:5173", "abc_-123", "a+b@acme.test").unwrap();

        assert_eq!(link.path(), "/reset-password");
        let pairs: Vec<(String, String)> = link
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("token".to_string(), "abc_-123".to_string()),
                ("email".to_string(), "a+b@acme.test".to_string()),
            ]
        );
    }

    #[test]
    fn reset_link_keeps_mount_prefix() {
        let link = build_reset_link("https://acme.test/app/", "t", "e@acme.test").unwrap();
        assert!(
            link.as_str()
                .starts_with("https://acme.test/app/reset-password?")
        );
    }

    #[test]
    fn invalid_frontend_url_is_an_error() {
        assert!(build_reset_link("not a url", "t", "e").is_err());
    }

    #[test]
    fn html_body_escapes_link() {
        let html = reset_email_html("https://x.test/?a=1&b=\"2\"<i>", 30);
        assert!(html.contains(r#"href="https://x.test/?a=1&amp;b=&quot;2&quot;&lt;i&gt;""#));
        assert!(html.contains(">https://x.test/?a=1&amp;b=&quot;2&quot;&lt;i&gt;</p>"));
        assert!(!html.contains("b=\"2\""));
        assert!(!html.contains("<i>"));
        assert!(html.contains("expire in 30 minutes"));
    }

    #[test]
    fn text_body_mentions_expiry() {
        let text = reset_email_text("https://x.test/r", 30);
        assert!(text.contains("https://x.test/r"));
        assert!(text.contains("30 minutes"));
    }

    #[test]
    fn unconfigured_email_has_no_notifier() {
        let config = EmailConfig::default();
        assert!(ResendNotifier::from_config(&config).unwrap().is_none());
    }
}
