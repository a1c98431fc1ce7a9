use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// JWT secret used when nothing is configured. Only acceptable for local development.
pub const DEV_JWT_SECRET: &str = "dev_secret_change_me";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,

    pub server: ServerConfig,

    pub security: SecurityConfig,

    pub email: EmailConfig,

    pub retention: RetentionConfig,

    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub database_path: String,

    pub log_level: String,

    /// Number of tokio worker threads (default: 2)
    /// Set to 0 to use the number of CPU cores
    pub worker_threads: usize,

    /// Maximum database connections (default: 5)
    pub max_db_connections: u32,

    /// Minimum database connections (default: 1)
    pub min_db_connections: u32,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            database_path: "sqlite:data/inventory.db".to_string(),
            log_level: "info".to_string(),
            worker_threads: 2,
            max_db_connections: 5,
            min_db_connections: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub enabled: bool,

    pub port: u16,

    pub cors_allowed_origins: Vec<String>,

    /// Whether to set the Secure flag on the session cookie.
    /// Set to false for local development without HTTPS.
    pub secure_cookies: bool,

    /// Public URL of the web client. Password-reset links point here.
    pub frontend_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: 5000,
            cors_allowed_origins: vec!["http://localhost:5173".to_string()],
            secure_cookies: true,
            frontend_url: "http://localhost:5173".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// HMAC key for session tokens.
    pub jwt_secret: String,

    /// Session token validity window in days.
    pub session_ttl_days: i64,

    /// Password-reset token validity window in minutes.
    pub reset_token_ttl_minutes: i64,

    pub min_password_length: usize,

    /// Argon2 memory cost in KiB (default: 8192 = 8MB)
    pub argon2_memory_cost_kib: u32,

    /// Argon2 time cost (iterations) - higher = more CPU work
    pub argon2_time_cost: u32,

    /// Argon2 parallelism (default: 1)
    pub argon2_parallelism: u32,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            jwt_secret: DEV_JWT_SECRET.to_string(),
            session_ttl_days: 7,
            reset_token_ttl_minutes: 30,
            min_password_length: 8,
            argon2_memory_cost_kib: 8192,
            argon2_time_cost: 3,
            argon2_parallelism: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmailConfig {
    /// Resend API key. Email delivery is disabled when unset.
    pub resend_api_key: Option<String>,

    pub from_address: String,

    pub api_base_url: String,

    pub request_timeout_seconds: u64,

    /// When no provider is configured, return the reset link in the API response
    /// instead of only logging it. Meant for development setups.
    pub expose_reset_link_when_unconfigured: bool,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            resend_api_key: None,
            from_address: "onboarding@resend.dev".to_string(),
            api_base_url: "https://api.resend.com".to_string(),
            request_timeout_seconds: 15,
            expose_reset_link_when_unconfigured: true,
        }
    }
}

impl EmailConfig {
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.resend_api_key
            .as_deref()
            .is_some_and(|key| !key.trim().is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetentionConfig {
    pub enabled: bool,

    /// Activity log entries older than this are purged (default: 180 = six 30-day months)
    pub horizon_days: u32,

    pub interval_hours: u32,

    /// Overrides `interval_hours` when set (six-field cron, seconds first).
    pub cron_expression: Option<String>,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            horizon_days: 180,
            interval_hours: 24,
            cron_expression: None,
        }
    }
}

impl RetentionConfig {
    #[must_use]
    pub const fn horizon_seconds(&self) -> i64 {
        self.horizon_days as i64 * 24 * 60 * 60
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub metrics_enabled: bool,

    pub loki_enabled: bool,

    pub loki_url: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            metrics_enabled: false,
            loki_enabled: false,
            loki_url: "http://localhost:3100".to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            server: ServerConfig::default(),
            security: SecurityConfig::default(),
            email: EmailConfig::default(),
            retention: RetentionConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

impl Config {
    /// Loads the first config file found, then applies environment overrides
    /// (including a `.env` file in the working directory).
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let mut config = Self::load_file()?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    fn load_file() -> Result<Self> {
        for path in &Self::config_paths() {
            if path.exists() {
                info!("Loading config from: {}", path.display());
                return Self::load_from_path(path);
            }
        }

        info!("No config file found, using defaults");
        Ok(Self::default())
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("DATABASE_URL") {
            self.general.database_path = url;
        }
        if let Some(level) = lookup("LOG_LEVEL") {
            self.general.log_level = level;
        }
        if let Some(port) = lookup("PORT").and_then(|p| p.parse().ok()) {
            self.server.port = port;
        }
        if let Some(url) = lookup("FRONTEND_URL") {
            self.server.frontend_url = url;
        }
        if let Some(secret) = lookup("JWT_SECRET") {
            self.security.jwt_secret = secret;
        }
        if let Some(key) = lookup("RESEND_API_KEY") {
            self.email.resend_api_key = Some(key);
        }
        if let Some(from) = lookup("RESEND_FROM") {
            self.email.from_address = from;
        }
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Config saved to: {}", path.display());
        Ok(())
    }

    fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![Self::default_config_path()];

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("inventory-master").join("config.toml"));
        }

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".inventory-master").join("config.toml"));
        }

        paths
    }

    fn default_config_path() -> PathBuf {
        PathBuf::from("config.toml")
    }

    pub fn create_default_if_missing() -> Result<bool> {
        let path = Self::default_config_path();
        if path.exists() {
            Ok(false)
        } else {
            Self::default().save_to_path(&path)?;
            info!("Created default config file: {}", path.display());
            Ok(true)
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.security.jwt_secret.is_empty() {
            anyhow::bail!("security.jwt_secret cannot be empty");
        }

        if self.security.jwt_secret == DEV_JWT_SECRET {
            warn!("Using the development JWT secret; set JWT_SECRET before deploying");
        }

        if self.security.session_ttl_days <= 0 {
            anyhow::bail!("security.session_ttl_days must be > 0");
        }

        if self.security.reset_token_ttl_minutes <= 0 {
            anyhow::bail!("security.reset_token_ttl_minutes must be > 0");
        }

        if self.retention.enabled {
            if self.retention.horizon_days == 0 {
                anyhow::bail!("retention.horizon_days must be > 0");
            }
            if self.retention.interval_hours == 0 && self.retention.cron_expression.is_none() {
                anyhow::bail!("Retention interval must be > 0 or cron expression must be set");
            }
        }

        url::Url::parse(&self.server.frontend_url).context("server.frontend_url is not a URL")?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.security.session_ttl_days, 7);
        assert_eq!(config.security.reset_token_ttl_minutes, 30);
        assert_eq!(config.retention.horizon_days, 180);
        assert_eq!(config.retention.interval_hours, 24);
        assert_eq!(config.retention.horizon_seconds(), 180 * 86_400);
        assert!(!config.email.is_configured());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[security]"));
        assert!(toml_str.contains("[retention]"));
    }

    #[test]
    fn test_config_deserialization() {
        let toml_str = r#"
            [general]
            log_level = "debug"

            [retention]
            interval_hours = 6
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.general.log_level, "debug");
        assert_eq!(config.retention.interval_hours, 6);
        assert_eq!(config.retention.horizon_days, 180);
        assert_eq!(config.server.port, 5000);
    }

    #[test]
    fn env_overrides_take_precedence() {
        let mut config = Config::default();
        config.apply_env_overrides(|key| match key {
            "JWT_SECRET" => Some("s3cret".to_string()),
            "PORT" => Some("8081".to_string()),
            "RESEND_API_KEY" => Some("re_123".to_string()),
            _ => None,
        });

        assert_eq!(config.security.jwt_secret, "s3cret");
        assert_eq!(config.server.port, 8081);
        assert!(config.email.is_configured());
    }

    #[test]
    fn validate_rejects_bad_values() {
        let mut config = Config::default();
        config.security.jwt_secret = String::new();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.retention.interval_hours = 0;
        assert!(config.validate().is_err());
        config.retention.cron_expression = Some("0 0 3 * * *".to_string());
        assert!(config.validate().is_ok());

        let mut config = Config::default();
        config.server.frontend_url = "not a url".to_string();
        assert!(config.validate().is_err());
    }
}
