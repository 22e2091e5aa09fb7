//! Process configuration for `nimbusd`.
//!
//! Unlike a CLI tool that discovers a project-local config file, this
//! process has exactly one configuration source: environment variables
//! read once at startup into a plain value struct. [`Config::from_env`]
//! is the production entry point; [`ConfigBuilder`] gives tests explicit,
//! deterministic construction without touching the environment.

use std::time::Duration;
use thiserror::Error;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_LOG_ARCHIVE_DIR: &str = "./data/logs";
const DEFAULT_DATABASE_URL: &str = "sqlite://./data/nimbus.db";
const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 3600;

/// Errors raised while assembling a [`Config`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("required environment variable {0} is not set")]
    Missing(&'static str),
}

/// Process-wide configuration, loaded once at startup and passed
/// explicitly to every component that needs it (spec §9 "Global state").
#[derive(Debug, Clone)]
pub struct Config {
    pub default_model: String,
    pub openrouter_api_key: String,
    pub cloudflare_api_token: String,
    pub cloudflare_account_id: String,
    pub auth_token: String,
    pub database_url: String,
    pub log_archive_dir: String,
    pub bind_addr: String,
    pub sweep_interval: Duration,
    /// Base URL of the external sandbox-provisioning API (spec §1 "the
    /// container-sandbox runtime", out of scope). Unset means there is
    /// no such endpoint configured, and the process provisions
    /// in-process sandboxes instead — the only way to run this binary
    /// standalone without a separate sandbox-runtime deployment.
    pub sandbox_api_url: Option<String>,
}

impl Config {
    /// Load configuration from the process environment.
    ///
    /// # Errors
    /// Returns `ConfigError::Missing` for any of the required credentials
    /// (`DEFAULT_MODEL`, `OPENROUTER_API_KEY`, `CLOUDFLARE_API_TOKEN`,
    /// `CLOUDFLARE_ACCOUNT_ID`, `AUTH_TOKEN`). The remaining fields have
    /// process defaults and are never missing.
    pub fn from_env() -> Result<Self, ConfigError> {
        ConfigBuilder::new()
            .default_model(required_env("DEFAULT_MODEL")?)
            .openrouter_api_key(required_env("OPENROUTER_API_KEY")?)
            .cloudflare_api_token(required_env("CLOUDFLARE_API_TOKEN")?)
            .cloudflare_account_id(required_env("CLOUDFLARE_ACCOUNT_ID")?)
            .auth_token(required_env("AUTH_TOKEN")?)
            .database_url(optional_env("DATABASE_URL", DEFAULT_DATABASE_URL))
            .log_archive_dir(optional_env("LOG_ARCHIVE_DIR", DEFAULT_LOG_ARCHIVE_DIR))
            .bind_addr(optional_env("BIND_ADDR", DEFAULT_BIND_ADDR))
            .sweep_interval(Duration::from_secs(optional_u64(
                "SWEEP_INTERVAL_SECS",
                DEFAULT_SWEEP_INTERVAL_SECS,
            )))
            .sandbox_api_url(std::env::var("SANDBOX_API_URL").ok())
            .build()
    }
}

fn required_env(name: &'static str) -> Result<String, ConfigError> {
    std::env::var(name).map_err(|_| ConfigError::Missing(name))
}

fn optional_env(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn optional_u64(name: &str, default: u64) -> u64 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Explicit builder for [`Config`], mirroring the setter ergonomics of a
/// discovery-based config loader but without a discovery step: every
/// value is either supplied by the caller or defaulted.
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    default_model: Option<String>,
    openrouter_api_key: Option<String>,
    cloudflare_api_token: Option<String>,
    cloudflare_account_id: Option<String>,
    auth_token: Option<String>,
    database_url: Option<String>,
    log_archive_dir: Option<String>,
    bind_addr: Option<String>,
    sweep_interval: Option<Duration>,
    sandbox_api_url: Option<String>,
}

impl ConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn default_model(mut self, value: impl Into<String>) -> Self {
        self.default_model = Some(value.into());
        self
    }

    #[must_use]
    pub fn openrouter_api_key(mut self, value: impl Into<String>) -> Self {
        self.openrouter_api_key = Some(value.into());
        self
    }

    #[must_use]
    pub fn cloudflare_api_token(mut self, value: impl Into<String>) -> Self {
        self.cloudflare_api_token = Some(value.into());
        self
    }

    #[must_use]
    pub fn cloudflare_account_id(mut self, value: impl Into<String>) -> Self {
        self.cloudflare_account_id = Some(value.into());
        self
    }

    #[must_use]
    pub fn auth_token(mut self, value: impl Into<String>) -> Self {
        self.auth_token = Some(value.into());
        self
    }

    #[must_use]
    pub fn database_url(mut self, value: impl Into<String>) -> Self {
        self.database_url = Some(value.into());
        self
    }

    #[must_use]
    pub fn log_archive_dir(mut self, value: impl Into<String>) -> Self {
        self.log_archive_dir = Some(value.into());
        self
    }

    #[must_use]
    pub fn bind_addr(mut self, value: impl Into<String>) -> Self {
        self.bind_addr = Some(value.into());
        self
    }

    #[must_use]
    pub fn sweep_interval(mut self, value: Duration) -> Self {
        self.sweep_interval = Some(value);
        self
    }

    #[must_use]
    pub fn sandbox_api_url(mut self, value: Option<String>) -> Self {
        self.sandbox_api_url = value;
        self
    }

    /// # Errors
    /// Returns `ConfigError::Missing` for any required field left unset.
    pub fn build(self) -> Result<Config, ConfigError> {
        Ok(Config {
            default_model: self
                .default_model
                .ok_or(ConfigError::Missing("DEFAULT_MODEL"))?,
            openrouter_api_key: self
                .openrouter_api_key
                .ok_or(ConfigError::Missing("OPENROUTER_API_KEY"))?,
            cloudflare_api_token: self
                .cloudflare_api_token
                .ok_or(ConfigError::Missing("CLOUDFLARE_API_TOKEN"))?,
            cloudflare_account_id: self
                .cloudflare_account_id
                .ok_or(ConfigError::Missing("CLOUDFLARE_ACCOUNT_ID"))?,
            auth_token: self.auth_token.ok_or(ConfigError::Missing("AUTH_TOKEN"))?,
            database_url: self
                .database_url
                .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            log_archive_dir: self
                .log_archive_dir
                .unwrap_or_else(|| DEFAULT_LOG_ARCHIVE_DIR.to_string()),
            bind_addr: self
                .bind_addr
                .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            sweep_interval: self
                .sweep_interval
                .unwrap_or(Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SECS)),
            sandbox_api_url: self.sandbox_api_url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete_builder() -> ConfigBuilder {
        ConfigBuilder::new()
            .default_model("anthropic/claude-3.5-sonnet")
            .openrouter_api_key("key")
            .cloudflare_api_token("token")
            .cloudflare_account_id("account")
            .auth_token("secret")
    }

    #[test]
    fn builds_with_all_required_fields() {
        let config = complete_builder().build().unwrap();
        assert_eq!(config.default_model, "anthropic/claude-3.5-sonnet");
        assert_eq!(config.bind_addr, DEFAULT_BIND_ADDR);
        assert_eq!(config.sweep_interval, Duration::from_secs(3600));
    }

    #[test]
    fn missing_required_field_errors() {
        let result = ConfigBuilder::new().build();
        assert!(matches!(result, Err(ConfigError::Missing("DEFAULT_MODEL"))));
    }

    #[test]
    fn explicit_overrides_win_over_defaults() {
        let config = complete_builder()
            .bind_addr("127.0.0.1:9000")
            .sweep_interval(Duration::from_secs(60))
            .build()
            .unwrap();
        assert_eq!(config.bind_addr, "127.0.0.1:9000");
        assert_eq!(config.sweep_interval, Duration::from_secs(60));
    }
}
