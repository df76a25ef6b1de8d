//! # Configuration
//!
//! Settings are layered, later sources winning:
//!
//! 1. built-in defaults
//! 2. `config/default.toml` (optional)
//! 3. `config/local.toml` (optional, not committed)
//! 4. environment variables prefixed `EVENTOS__`, sections separated by
//!    `__`, e.g. `EVENTOS__SERVER__PORT=8080` or
//!    `EVENTOS__AUTH__JWT_SECRET=...`
//!
//! A `.env` file in the working directory is loaded first, so its entries
//! behave like real environment variables.

use crate::application::services::{
    CacheServiceConfig, NotificationConfig, PaymentConfig, RetryConfig, TreasuryConfig,
};
use crate::domain::services::RefundPolicyConfig;
use crate::infrastructure::cache::EvictionPolicy;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use thiserror::Error;

/// Secret shipped in the defaults; refused outside development.
pub const DEVELOPMENT_SECRET: &str = "eventos-development-secret";

/// Configuration problems.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A source could not be read or deserialized.
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    /// Values were read but do not make sense together.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Result of loading settings.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// HTTP listener.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Bind address.
    pub host: String,
    /// Bind port.
    pub port: u16,
    /// Origins allowed by CORS; empty allows any.
    pub cors_origins: Vec<String>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            cors_origins: Vec::new(),
        }
    }
}

impl ServerSettings {
    /// Address to bind.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if host and port do not form an address.
    pub fn socket_addr(&self) -> ConfigResult<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| ConfigError::Invalid(format!("server address: {e}")))
    }
}

/// Log output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetrySettings {
    /// Filter directive used when `RUST_LOG` is unset.
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            level: "info,eventos=debug".to_string(),
            json: false,
        }
    }
}

/// API tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthSettings {
    /// HS256 signing secret.
    pub jwt_secret: String,
    /// Lifetime of issued tokens.
    pub token_ttl_secs: i64,
    /// Accept [`DEVELOPMENT_SECRET`]; off in production.
    pub allow_development_secret: bool,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            jwt_secret: DEVELOPMENT_SECRET.to_string(),
            token_ttl_secs: 8 * 3_600,
            allow_development_secret: true,
        }
    }
}

/// Relational store. Without a URL everything is kept in memory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    /// PostgreSQL URL.
    pub url: Option<String>,
    /// Pool size.
    pub max_connections: u32,
    /// Apply embedded migrations at startup.
    pub run_migrations: bool,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: 10,
            run_migrations: true,
        }
    }
}

/// Cache backend kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackendKind {
    /// In-process, bounded by `capacity`.
    #[default]
    Memory,
    /// Shared Redis server.
    Redis,
}

/// Cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Backend.
    pub backend: CacheBackendKind,
    /// Redis URL, required for the Redis backend.
    pub redis_url: Option<String>,
    /// Entries kept by the in-process backend.
    pub capacity: usize,
    /// Victim selection of the in-process backend.
    pub eviction: EvictionPolicy,
    /// Seconds between expiry sweeps of the in-process backend; zero disables.
    pub purge_interval_secs: u64,
    /// Seconds an event dashboard is served from cache.
    pub dashboard_ttl_secs: u64,
    /// Key namespace and default TTL.
    pub service: CacheServiceConfig,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            backend: CacheBackendKind::Memory,
            redis_url: None,
            capacity: 10_000,
            eviction: EvictionPolicy::Lru,
            purge_interval_secs: 60,
            dashboard_ttl_secs: 30,
            service: CacheServiceConfig::default(),
        }
    }
}

/// Payment provider kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GatewayKind {
    /// Sandbox that never leaves the process.
    #[default]
    Simulated,
    /// REST provider at `base_url`.
    Http,
}

/// Payments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaymentSettings {
    /// Provider.
    pub gateway: GatewayKind,
    /// Provider API root.
    pub base_url: Option<String>,
    /// Provider API key.
    pub api_key: Option<String>,
    /// Provider request timeout.
    pub timeout_ms: u64,
    /// Shared secret of webhook signatures.
    pub webhook_secret: String,
    /// Charge retries and velocity window.
    pub charges: PaymentConfig,
}

impl Default for PaymentSettings {
    fn default() -> Self {
        Self {
            gateway: GatewayKind::Simulated,
            base_url: None,
            api_key: None,
            timeout_ms: 10_000,
            webhook_secret: DEVELOPMENT_SECRET.to_string(),
            charges: PaymentConfig::default(),
        }
    }
}

/// Refunds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RefundSettings {
    /// Windows and approval limits.
    pub policy: RefundPolicyConfig,
    /// Backoff for gateway refund calls.
    pub retry: RetryConfig,
}

/// SMTP relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmtpConfig {
    /// Relay host.
    pub host: String,
    /// Relay port.
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    /// Login.
    #[serde(default)]
    pub username: Option<String>,
    /// Password.
    #[serde(default)]
    pub password: Option<String>,
    /// `From` address.
    pub from: String,
    /// Use STARTTLS.
    #[serde(default = "default_true")]
    pub starttls: bool,
}

const fn default_smtp_port() -> u16 {
    587
}

const fn default_true() -> bool {
    true
}

/// An HTTP messaging provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// API root.
    pub base_url: String,
    /// API or server key.
    pub api_key: String,
    /// Request timeout.
    #[serde(default = "default_provider_timeout")]
    pub timeout_ms: u64,
}

const fn default_provider_timeout() -> u64 {
    5_000
}

/// Notifications. Channels without a provider are written to the log.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationSettings {
    /// Retry, rate limit and fan-out.
    pub delivery: NotificationConfig,
    /// E-mail relay.
    pub smtp: Option<SmtpConfig>,
    /// SMS provider.
    pub sms: Option<ProviderConfig>,
    /// Push provider.
    pub push: Option<ProviderConfig>,
}

/// Every setting of the service.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// HTTP listener.
    pub server: ServerSettings,
    /// Logging.
    pub telemetry: TelemetrySettings,
    /// API tokens.
    pub auth: AuthSettings,
    /// Relational store.
    pub database: DatabaseSettings,
    /// Cache.
    pub cache: CacheSettings,
    /// Payments.
    pub payments: PaymentSettings,
    /// Refunds.
    pub refunds: RefundSettings,
    /// Treasury.
    pub treasury: TreasuryConfig,
    /// Notifications.
    pub notifications: NotificationSettings,
}

impl Settings {
    /// Loads `.env`, the files under `config/` and the environment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a source is malformed or the result is invalid.
    pub fn load() -> ConfigResult<Self> {
        // A missing .env is normal.
        let _ = dotenvy::dotenv();
        Self::load_from(Path::new("config"))
    }

    /// Loads the files under `dir` and the environment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a source is malformed or the result is invalid.
    pub fn load_from(dir: &Path) -> ConfigResult<Self> {
        let settings: Self = config::Config::builder()
            .add_source(config::File::from(dir.join("default")).required(false))
            .add_source(config::File::from(dir.join("local")).required(false))
            .add_source(
                config::Environment::with_prefix("EVENTOS")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("server.cors_origins")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Checks values that depend on each other.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` describing the first problem found.
    pub fn validate(&self) -> ConfigResult<()> {
        self.server.socket_addr()?;
        if self.auth.jwt_secret.trim().is_empty() {
            return Err(ConfigError::Invalid("auth.jwt_secret is empty".into()));
        }
        if !self.auth.allow_development_secret && self.auth.jwt_secret == DEVELOPMENT_SECRET {
            return Err(ConfigError::Invalid(
                "auth.jwt_secret still has the development value".into(),
            ));
        }
        if self.auth.token_ttl_secs <= 0 {
            return Err(ConfigError::Invalid("auth.token_ttl_secs must be positive".into()));
        }
        if self.payments.webhook_secret.trim().is_empty() {
            return Err(ConfigError::Invalid("payments.webhook_secret is empty".into()));
        }
        if self.payments.gateway == GatewayKind::Http
            && (self.payments.base_url.is_none() || self.payments.api_key.is_none())
        {
            return Err(ConfigError::Invalid(
                "the http gateway needs payments.base_url and payments.api_key".into(),
            ));
        }
        if self.cache.backend == CacheBackendKind::Redis && self.cache.redis_url.is_none() {
            return Err(ConfigError::Invalid(
                "the redis cache needs cache.redis_url".into(),
            ));
        }
        if self.cache.capacity == 0 {
            return Err(ConfigError::Invalid("cache.capacity must be positive".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let settings = Settings::default();
        settings.validate().unwrap();
        assert_eq!(settings.server.socket_addr().unwrap().port(), 8080);
        assert_eq!(settings.cache.backend, CacheBackendKind::Memory);
        assert!(settings.database.url.is_none());
    }

    #[test]
    fn production_refuses_development_secret() {
        let mut settings = Settings::default();
        settings.auth.allow_development_secret = false;
        assert!(matches!(settings.validate(), Err(ConfigError::Invalid(_))));
        settings.auth.jwt_secret = "a-real-secret".into();
        settings.validate().unwrap();
    }

    #[test]
    fn remote_backends_need_their_urls() {
        let mut settings = Settings::default();
        settings.cache.backend = CacheBackendKind::Redis;
        assert!(settings.validate().is_err());
        settings.cache.redis_url = Some("redis://localhost".into());
        settings.validate().unwrap();

        settings.payments.gateway = GatewayKind::Http;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn missing_files_fall_back_to_defaults() {
        let settings = Settings::load_from(Path::new("does-not-exist")).unwrap();
        assert_eq!(settings.cache.dashboard_ttl_secs, 30);
        assert_eq!(settings.treasury, TreasuryConfig::default());
    }
}
