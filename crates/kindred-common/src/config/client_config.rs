//! Client configuration structs
//!
//! Loads configuration from environment variables (and a `.env` file when present).

use serde::Deserialize;
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Main client configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    pub app: AppSettings,
    pub gateway: GatewayConfig,
    pub api: ApiConfig,
    pub presence: PresenceConfig,
    pub typing: TypingConfig,
    pub notifications: NotificationConfig,
    pub storage: StorageConfig,
}

/// General application settings
#[derive(Debug, Clone, Deserialize)]
pub struct AppSettings {
    #[serde(default = "default_app_name")]
    pub name: String,
    #[serde(default = "default_app_version")]
    pub version: String,
    #[serde(default)]
    pub env: Environment,
}

/// Environment type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    #[must_use]
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    #[must_use]
    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "production" => Ok(Self::Production),
            "staging" => Ok(Self::Staging),
            "development" => Ok(Self::Development),
            _ => Err(format!("unknown environment: {s}")),
        }
    }
}

/// Realtime gateway connection settings
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    /// WebSocket endpoint, e.g. `wss://api.example.com/realtime`
    pub url: String,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    #[serde(default = "default_handshake_timeout_ms")]
    pub handshake_timeout_ms: u64,
    #[serde(default = "default_reconnect_delay_min_ms")]
    pub reconnect_delay_min_ms: u64,
    #[serde(default = "default_reconnect_delay_max_ms")]
    pub reconnect_delay_max_ms: u64,
    /// Pause between a successful connect and re-announcing session state
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,
}

impl GatewayConfig {
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    #[must_use]
    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_millis(self.handshake_timeout_ms)
    }

    #[must_use]
    pub fn reconnect_delay_min(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_min_ms)
    }

    #[must_use]
    pub fn reconnect_delay_max(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_max_ms)
    }

    #[must_use]
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

/// REST API settings
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
}

impl ApiConfig {
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    #[must_use]
    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }
}

/// Presence cache settings
#[derive(Debug, Clone, Deserialize)]
pub struct PresenceConfig {
    #[serde(default = "default_presence_ttl_secs")]
    pub ttl_secs: u64,
    #[serde(default = "default_presence_query_timeout_ms")]
    pub query_timeout_ms: u64,
    #[serde(default = "default_presence_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

impl PresenceConfig {
    #[must_use]
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    #[must_use]
    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.query_timeout_ms)
    }

    #[must_use]
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

/// Typing indicator settings
#[derive(Debug, Clone, Deserialize)]
pub struct TypingConfig {
    #[serde(default = "default_typing_idle_timeout_ms")]
    pub idle_timeout_ms: u64,
}

impl TypingConfig {
    #[must_use]
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms)
    }
}

/// Notification gate settings
#[derive(Debug, Clone, Deserialize)]
pub struct NotificationConfig {
    /// Dedup record size that triggers eviction
    #[serde(default = "default_dedup_capacity")]
    pub dedup_capacity: usize,
    /// Number of oldest dedup keys dropped per eviction
    #[serde(default = "default_dedup_evict_batch")]
    pub dedup_evict_batch: usize,
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
    #[serde(default)]
    pub project_id: Option<String>,
}

/// Local persistence settings
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_storage_path")]
    pub path: String,
}

// Default value functions
fn default_app_name() -> String {
    "kindred".to_string()
}

fn default_app_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn default_api_base_url() -> String {
    "http://127.0.0.1:3000/api".to_string()
}

fn default_connect_timeout_ms() -> u64 {
    15_000
}

fn default_handshake_timeout_ms() -> u64 {
    10_000
}

fn default_reconnect_delay_min_ms() -> u64 {
    1_000
}

fn default_reconnect_delay_max_ms() -> u64 {
    5_000
}

fn default_settle_delay_ms() -> u64 {
    100
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_base_delay_ms() -> u64 {
    1_000
}

fn default_presence_ttl_secs() -> u64 {
    300 // 5 minutes
}

fn default_presence_query_timeout_ms() -> u64 {
    10_000
}

fn default_presence_sweep_interval_secs() -> u64 {
    60
}

fn default_typing_idle_timeout_ms() -> u64 {
    3_000
}

fn default_dedup_capacity() -> usize {
    1_000
}

fn default_dedup_evict_batch() -> usize {
    500
}

fn default_history_limit() -> usize {
    100
}

fn default_storage_path() -> String {
    "./kindred-store.json".to_string()
}

/// Read an optional variable, falling back to `default` when unset
fn parse_var<T: FromStr>(name: &'static str, default: fn() -> T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(name, raw)),
        Err(_) => Ok(default()),
    }
}

impl ClientConfig {
    /// Configuration with every default applied and the given gateway endpoint
    #[must_use]
    pub fn with_gateway_url(url: impl Into<String>) -> Self {
        Self {
            app: AppSettings {
                name: default_app_name(),
                version: default_app_version(),
                env: Environment::default(),
            },
            gateway: GatewayConfig {
                url: url.into(),
                connect_timeout_ms: default_connect_timeout_ms(),
                handshake_timeout_ms: default_handshake_timeout_ms(),
                reconnect_delay_min_ms: default_reconnect_delay_min_ms(),
                reconnect_delay_max_ms: default_reconnect_delay_max_ms(),
                settle_delay_ms: default_settle_delay_ms(),
            },
            api: ApiConfig {
                base_url: default_api_base_url(),
                request_timeout_ms: default_request_timeout_ms(),
                max_attempts: default_max_attempts(),
                retry_base_delay_ms: default_retry_base_delay_ms(),
            },
            presence: PresenceConfig {
                ttl_secs: default_presence_ttl_secs(),
                query_timeout_ms: default_presence_query_timeout_ms(),
                sweep_interval_secs: default_presence_sweep_interval_secs(),
            },
            typing: TypingConfig {
                idle_timeout_ms: default_typing_idle_timeout_ms(),
            },
            notifications: NotificationConfig {
                dedup_capacity: default_dedup_capacity(),
                dedup_evict_batch: default_dedup_evict_batch(),
                history_limit: default_history_limit(),
                project_id: None,
            },
            storage: StorageConfig {
                path: default_storage_path(),
            },
        }
    }

    /// Load configuration from environment variables
    ///
    /// # Errors
    /// Returns an error if `KINDRED_GATEWAY_URL` is missing or a variable cannot be parsed
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let config = Self {
            app: AppSettings {
                name: env::var("KINDRED_APP_NAME").unwrap_or_else(|_| default_app_name()),
                version: env::var("KINDRED_APP_VERSION")
                    .unwrap_or_else(|_| default_app_version()),
                env: env::var("KINDRED_ENV")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or_default(),
            },
            gateway: GatewayConfig {
                url: env::var("KINDRED_GATEWAY_URL")
                    .map_err(|_| ConfigError::MissingVar("KINDRED_GATEWAY_URL"))?,
                connect_timeout_ms: parse_var(
                    "KINDRED_CONNECT_TIMEOUT_MS",
                    default_connect_timeout_ms,
                )?,
                handshake_timeout_ms: parse_var(
                    "KINDRED_HANDSHAKE_TIMEOUT_MS",
                    default_handshake_timeout_ms,
                )?,
                reconnect_delay_min_ms: parse_var(
                    "KINDRED_RECONNECT_DELAY_MIN_MS",
                    default_reconnect_delay_min_ms,
                )?,
                reconnect_delay_max_ms: parse_var(
                    "KINDRED_RECONNECT_DELAY_MAX_MS",
                    default_reconnect_delay_max_ms,
                )?,
                settle_delay_ms: parse_var("KINDRED_SETTLE_DELAY_MS", default_settle_delay_ms)?,
            },
            api: ApiConfig {
                base_url: env::var("KINDRED_API_URL").unwrap_or_else(|_| default_api_base_url()),
                request_timeout_ms: parse_var(
                    "KINDRED_API_TIMEOUT_MS",
                    default_request_timeout_ms,
                )?,
                max_attempts: parse_var("KINDRED_API_MAX_ATTEMPTS", default_max_attempts)?,
                retry_base_delay_ms: parse_var(
                    "KINDRED_API_RETRY_DELAY_MS",
                    default_retry_base_delay_ms,
                )?,
            },
            presence: PresenceConfig {
                ttl_secs: parse_var("KINDRED_PRESENCE_TTL_SECS", default_presence_ttl_secs)?,
                query_timeout_ms: parse_var(
                    "KINDRED_PRESENCE_QUERY_TIMEOUT_MS",
                    default_presence_query_timeout_ms,
                )?,
                sweep_interval_secs: parse_var(
                    "KINDRED_PRESENCE_SWEEP_SECS",
                    default_presence_sweep_interval_secs,
                )?,
            },
            typing: TypingConfig {
                idle_timeout_ms: parse_var(
                    "KINDRED_TYPING_TIMEOUT_MS",
                    default_typing_idle_timeout_ms,
                )?,
            },
            notifications: NotificationConfig {
                dedup_capacity: parse_var("KINDRED_DEDUP_CAPACITY", default_dedup_capacity)?,
                dedup_evict_batch: parse_var(
                    "KINDRED_DEDUP_EVICT_BATCH",
                    default_dedup_evict_batch,
                )?,
                history_limit: parse_var(
                    "KINDRED_NOTIFICATION_HISTORY",
                    default_history_limit,
                )?,
                project_id: env::var("KINDRED_PROJECT_ID").ok(),
            },
            storage: StorageConfig {
                path: env::var("KINDRED_STORAGE_PATH").unwrap_or_else(|_| default_storage_path()),
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints
    ///
    /// # Errors
    /// Returns an error describing the first violated constraint
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.gateway.url.starts_with("ws://") || self.gateway.url.starts_with("wss://")) {
            return Err(ConfigError::InvalidValue(
                "KINDRED_GATEWAY_URL",
                self.gateway.url.clone(),
            ));
        }
        if self.gateway.reconnect_delay_min_ms > self.gateway.reconnect_delay_max_ms {
            return Err(ConfigError::InvalidValue(
                "KINDRED_RECONNECT_DELAY_MIN_MS",
                format!(
                    "{} exceeds maximum {}",
                    self.gateway.reconnect_delay_min_ms, self.gateway.reconnect_delay_max_ms
                ),
            ));
        }
        if self.notifications.dedup_evict_batch == 0
            || self.notifications.dedup_evict_batch > self.notifications.dedup_capacity
        {
            return Err(ConfigError::InvalidValue(
                "KINDRED_DEDUP_EVICT_BATCH",
                self.notifications.dedup_evict_batch.to_string(),
            ));
        }
        if self.api.max_attempts == 0 {
            return Err(ConfigError::InvalidValue(
                "KINDRED_API_MAX_ATTEMPTS",
                "0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}
