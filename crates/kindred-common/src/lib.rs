//! # kindred-common
//!
//! Shared utilities including configuration, the client error taxonomy, bearer token
//! inspection, and telemetry.

pub mod auth;
pub mod config;
pub mod error;
pub mod telemetry;

// Re-export commonly used types at crate root
pub use auth::{inspect_token, TokenClaims, TokenError};
pub use config::{
    ApiConfig, AppSettings, ClientConfig, ConfigError, Environment, GatewayConfig,
    NotificationConfig, PresenceConfig, StorageConfig, TypingConfig,
};
pub use error::{ClientError, ClientResult};
pub use telemetry::{try_init_tracing, try_init_tracing_with_config, TracingConfig, TracingError};
