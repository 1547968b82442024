//! Client error types
//!
//! Every failure a caller of the realtime client can observe.

use kindred_core::DomainError;
use std::fmt;
use std::time::Duration;

use crate::config::ConfigError;

/// Client-wide error type
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    // Authentication errors
    #[error("No authentication credential available")]
    AuthMissing,

    #[error("Authentication rejected: {0}")]
    AuthRejected(String),

    // Connection errors
    #[error("Connection attempt timed out after {0:?}")]
    ConnectTimeout(Duration),

    #[error("Transient network error: {0}")]
    TransientNetwork(String),

    #[error("Not connected to server")]
    NotConnected,

    // Operation errors
    #[error("Failed to emit {event}: {reason}")]
    EmitFailure { event: String, reason: String },

    #[error("Remote query failed: {0}")]
    RemoteQuery(String),

    #[error("Request rejected by server: {0}")]
    Rejected(String),

    #[error("Operation cancelled")]
    Cancelled,

    // Notification errors
    #[error("Push token unavailable")]
    PushTokenUnavailable,

    // Local errors
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    // Domain errors
    #[error(transparent)]
    Domain(#[from] DomainError),

    // Internal errors
    #[error("Internal error")]
    Internal(#[source] anyhow::Error),
}

impl ClientError {
    /// Get a stable error code
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::AuthMissing => "AUTH_MISSING",
            Self::AuthRejected(_) => "AUTH_REJECTED",
            Self::ConnectTimeout(_) => "CONNECT_TIMEOUT",
            Self::TransientNetwork(_) => "TRANSIENT_NETWORK_ERROR",
            Self::NotConnected => "NOT_CONNECTED",
            Self::EmitFailure { .. } => "EMIT_FAILURE",
            Self::RemoteQuery(_) => "REMOTE_QUERY_FAILURE",
            Self::Rejected(_) => "REJECTED",
            Self::Cancelled => "CANCELLED",
            Self::PushTokenUnavailable => "PUSH_TOKEN_UNAVAILABLE",
            Self::Storage(_) => "STORAGE_ERROR",
            Self::Config(_) => "CONFIG_ERROR",
            Self::InvalidPayload(_) => "INVALID_PAYLOAD",
            Self::Internal(_) => "INTERNAL_ERROR",
            Self::Domain(e) => e.code(),
        }
    }

    /// Whether the same operation may succeed later without user intervention
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::ConnectTimeout(_)
            | Self::TransientNetwork(_)
            | Self::NotConnected
            | Self::EmitFailure { .. }
            | Self::RemoteQuery(_) => true,
            Self::Domain(e) => e.is_transient(),
            _ => false,
        }
    }

    /// Check if this error requires the user to sign in again
    #[must_use]
    pub fn is_auth_error(&self) -> bool {
        match self {
            Self::AuthMissing | Self::AuthRejected(_) => true,
            Self::Domain(e) => e.is_authorization(),
            _ => false,
        }
    }

    /// Create an emit failure for an event
    #[must_use]
    pub fn emit_failure(event: impl Into<String>, reason: impl fmt::Display) -> Self {
        Self::EmitFailure {
            event: event.into(),
            reason: reason.to_string(),
        }
    }

    /// Create an internal error from any error
    pub fn internal(err: impl Into<anyhow::Error>) -> Self {
        Self::Internal(err.into())
    }
}

impl From<ConfigError> for ClientError {
    fn from(err: ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidPayload(err.to_string())
    }
}

/// Result type alias for client operations
pub type ClientResult<T> = Result<T, ClientError>;
