//! Domain errors - failures reported by the ports the client depends on

use thiserror::Error;

/// Errors raised by collaborators (storage, push provider, REST layer)
#[derive(Debug, Error)]
pub enum DomainError {
    // =========================================================================
    // Collaborator Errors
    // =========================================================================
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Push provider error: {0}")]
    PushProvider(String),

    #[error("Notification presenter error: {0}")]
    Presenter(String),

    // =========================================================================
    // Remote Errors
    // =========================================================================
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request rejected with status {status}: {message}")]
    Remote { status: u16, message: String },

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    // =========================================================================
    // Payload Errors
    // =========================================================================
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl DomainError {
    /// Get a stable error code
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Storage(_) => "STORAGE_ERROR",
            Self::PushProvider(_) => "PUSH_PROVIDER_ERROR",
            Self::Presenter(_) => "PRESENTER_ERROR",
            Self::Network(_) => "NETWORK_ERROR",
            Self::Remote { .. } => "REMOTE_ERROR",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::DeviceNotFound(_) => "DEVICE_NOT_FOUND",
            Self::InvalidPayload(_) => "INVALID_PAYLOAD",
            Self::InternalError(_) => "INTERNAL_ERROR",
        }
    }

    /// Whether retrying the same call may succeed.
    ///
    /// Network failures and 5xx responses are transient; 4xx responses and
    /// authorization failures are not.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network(_) => true,
            Self::Remote { status, .. } => *status >= 500 || *status == 408 || *status == 429,
            _ => false,
        }
    }

    /// Check if this is an authorization error
    #[must_use]
    pub fn is_authorization(&self) -> bool {
        matches!(self, Self::Unauthorized | Self::Remote { status: 401 | 403, .. })
    }

    /// Check if this is a "not found" error
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::DeviceNotFound(_) | Self::Remote { status: 404, .. })
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidPayload(err.to_string())
    }
}
