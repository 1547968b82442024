//! Collaborator traits (ports)
//!
//! The client defines what it needs from its environment; the host application (or the
//! adapters shipped in `kindred-cache` and `kindred-realtime`) provides implementations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::notification::Notification;
use crate::outbound::DeviceRegistration;
use crate::value_objects::{DeviceId, UserId};

/// Result type for port operations
pub type PortResult<T> = Result<T, DomainError>;

// ============================================================================
// Authentication
// ============================================================================

#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Bearer credential for the realtime handshake, if a user is signed in
    async fn credential(&self) -> Option<String>;

    /// Identifier of the signed-in user
    async fn current_user_id(&self) -> Option<UserId>;
}

// ============================================================================
// Persistence
// ============================================================================

/// Durable string-keyed storage
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> PortResult<Option<String>>;

    async fn set(&self, key: &str, value: &str) -> PortResult<()>;

    async fn remove(&self, key: &str) -> PortResult<()>;
}

// ============================================================================
// Push Notifications
// ============================================================================

/// Source of device capability tokens
#[async_trait]
pub trait PushProvider: Send + Sync {
    /// Obtain the push token for this install; `None` when permission was denied
    async fn device_token(&self) -> PortResult<Option<String>>;

    /// Invalidate a previously issued token
    async fn revoke_token(&self, token: &str) -> PortResult<()>;

    /// Platform name reported at registration ("ios", "android", ...)
    fn platform(&self) -> &str;
}

/// Displays notifications to the user
#[async_trait]
pub trait NotificationPresenter: Send + Sync {
    async fn present(&self, notification: &Notification) -> PortResult<()>;
}

// ============================================================================
// Device Registration
// ============================================================================

/// A device as known by the server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisteredDevice {
    pub device_id: DeviceId,
    #[serde(default)]
    pub platform: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub push_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_seen: Option<DateTime<Utc>>,
}

/// Server-side device registration
#[async_trait]
pub trait DeviceRegistrationApi: Send + Sync {
    /// Register this device for push delivery
    async fn register(&self, registration: &DeviceRegistration) -> PortResult<()>;

    /// Remove this device from push delivery
    async fn unregister(&self, device_id: &DeviceId, push_token: &str) -> PortResult<()>;

    /// Devices registered for the signed-in user
    async fn list_devices(&self) -> PortResult<Vec<RegisteredDevice>>;
}
