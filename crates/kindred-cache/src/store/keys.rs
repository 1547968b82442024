//! Storage keys used by the client

/// JSON array of device ids this install has registered
pub const REGISTERED_DEVICES: &str = "registered_devices";
/// Last known push token
pub const PUSH_TOKEN: &str = "push_token";
/// Registration that could not be sent while offline
pub const PENDING_REGISTRATION: &str = "pending_device_registration";
/// Notification preferences
pub const NOTIFICATION_SETTINGS: &str = "notification_settings";
/// Bearer credential of the signed-in user
pub const AUTH_TOKEN: &str = "token";
/// Profile of the signed-in user
pub const AUTH_USER: &str = "user";
