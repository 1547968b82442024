//! Registered device tracking.

mod device_registry;

pub use device_registry::DeviceRegistry;
