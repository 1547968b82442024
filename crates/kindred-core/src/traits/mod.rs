//! Ports consumed by the realtime client

mod ports;

pub use ports::{
    AuthProvider, DeviceRegistrationApi, KeyValueStore, NotificationPresenter, PortResult,
    PushProvider, RegisteredDevice,
};
