//! Recording collaborators for notification tests

use async_trait::async_trait;
use kindred_core::{
    DeviceId, DeviceRegistration, DeviceRegistrationApi, DomainError, Notification,
    NotificationPresenter, PortResult, RegisteredDevice,
};
use parking_lot::Mutex;

#[derive(Default)]
pub(crate) struct RecordingPresenter {
    pub presented: Mutex<Vec<Notification>>,
}

impl RecordingPresenter {
    pub(crate) fn count(&self) -> usize {
        self.presented.lock().len()
    }
}

#[async_trait]
impl NotificationPresenter for RecordingPresenter {
    async fn present(&self, notification: &Notification) -> PortResult<()> {
        self.presented.lock().push(notification.clone());
        Ok(())
    }
}

/// Device API that records calls and can be told to fail
#[derive(Default)]
pub(crate) struct FakeDeviceApi {
    pub registrations: Mutex<Vec<DeviceRegistration>>,
    pub unregistered: Mutex<Vec<DeviceId>>,
    pub server_devices: Mutex<Vec<RegisteredDevice>>,
    pub fail_register: Mutex<Option<fn() -> DomainError>>,
}

impl FakeDeviceApi {
    pub(crate) fn fail_register_with(&self, make: Option<fn() -> DomainError>) {
        *self.fail_register.lock() = make;
    }

    pub(crate) fn register_calls(&self) -> usize {
        self.registrations.lock().len()
    }
}

#[async_trait]
impl DeviceRegistrationApi for FakeDeviceApi {
    async fn register(&self, registration: &DeviceRegistration) -> PortResult<()> {
        self.registrations.lock().push(registration.clone());
        if let Some(make) = *self.fail_register.lock() {
            return Err(make());
        }
        self.server_devices.lock().push(RegisteredDevice {
            device_id: registration.device_id.clone(),
            platform: registration.platform.clone(),
            push_token: Some(registration.push_token.clone()),
            last_seen: None,
        });
        Ok(())
    }

    async fn unregister(&self, device_id: &DeviceId, _push_token: &str) -> PortResult<()> {
        self.unregistered.lock().push(device_id.clone());
        self.server_devices
            .lock()
            .retain(|device| &device.device_id != device_id);
        Ok(())
    }

    async fn list_devices(&self) -> PortResult<Vec<RegisteredDevice>> {
        Ok(self.server_devices.lock().clone())
    }
}
