//! Device registration for push delivery
//!
//! A device counts as registered only once a push token was obtained and the server
//! accepted the registration. The token is persisted so the current device id, and
//! with it the gate's registration check, is known at startup without a round-trip.

use kindred_cache::{keys, DeviceRegistry};
use kindred_common::{ClientError, ClientResult};
use kindred_core::{
    DeviceId, DeviceRegistration, DeviceRegistrationApi, KeyValueStore, PortResult,
    PushProvider, UserId,
};
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
struct CurrentDevice {
    device_id: DeviceId,
    push_token: String,
}

impl CurrentDevice {
    fn from_token(push_token: String) -> Self {
        Self {
            device_id: DeviceId::from_push_token(&push_token),
            push_token,
        }
    }
}

pub struct DeviceRegistrar {
    push: Arc<dyn PushProvider>,
    api: Arc<dyn DeviceRegistrationApi>,
    store: Arc<dyn KeyValueStore>,
    registry: DeviceRegistry,
    app_version: String,
    project_id: Option<String>,
    current: RwLock<Option<CurrentDevice>>,
}

impl std::fmt::Debug for DeviceRegistrar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceRegistrar")
            .field("device_id", &self.current_device_id())
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

impl DeviceRegistrar {
    /// Restore the registry and the current device from storage
    ///
    /// # Errors
    /// Returns an error if the store cannot be read
    pub async fn load(
        push: Arc<dyn PushProvider>,
        api: Arc<dyn DeviceRegistrationApi>,
        store: Arc<dyn KeyValueStore>,
        app_version: impl Into<String>,
        project_id: Option<String>,
    ) -> PortResult<Self> {
        let registry = DeviceRegistry::load(store.clone()).await?;
        let current = store
            .get(keys::PUSH_TOKEN)
            .await?
            .filter(|token| !token.is_empty())
            .map(CurrentDevice::from_token);
        debug!(
            registered = !registry.is_empty(),
            has_token = current.is_some(),
            "Device registrar loaded"
        );

        Ok(Self {
            push,
            api,
            store,
            registry,
            app_version: app_version.into(),
            project_id,
            current: RwLock::new(current),
        })
    }

    #[must_use]
    pub fn current_device_id(&self) -> Option<DeviceId> {
        self.current.read().as_ref().map(|c| c.device_id.clone())
    }

    /// Whether this device is in the local registration record
    #[must_use]
    pub fn is_device_registered(&self) -> bool {
        self.current
            .read()
            .as_ref()
            .is_some_and(|c| self.registry.contains(&c.device_id))
    }

    #[must_use]
    pub fn registry(&self) -> &DeviceRegistry {
        &self.registry
    }

    /// Register this device with the server.
    ///
    /// A transient server failure is remembered and retried by
    /// [`DeviceRegistrar::retry_pending`].
    ///
    /// # Errors
    /// - [`ClientError::PushTokenUnavailable`] without a push token
    /// - the server or storage error otherwise
    pub async fn register(&self, user_id: Option<UserId>) -> ClientResult<DeviceId> {
        let token = self
            .push
            .device_token()
            .await?
            .ok_or(ClientError::PushTokenUnavailable)?;
        let device = CurrentDevice::from_token(token);
        self.store.set(keys::PUSH_TOKEN, &device.push_token).await?;
        *self.current.write() = Some(device.clone());

        let registration = DeviceRegistration {
            push_token: device.push_token.clone(),
            platform: self.push.platform().to_string(),
            app_version: self.app_version.clone(),
            device_id: device.device_id.clone(),
            user_id,
            project_id: self.project_id.clone(),
        };

        match self.api.register(&registration).await {
            Ok(()) => {
                self.registry.register(device.device_id.clone()).await?;
                self.store.remove(keys::PENDING_REGISTRATION).await?;
                info!(device_id = %device.device_id, "Device registered for push delivery");
                Ok(device.device_id)
            }
            Err(e) if e.is_transient() => {
                let pending = serde_json::to_string(&registration)?;
                self.store.set(keys::PENDING_REGISTRATION, &pending).await?;
                warn!(device_id = %device.device_id, error = %e, "Registration deferred");
                Err(e.into())
            }
            Err(e) => {
                warn!(device_id = %device.device_id, error = %e, "Registration rejected");
                Err(e.into())
            }
        }
    }

    /// Unregister this device.
    ///
    /// Local state is cleared and the token revoked even when the server call fails;
    /// that failure is still returned.
    pub async fn unregister(&self) -> ClientResult<()> {
        let Some(device) = self.current.read().clone() else {
            debug!("No device to unregister");
            return Ok(());
        };

        let remote = self
            .api
            .unregister(&device.device_id, &device.push_token)
            .await;
        if let Err(e) = &remote {
            warn!(device_id = %device.device_id, error = %e, "Server unregistration failed");
        }
        if let Err(e) = self.push.revoke_token(&device.push_token).await {
            warn!(error = %e, "Failed to revoke push token");
        }

        self.registry.unregister(&device.device_id).await?;
        self.store.remove(keys::PUSH_TOKEN).await?;
        self.store.remove(keys::PENDING_REGISTRATION).await?;
        *self.current.write() = None;
        info!(device_id = %device.device_id, "Device unregistered");

        remote.map_err(Into::into)
    }

    /// Replay a registration that failed transiently; `Ok(true)` if one was sent
    pub async fn retry_pending(&self) -> ClientResult<bool> {
        let Some(raw) = self.store.get(keys::PENDING_REGISTRATION).await? else {
            return Ok(false);
        };
        let registration: DeviceRegistration = match serde_json::from_str(&raw) {
            Ok(registration) => registration,
            Err(e) => {
                warn!(error = %e, "Discarding corrupt pending registration");
                self.store.remove(keys::PENDING_REGISTRATION).await?;
                return Ok(false);
            }
        };

        self.api.register(&registration).await?;
        self.registry.register(registration.device_id.clone()).await?;
        self.store.remove(keys::PENDING_REGISTRATION).await?;
        info!(device_id = %registration.device_id, "Pending registration completed");
        Ok(true)
    }

    /// Bring the server in line with the local record.
    ///
    /// Runs after every connect: a deferred registration is retried, and a device the
    /// server no longer lists is registered again. Failures are logged only.
    pub async fn reconcile(&self, user_id: Option<UserId>) {
        if let Err(e) = self.retry_pending().await {
            warn!(error = %e, "Pending registration still failing");
            return;
        }

        let Some(device_id) = self.current_device_id() else {
            return;
        };
        if !self.registry.contains(&device_id) {
            return;
        }

        match self.api.list_devices().await {
            Ok(devices) if devices.iter().any(|d| d.device_id == device_id) => {
                debug!(device_id = %device_id, "Device registration confirmed");
            }
            Ok(_) => {
                warn!(device_id = %device_id, "Server lost the device, registering again");
                if let Err(e) = self.register(user_id).await {
                    warn!(error = %e, "Re-registration failed");
                }
            }
            Err(e) => debug!(error = %e, "Skipping device reconciliation"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::fakes::FakeDeviceApi;
    use crate::notify::StaticPushProvider;
    use kindred_cache::MemoryStore;
    use kindred_core::DomainError;

    async fn registrar(
        token: Option<&str>,
        api: Arc<FakeDeviceApi>,
        store: Arc<MemoryStore>,
    ) -> DeviceRegistrar {
        DeviceRegistrar::load(
            Arc::new(StaticPushProvider::new(token.map(str::to_string), "android")),
            api,
            store,
            "1.4.0",
            None,
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_register_then_unregister() {
        let api = Arc::new(FakeDeviceApi::default());
        let store = Arc::new(MemoryStore::new());
        let registrar = registrar(Some("tok-1"), api.clone(), store.clone()).await;
        assert!(!registrar.is_device_registered());

        let device_id = registrar.register(Some(UserId::from("me"))).await.unwrap();
        assert_eq!(device_id, DeviceId::from_push_token("tok-1"));
        assert!(registrar.is_device_registered());
        assert_eq!(api.registrations.lock()[0].app_version, "1.4.0");

        registrar.unregister().await.unwrap();
        assert!(!registrar.is_device_registered());
        assert_eq!(api.unregistered.lock().len(), 1);
        assert!(store.get(keys::PUSH_TOKEN).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_register_without_token() {
        let api = Arc::new(FakeDeviceApi::default());
        let registrar = registrar(None, api.clone(), Arc::new(MemoryStore::new())).await;

        let result = registrar.register(None).await;
        assert!(matches!(result, Err(ClientError::PushTokenUnavailable)));
        assert_eq!(api.register_calls(), 0);
    }

    #[tokio::test]
    async fn test_registration_survives_restart() {
        let api = Arc::new(FakeDeviceApi::default());
        let store = Arc::new(MemoryStore::new());
        registrar(Some("tok-1"), api.clone(), store.clone())
            .await
            .register(None)
            .await
            .unwrap();

        let restored = registrar(None, api, store).await;
        assert!(restored.is_device_registered());
        assert_eq!(
            restored.current_device_id(),
            Some(DeviceId::from_push_token("tok-1"))
        );
    }

    #[tokio::test]
    async fn test_transient_failure_is_retried_on_reconcile() {
        let api = Arc::new(FakeDeviceApi::default());
        let store = Arc::new(MemoryStore::new());
        let registrar = registrar(Some("tok-1"), api.clone(), store.clone()).await;

        api.fail_register_with(Some(|| DomainError::Network("offline".into())));
        assert!(registrar.register(None).await.is_err());
        assert!(!registrar.is_device_registered());
        assert!(store.get(keys::PENDING_REGISTRATION).await.unwrap().is_some());

        api.fail_register_with(None);
        registrar.reconcile(None).await;
        assert!(registrar.is_device_registered());
        assert!(store.get(keys::PENDING_REGISTRATION).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_rejection_is_not_remembered() {
        let api = Arc::new(FakeDeviceApi::default());
        let store = Arc::new(MemoryStore::new());
        let registrar = registrar(Some("tok-1"), api.clone(), store.clone()).await;

        api.fail_register_with(Some(|| DomainError::Remote {
            status: 422,
            message: "bad token".into(),
        }));
        assert!(registrar.register(None).await.is_err());
        assert!(store.get(keys::PENDING_REGISTRATION).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_reconcile_reregisters_forgotten_device() {
        let api = Arc::new(FakeDeviceApi::default());
        let registrar = registrar(Some("tok-1"), api.clone(), Arc::new(MemoryStore::new())).await;
        registrar.register(None).await.unwrap();

        api.server_devices.lock().clear();
        registrar.reconcile(None).await;
        assert_eq!(api.register_calls(), 2);
        assert_eq!(api.server_devices.lock().len(), 1);
    }
}
