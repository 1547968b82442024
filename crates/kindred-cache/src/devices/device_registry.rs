//! Persisted set of device ids registered for push delivery

use kindred_core::{DeviceId, KeyValueStore, PortResult};
use parking_lot::RwLock;
use std::collections::BTreeSet;
use std::sync::Arc;

use crate::store::keys;

/// Local record of which device ids this install registered with the server.
///
/// The record is the source of truth for the notification gate. It is persisted as a JSON
/// array under [`keys::REGISTERED_DEVICES`] after every change.
pub struct DeviceRegistry {
    store: Arc<dyn KeyValueStore>,
    devices: RwLock<BTreeSet<DeviceId>>,
}

impl std::fmt::Debug for DeviceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceRegistry")
            .field("devices", &*self.devices.read())
            .finish_non_exhaustive()
    }
}

impl DeviceRegistry {
    /// Load the registry from storage
    ///
    /// A corrupt record is discarded and the registry starts empty.
    ///
    /// # Errors
    /// Returns an error if the store cannot be read
    pub async fn load(store: Arc<dyn KeyValueStore>) -> PortResult<Self> {
        let devices = match store.get(keys::REGISTERED_DEVICES).await? {
            Some(raw) => match serde_json::from_str::<Vec<DeviceId>>(&raw) {
                Ok(list) => list.into_iter().collect(),
                Err(e) => {
                    tracing::warn!(error = %e, "Discarding corrupt device registry");
                    BTreeSet::new()
                }
            },
            None => BTreeSet::new(),
        };

        Ok(Self {
            store,
            devices: RwLock::new(devices),
        })
    }

    #[must_use]
    pub fn contains(&self, device_id: &DeviceId) -> bool {
        self.devices.read().contains(device_id)
    }

    #[must_use]
    pub fn devices(&self) -> Vec<DeviceId> {
        self.devices.read().iter().cloned().collect()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.devices.read().is_empty()
    }

    /// Add a device; returns `true` if it was not recorded yet
    ///
    /// # Errors
    /// Returns an error if the record cannot be persisted
    pub async fn register(&self, device_id: DeviceId) -> PortResult<bool> {
        let added = self.devices.write().insert(device_id);
        if added {
            self.persist().await?;
        }
        Ok(added)
    }

    /// Remove a device; returns `true` if it was recorded
    ///
    /// # Errors
    /// Returns an error if the record cannot be persisted
    pub async fn unregister(&self, device_id: &DeviceId) -> PortResult<bool> {
        let removed = self.devices.write().remove(device_id);
        if removed {
            self.persist().await?;
        }
        Ok(removed)
    }

    /// Replace the whole record
    ///
    /// # Errors
    /// Returns an error if the record cannot be persisted
    pub async fn replace(&self, devices: impl IntoIterator<Item = DeviceId>) -> PortResult<()> {
        *self.devices.write() = devices.into_iter().collect();
        self.persist().await
    }

    async fn persist(&self) -> PortResult<()> {
        let raw = serde_json::to_string(&self.devices())?;
        self.store.set(keys::REGISTERED_DEVICES, &raw).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn test_register_persists() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let registry = DeviceRegistry::load(store.clone()).await.unwrap();

        assert!(registry.register(DeviceId::from("device_a")).await.unwrap());
        assert!(!registry.register(DeviceId::from("device_a")).await.unwrap());
        assert!(registry.contains(&DeviceId::from("device_a")));

        let raw = store.get(keys::REGISTERED_DEVICES).await.unwrap().unwrap();
        assert_eq!(raw, r#"["device_a"]"#);

        let reloaded = DeviceRegistry::load(store).await.unwrap();
        assert!(reloaded.contains(&DeviceId::from("device_a")));
    }

    #[tokio::test]
    async fn test_unregister() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let registry = DeviceRegistry::load(store).await.unwrap();
        registry.register(DeviceId::from("device_a")).await.unwrap();

        assert!(registry.unregister(&DeviceId::from("device_a")).await.unwrap());
        assert!(!registry.unregister(&DeviceId::from("device_a")).await.unwrap());
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_record_starts_empty() {
        let store: Arc<dyn KeyValueStore> =
            Arc::new(MemoryStore::new().with_entry(keys::REGISTERED_DEVICES, "{oops"));
        let registry = DeviceRegistry::load(store).await.unwrap();
        assert!(registry.is_empty());
    }
}
