//! Session wiring
//!
//! [`RealtimeSession`] assembles the connection manager, the notification gate and
//! device registration from one [`ClientConfig`] and a set of collaborators, and routes
//! notifiable events from the dispatcher to the gate.

use kindred_cache::{DedupKey, MemoryStore, SharedClock, SystemClock};
use kindred_common::{ClientConfig, ClientError, ClientResult};
use kindred_core::{
    AckResponse, AuthProvider, DeviceId, DeviceRegistrationApi, EventKind, KeyValueStore,
    MessageId, NotificationPresenter, NotificationSettings, NotificationSettingsPatch,
    PushProvider, SendMessageRequest,
};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

use crate::api::RestDeviceApi;
use crate::connection::{ClientOptions, RealtimeClient};
use crate::notify::{DeviceRegistrar, LogPresenter, NotificationGate, StaticPushProvider};
use crate::transport::{Transport, WsTransport};

/// Builder for [`RealtimeSession`]
///
/// Only the auth provider is required. Defaults: WebSocket transport and REST device
/// API from the config, in-memory store, no push token, log presenter, system clock.
pub struct SessionBuilder {
    config: ClientConfig,
    transport: Option<Arc<dyn Transport>>,
    auth: Option<Arc<dyn AuthProvider>>,
    store: Option<Arc<dyn KeyValueStore>>,
    push: Option<Arc<dyn PushProvider>>,
    api: Option<Arc<dyn DeviceRegistrationApi>>,
    presenter: Option<Arc<dyn NotificationPresenter>>,
    clock: Option<SharedClock>,
}

impl SessionBuilder {
    #[must_use]
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            transport: None,
            auth: None,
            store: None,
            push: None,
            api: None,
            presenter: None,
            clock: None,
        }
    }

    #[must_use]
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    #[must_use]
    pub fn auth(mut self, auth: Arc<dyn AuthProvider>) -> Self {
        self.auth = Some(auth);
        self
    }

    #[must_use]
    pub fn store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.store = Some(store);
        self
    }

    #[must_use]
    pub fn push_provider(mut self, push: Arc<dyn PushProvider>) -> Self {
        self.push = Some(push);
        self
    }

    #[must_use]
    pub fn device_api(mut self, api: Arc<dyn DeviceRegistrationApi>) -> Self {
        self.api = Some(api);
        self
    }

    #[must_use]
    pub fn presenter(mut self, presenter: Arc<dyn NotificationPresenter>) -> Self {
        self.presenter = Some(presenter);
        self
    }

    #[must_use]
    pub fn clock(mut self, clock: SharedClock) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Restore persisted state and wire the session.
    ///
    /// # Errors
    /// - [`ClientError::Config`] without an auth provider
    /// - storage errors while restoring the device registry
    pub async fn build(self) -> ClientResult<RealtimeSession> {
        let auth = self
            .auth
            .ok_or_else(|| ClientError::Config("an auth provider is required".to_string()))?;
        let transport: Arc<dyn Transport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(WsTransport::from_config(&self.config.gateway)),
        };
        let api: Arc<dyn DeviceRegistrationApi> = match self.api {
            Some(api) => api,
            None => Arc::new(RestDeviceApi::new(&self.config.api, auth.clone())?),
        };
        let store: Arc<dyn KeyValueStore> = match self.store {
            Some(store) => store,
            None => Arc::new(MemoryStore::new()),
        };
        let push: Arc<dyn PushProvider> = match self.push {
            Some(push) => push,
            None => Arc::new(StaticPushProvider::unavailable()),
        };
        let presenter: Arc<dyn NotificationPresenter> = match self.presenter {
            Some(presenter) => presenter,
            None => Arc::new(LogPresenter),
        };
        let clock: SharedClock = match self.clock {
            Some(clock) => clock,
            None => Arc::new(SystemClock),
        };

        let registrar = Arc::new(
            DeviceRegistrar::load(
                push,
                api,
                store.clone(),
                self.config.app.version.clone(),
                self.config.notifications.project_id.clone(),
            )
            .await?,
        );
        let gate = Arc::new(
            NotificationGate::load(registrar.clone(), presenter, store, &self.config.notifications)
                .await,
        );
        let client = RealtimeClient::with_clock(
            ClientOptions::from(&self.config),
            transport,
            auth.clone(),
            clock,
        );

        let session = RealtimeSession {
            client,
            gate,
            registrar,
            auth,
        };
        session.wire_handlers();
        Ok(session)
    }
}

/// A connection manager with notifications and device registration attached
pub struct RealtimeSession {
    client: RealtimeClient,
    gate: Arc<NotificationGate>,
    registrar: Arc<DeviceRegistrar>,
    auth: Arc<dyn AuthProvider>,
}

impl std::fmt::Debug for RealtimeSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeSession")
            .field("client", &self.client)
            .field("gate", &self.gate)
            .finish_non_exhaustive()
    }
}

impl RealtimeSession {
    #[must_use]
    pub fn builder(config: ClientConfig) -> SessionBuilder {
        SessionBuilder::new(config)
    }

    fn wire_handlers(&self) {
        for kind in [EventKind::NewMessage, EventKind::NewLike, EventKind::NewMatch] {
            let gate = self.gate.clone();
            self.client.on(kind, move |event| {
                gate.handle(event);
                Ok(())
            });
        }

        let registrar = self.registrar.clone();
        let auth = self.auth.clone();
        self.client.on(EventKind::Connect, move |_| {
            let registrar = registrar.clone();
            let auth = auth.clone();
            tokio::spawn(async move {
                let user_id = auth.current_user_id().await;
                registrar.reconcile(user_id).await;
            });
            Ok(())
        });
    }

    /// Connect as the signed-in user
    ///
    /// # Errors
    /// See [`RealtimeClient::connect`]
    pub async fn connect(&self) -> ClientResult<()> {
        let user_id = self.auth.current_user_id().await;
        debug!(user_id = ?user_id, "Starting session");
        self.gate.set_current_user(user_id);
        self.client.connect().await
    }

    pub fn disconnect(&self) {
        self.client.disconnect();
        info!("Session closed");
    }

    /// Send a chat message; the stored message is never notified back to this device
    ///
    /// # Errors
    /// See [`RealtimeClient::send_message`]
    pub async fn send_message(&self, request: SendMessageRequest) -> ClientResult<AckResponse> {
        let conversation_id = request.conversation_id.clone();
        let reply = self.client.send_message(request).await?;
        if let Some(message_id) = reply.data().and_then(stored_message_id) {
            self.gate
                .record_delivered(DedupKey::message(&conversation_id, &message_id));
        }
        Ok(reply)
    }

    /// Register this device for push delivery
    ///
    /// # Errors
    /// See [`DeviceRegistrar::register`]
    pub async fn register_device(&self) -> ClientResult<DeviceId> {
        let user_id = self.auth.current_user_id().await;
        self.registrar.register(user_id).await
    }

    /// # Errors
    /// See [`DeviceRegistrar::unregister`]
    pub async fn unregister_device(&self) -> ClientResult<()> {
        self.registrar.unregister().await
    }

    #[must_use]
    pub fn is_device_registered(&self) -> bool {
        self.registrar.is_device_registered()
    }

    /// # Errors
    /// Returns an error if the settings cannot be stored
    pub async fn update_notification_settings(
        &self,
        patch: NotificationSettingsPatch,
    ) -> ClientResult<NotificationSettings> {
        Ok(self.gate.update_settings(patch).await?)
    }

    #[must_use]
    pub fn client(&self) -> &RealtimeClient {
        &self.client
    }

    #[must_use]
    pub fn gate(&self) -> &Arc<NotificationGate> {
        &self.gate
    }

    #[must_use]
    pub fn registrar(&self) -> &Arc<DeviceRegistrar> {
        &self.registrar
    }
}

/// Message id in a `send_message` reply: `data._id`, `data.id` or `data.message._id`
fn stored_message_id(data: &Value) -> Option<MessageId> {
    let id = data
        .get("_id")
        .or_else(|| data.get("id"))
        .or_else(|| data.get("message").and_then(|m| m.get("_id")))?;
    id.as_str().map(MessageId::from)
}
