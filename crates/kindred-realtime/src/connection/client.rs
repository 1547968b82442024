//! Realtime connection manager
//!
//! Owns the single authenticated connection of a session. All mutable session state
//! sits behind one lock that is never held across an `.await`; transport signals are
//! consumed by one pump task, so inbound events reach the dispatcher in the order the
//! transport delivered them.

use kindred_cache::{PresenceCache, SharedClock, StatusSubscriptions, SystemClock};
use kindred_common::{ClientError, ClientResult};
use kindred_core::{
    AckResponse, AuthProvider, ClientOp, ConnectErrorEvent, ConnectEvent, ConversationId,
    ConversationRequest, DisconnectEvent, EventKind, PrivacySettings, ServerEvent,
};
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};

use super::ack::{AckTable, Acknowledgement, EmitOutcome};
use super::options::ClientOptions;
use super::rooms::RoomMembership;
use super::state::{ConnectionState, ConnectionStatus, HealthStatus};
use crate::broadcast::{EventDispatcher, HandlerId, Subscription};
use crate::protocol::Frame;
use crate::queue::{OutboundQueue, PendingEvent};
use crate::transport::{Transport, TransportError, TransportSignal};

/// Encode an outbound payload. Request types are plain data, so this cannot fail in
/// practice; a failure degrades to `null`.
pub(crate) fn to_payload<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or_default()
}

pub(crate) struct TypingTimer {
    pub(crate) generation: u64,
    pub(crate) handle: JoinHandle<()>,
}

/// Session state guarded by [`ClientInner::session`]
#[derive(Default)]
pub(crate) struct SessionState {
    pub(crate) connection: ConnectionState,
    pub(crate) session_id: Option<String>,
    pub(crate) reconnect_attempts: u32,
    pub(crate) has_connected: bool,
    /// Connected, but rooms and queue not replayed yet
    pub(crate) settling: bool,
    pub(crate) rooms: RoomMembership,
    pub(crate) subscriptions: StatusSubscriptions,
    pub(crate) queue: OutboundQueue,
    pub(crate) typing: HashMap<ConversationId, TypingTimer>,
    pub(crate) typing_generation: u64,
    pub(crate) privacy: Option<PrivacySettings>,
    waiter: Option<oneshot::Sender<ClientResult<()>>>,
    pump: Option<JoinHandle<()>>,
    settle: Option<JoinHandle<()>>,
    pub(crate) sweeper: Option<JoinHandle<()>>,
}

impl SessionState {
    pub(crate) fn is_live(&self) -> bool {
        self.connection == ConnectionState::Connected && !self.settling
    }

    fn abort_tasks(&mut self) {
        for handle in [self.pump.take(), self.settle.take(), self.sweeper.take()]
            .into_iter()
            .flatten()
        {
            handle.abort();
        }
        for (_, timer) in self.typing.drain() {
            timer.handle.abort();
        }
    }
}

/// Result of handing one pending event to the transport
pub(crate) enum Transmit {
    Sent,
    /// Socket not up; the event comes back for re-queueing
    Retry(PendingEvent),
    Failed,
}

pub(crate) struct ClientInner {
    pub(crate) options: ClientOptions,
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) auth: Arc<dyn AuthProvider>,
    pub(crate) dispatcher: EventDispatcher,
    pub(crate) presence: PresenceCache,
    pub(crate) acks: Arc<AckTable>,
    pub(crate) session: Mutex<SessionState>,
}

impl ClientInner {
    fn spawn_pump(
        self: &Arc<Self>,
        mut signals: mpsc::UnboundedReceiver<TransportSignal>,
    ) -> JoinHandle<()> {
        let weak = Arc::downgrade(self);
        tokio::spawn(async move {
            while let Some(signal) = signals.recv().await {
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                inner.handle_signal(signal);
            }
            debug!("Transport signal stream ended");
        })
    }

    fn handle_signal(self: &Arc<Self>, signal: TransportSignal) {
        match signal {
            TransportSignal::Connected { session_id } => self.on_connected(session_id),
            TransportSignal::Disconnected {
                reason,
                will_reconnect,
            } => self.on_disconnected(reason, will_reconnect),
            TransportSignal::ConnectError { message } => self.on_connect_error(message),
            TransportSignal::AuthRejected { reason } => self.on_auth_rejected(reason),
            TransportSignal::Event { name, data } => self.on_event(&name, data),
            TransportSignal::Ack { id, data } => {
                if !self.acks.resolve(id, data) {
                    debug!(ack_id = id, "Reply for unknown request");
                }
            }
        }
    }

    pub(crate) fn on_connected(self: &Arc<Self>, session_id: Option<String>) {
        let (reconnected, session_id) = {
            let mut state = self.session.lock();
            if state.connection == ConnectionState::Connected {
                // Already marked connected by the connect timeout; keep the real id
                if session_id.is_some() {
                    state.session_id = session_id;
                }
                return;
            }
            state.connection = ConnectionState::Connected;
            state.reconnect_attempts = 0;
            if session_id.is_some() {
                state.session_id = session_id;
            }
            let reconnected = state.has_connected;
            state.has_connected = true;
            state.settling = true;
            if let Some(waiter) = state.waiter.take() {
                let _ = waiter.send(Ok(()));
            }
            if let Some(settle) = state.settle.take() {
                settle.abort();
            }
            state.settle = Some(self.spawn_settle());
            (reconnected, state.session_id.clone())
        };

        info!(
            session_id = session_id.as_deref().unwrap_or("-"),
            reconnected, "Connected to realtime gateway"
        );
        self.dispatcher.dispatch(&ServerEvent::Connect(ConnectEvent {
            session_id,
            reconnected,
        }));
    }

    fn spawn_settle(self: &Arc<Self>) -> JoinHandle<()> {
        let weak = Arc::downgrade(self);
        let delay = self.options.settle_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(inner) = weak.upgrade() {
                inner.finish_settling();
            }
        })
    }

    /// Re-announce rooms, resend the subscription set, then flush the queue.
    ///
    /// Runs under one lock hold so nothing emitted meanwhile can overtake the replay.
    fn finish_settling(&self) {
        let mut state = self.session.lock();
        state.settle = None;
        if state.connection != ConnectionState::Connected {
            return;
        }

        let rooms = state.rooms.snapshot();
        for room in &rooms {
            let payload = to_payload(&ConversationRequest {
                conversation_id: room.clone(),
            });
            if let Transmit::Retry(_) =
                self.transmit(PendingEvent::new(ClientOp::JoinConversation, payload, None))
            {
                warn!(room = %room, "Socket dropped while rejoining rooms");
                return;
            }
        }

        if !state.subscriptions.is_empty() {
            let payload = to_payload(&state.subscriptions.ids());
            if let Transmit::Retry(_) =
                self.transmit(PendingEvent::new(ClientOp::SubscribeToStatus, payload, None))
            {
                warn!("Socket dropped while resubscribing");
                return;
            }
        }

        let mut flushed = 0usize;
        while let Some(event) = state.queue.pop() {
            match self.transmit(event) {
                Transmit::Sent | Transmit::Failed => flushed += 1,
                Transmit::Retry(event) => {
                    state.queue.push_front(event);
                    warn!(
                        remaining = state.queue.len(),
                        "Socket dropped while flushing queued events"
                    );
                    return;
                }
            }
        }

        state.settling = false;
        debug!(
            rooms = rooms.len(),
            subscriptions = state.subscriptions.len(),
            flushed,
            "Session restored"
        );
    }

    fn on_disconnected(&self, reason: String, will_reconnect: bool) {
        {
            let mut state = self.session.lock();
            state.connection = ConnectionState::Disconnected;
            state.settling = false;
            if let Some(settle) = state.settle.take() {
                settle.abort();
            }
        }

        let failed = self
            .acks
            .fail_all(|| ClientError::TransientNetwork(format!("connection lost: {reason}")));
        warn!(reason = %reason, will_reconnect, failed_acks = failed, "Connection lost");

        self.dispatcher.dispatch(&ServerEvent::Disconnect(DisconnectEvent {
            reason,
            will_reconnect,
        }));
    }

    fn on_connect_error(&self, message: String) {
        let attempts = {
            let mut state = self.session.lock();
            state.connection = ConnectionState::Error;
            state.reconnect_attempts = state.reconnect_attempts.saturating_add(1);
            if let Some(waiter) = state.waiter.take() {
                let _ = waiter.send(Err(ClientError::TransientNetwork(message.clone())));
            }
            state.reconnect_attempts
        };

        warn!(attempt = attempts, error = %message, "Connection attempt failed");
        self.dispatcher
            .dispatch(&ServerEvent::ConnectError(ConnectErrorEvent { message }));
    }

    fn on_auth_rejected(&self, reason: String) {
        let was_connected = {
            let mut state = self.session.lock();
            let previous = std::mem::replace(&mut state.connection, ConnectionState::Error);
            state.settling = false;
            if let Some(settle) = state.settle.take() {
                settle.abort();
            }
            if let Some(waiter) = state.waiter.take() {
                let _ = waiter.send(Err(ClientError::AuthRejected(reason.clone())));
            }
            previous == ConnectionState::Connected
        };

        self.acks
            .fail_all(|| ClientError::AuthRejected(reason.clone()));
        error!(reason = %reason, "Gateway rejected the credential");

        if was_connected {
            self.dispatcher.dispatch(&ServerEvent::Disconnect(DisconnectEvent {
                reason: reason.clone(),
                will_reconnect: false,
            }));
        }
        self.dispatcher
            .dispatch(&ServerEvent::ConnectError(ConnectErrorEvent { message: reason }));
    }

    fn on_event(&self, name: &str, data: Value) {
        let event = match ServerEvent::decode(name, data) {
            Ok(event) => event,
            Err(e) => {
                warn!(event = %name, error = %e, "Dropping malformed event");
                return;
            }
        };

        trace!(event = %name, "Event received");
        self.observe(&event);
        self.dispatcher.dispatch(&event);
    }

    /// Update local caches from an inbound event before handlers see it
    fn observe(&self, event: &ServerEvent) {
        match event {
            ServerEvent::PrivacySettingsUpdated(update) => {
                self.session.lock().privacy = Some(update.settings.clone());
            }
            other => self.observe_presence(other),
        }
    }

    /// Hand one event to the transport
    pub(crate) fn transmit(&self, event: PendingEvent) -> Transmit {
        let abandoned = event.is_abandoned();
        let PendingEvent {
            name,
            payload,
            ack_id,
            completion,
        } = event;

        // A caller that stopped waiting gets no table entry; the event itself still goes out
        let ack_id = match completion {
            Some(completion) if !abandoned => {
                let id = ack_id.unwrap_or_else(|| self.acks.reserve());
                self.acks.insert(id, completion);
                Some(id)
            }
            _ => None,
        };
        let frame = match ack_id {
            Some(id) => Frame::request(name.clone(), id, payload.clone()),
            None => Frame::event(name.clone(), payload.clone()),
        };

        match self.transport.send(frame) {
            Ok(()) => {
                trace!(event = %name, "Event sent");
                Transmit::Sent
            }
            Err(TransportError::NotConnected | TransportError::Closed) => {
                let completion = ack_id.and_then(|id| self.acks.take(id));
                Transmit::Retry(PendingEvent {
                    name,
                    payload,
                    ack_id,
                    completion,
                })
            }
            Err(e @ TransportError::Encode(_)) => {
                warn!(event = %name, error = %e, "Transport refused event");
                if let Some(completion) = ack_id.and_then(|id| self.acks.take(id)) {
                    let _ = completion.send(Err(ClientError::emit_failure(&name, &e)));
                }
                Transmit::Failed
            }
        }
    }

    /// Send now if the session is live and nothing older is waiting; queue otherwise
    pub(crate) fn emit_locked(&self, state: &mut SessionState, event: PendingEvent) -> EmitOutcome {
        if !state.is_live() || !state.queue.is_empty() {
            debug!(event = %event.name, queued = state.queue.len() + 1, "Event queued");
            state.queue.push(event);
            return EmitOutcome::Queued;
        }

        match self.transmit(event) {
            Transmit::Sent => EmitOutcome::Sent,
            Transmit::Retry(event) => {
                state.queue.push(event);
                EmitOutcome::Queued
            }
            Transmit::Failed => EmitOutcome::Failed,
        }
    }

    /// Send only if live; used for state the replay re-announces anyway
    pub(crate) fn announce_locked(
        &self,
        state: &SessionState,
        op: ClientOp,
        payload: Value,
    ) -> EmitOutcome {
        if !state.is_live() {
            return EmitOutcome::Deferred;
        }
        match self.transmit(PendingEvent::new(op, payload, None)) {
            Transmit::Sent => EmitOutcome::Sent,
            Transmit::Retry(_) => EmitOutcome::Deferred,
            Transmit::Failed => EmitOutcome::Failed,
        }
    }
}

impl Drop for ClientInner {
    fn drop(&mut self) {
        self.session.get_mut().abort_tasks();
        self.transport.close();
    }
}

/// Client handle for the realtime connection.
///
/// Cheap to clone; every clone drives the same connection. Dropping the last clone
/// closes the transport.
#[derive(Clone)]
pub struct RealtimeClient {
    pub(crate) inner: Arc<ClientInner>,
}

impl RealtimeClient {
    pub fn new(
        options: ClientOptions,
        transport: Arc<dyn Transport>,
        auth: Arc<dyn AuthProvider>,
    ) -> Self {
        Self::with_clock(options, transport, auth, Arc::new(SystemClock))
    }

    /// Use a specific clock for presence expiry
    pub fn with_clock(
        options: ClientOptions,
        transport: Arc<dyn Transport>,
        auth: Arc<dyn AuthProvider>,
        clock: SharedClock,
    ) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                presence: PresenceCache::new(options.presence_ttl, clock),
                options,
                transport,
                auth,
                dispatcher: EventDispatcher::new(),
                acks: Arc::new(AckTable::default()),
                session: Mutex::new(SessionState::default()),
            }),
        }
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Open the connection and wait for the first outcome.
    ///
    /// The transport keeps reconnecting in the background after this returns, whatever
    /// the result, unless the server rejected the credential.
    ///
    /// # Errors
    /// - [`ClientError::AuthMissing`] without a credential
    /// - [`ClientError::TransientNetwork`] if the first attempt failed
    /// - [`ClientError::AuthRejected`] if the server refused the credential
    /// - [`ClientError::ConnectTimeout`] if nothing happened within the connect timeout
    pub async fn connect(&self) -> ClientResult<()> {
        let Some(credential) = self.inner.auth.credential().await else {
            self.inner.session.lock().connection = ConnectionState::Error;
            warn!("No credential available, not connecting");
            return Err(ClientError::AuthMissing);
        };

        let outcome = {
            let mut state = self.inner.session.lock();
            if state.connection == ConnectionState::Connected {
                return Ok(());
            }
            if let Some(pump) = state.pump.take() {
                pump.abort();
            }
            state.connection = ConnectionState::Connecting;

            let (tx, rx) = oneshot::channel();
            if let Some(previous) = state.waiter.replace(tx) {
                let _ = previous.send(Err(ClientError::Cancelled));
            }

            let signals = self.inner.transport.open(credential);
            state.pump = Some(self.inner.spawn_pump(signals));
            if state.sweeper.is_none() {
                state.sweeper = Some(self.inner.spawn_sweeper());
            }
            rx
        };
        info!("Connecting to realtime gateway");

        let limit = self.inner.options.connect_timeout;
        match tokio::time::timeout(limit, outcome).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(ClientError::Cancelled),
            Err(_) => {
                if self.inner.transport.is_connected() {
                    self.inner.on_connected(None);
                    Ok(())
                } else {
                    self.inner.session.lock().waiter = None;
                    warn!(timeout = ?limit, "Connect timed out");
                    Err(ClientError::ConnectTimeout(limit))
                }
            }
        }
    }

    /// End the session.
    ///
    /// Queued events are discarded and outstanding replies fail with
    /// [`ClientError::Cancelled`]. Registered handlers stay registered.
    pub fn disconnect(&self) {
        let discarded = {
            let mut state = self.inner.session.lock();
            state.abort_tasks();
            state.rooms.clear();
            state.subscriptions.clear();
            state.privacy = None;
            state.settling = false;
            state.session_id = None;
            state.reconnect_attempts = 0;
            state.connection = ConnectionState::Disconnected;
            if let Some(waiter) = state.waiter.take() {
                let _ = waiter.send(Err(ClientError::Cancelled));
            }
            state.queue.cancel_all()
        };

        self.inner.transport.close();
        self.inner.presence.clear();
        let failed = self.inner.acks.fail_all(|| ClientError::Cancelled);
        info!(discarded, failed_acks = failed, "Disconnected");

        self.inner
            .dispatcher
            .dispatch(&ServerEvent::Disconnect(DisconnectEvent {
                reason: "client disconnect".to_string(),
                will_reconnect: false,
            }));
    }

    // ========================================================================
    // Emitting
    // ========================================================================

    /// Fire-and-forget emit
    pub fn emit(&self, name: impl Into<String>, payload: Value) -> EmitOutcome {
        let mut state = self.inner.session.lock();
        self.inner
            .emit_locked(&mut state, PendingEvent::new(name, payload, None))
    }

    /// Emit and wait for the server's reply
    pub fn emit_with_ack(&self, name: impl Into<String>, payload: Value) -> Acknowledgement {
        let (tx, rx) = oneshot::channel();
        let id = self.inner.acks.reserve();
        let outcome = {
            let mut state = self.inner.session.lock();
            self.inner
                .emit_locked(&mut state, PendingEvent::request(name, payload, id, tx))
        };
        Acknowledgement::tracked(outcome, rx, id, Arc::downgrade(&self.inner.acks))
    }

    pub(crate) fn require_connected(&self) -> ClientResult<()> {
        if self.is_connected() {
            Ok(())
        } else {
            Err(ClientError::NotConnected)
        }
    }

    /// Acknowledged request that is only attempted while connected
    pub(crate) async fn request(&self, op: ClientOp, payload: Value) -> ClientResult<AckResponse> {
        self.require_connected()?;
        self.emit_with_ack(op, payload).await
    }

    // ========================================================================
    // Handlers
    // ========================================================================

    /// Register a handler for one event kind
    pub fn on<F>(&self, kind: EventKind, handler: F) -> Subscription
    where
        F: Fn(&ServerEvent) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.inner.dispatcher.on(kind, handler)
    }

    /// Remove a handler registered with [`RealtimeClient::on`]
    pub fn off(&self, kind: EventKind, id: HandlerId) -> bool {
        self.inner.dispatcher.off(kind, id)
    }

    #[must_use]
    pub fn dispatcher(&self) -> &EventDispatcher {
        &self.inner.dispatcher
    }

    // ========================================================================
    // Introspection
    // ========================================================================

    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.inner.session.lock().connection
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    #[must_use]
    pub fn session_id(&self) -> Option<String> {
        self.inner.session.lock().session_id.clone()
    }

    #[must_use]
    pub fn pending_events(&self) -> usize {
        self.inner.session.lock().queue.len()
    }

    #[must_use]
    pub fn status(&self) -> ConnectionStatus {
        let state = self.inner.session.lock();
        let pending_events = state.queue.len();
        ConnectionStatus {
            state: state.connection,
            session_id: state.session_id.clone(),
            reconnect_attempts: state.reconnect_attempts,
            pending_events,
            joined_rooms: state.rooms.snapshot(),
            subscriptions: state.subscriptions.ids().to_vec(),
            cached_presence: self.inner.presence.len(),
            typing_sessions: state.typing.len(),
            health: HealthStatus::grade(
                state.connection == ConnectionState::Connected,
                pending_events,
                state.reconnect_attempts,
            ),
        }
    }

    pub(crate) fn auth(&self) -> &Arc<dyn AuthProvider> {
        &self.inner.auth
    }
}

impl fmt::Debug for RealtimeClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RealtimeClient")
            .field("state", &self.state())
            .field("pending_events", &self.pending_events())
            .finish_non_exhaustive()
    }
}
