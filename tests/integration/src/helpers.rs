//! Test helpers for integration tests
//!
//! Provides an in-process mock gateway (WebSocket endpoint plus the REST device
//! endpoints), client construction against it, and polling utilities.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::http::{header::AUTHORIZATION, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use kindred_common::ClientConfig;
use kindred_core::{AuthProvider, Notification, NotificationPresenter, PortResult, UserId};
use kindred_realtime::protocol::{CloseCode, Frame, OpCode};
use kindred_realtime::{ClientOptions, RealtimeClient, WsTransport};
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// Credential the mock gateway accepts
pub const TEST_TOKEN: &str = "integration-token";

/// User the test credential belongs to
pub const TEST_USER: &str = "me";

/// Shared state of the mock gateway
struct GatewayState {
    token: String,
    /// Event frames received from clients, in arrival order
    received: Mutex<Vec<Frame>>,
    connections: AtomicUsize,
    kick: broadcast::Sender<()>,
    push: broadcast::Sender<Frame>,
    register_calls: AtomicUsize,
    /// Remaining injected failures and the status they answer with
    register_failures: Mutex<Option<(u32, u16)>>,
    devices: Mutex<Vec<Value>>,
}

impl GatewayState {
    fn authorized(&self, headers: &HeaderMap) -> bool {
        headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            == Some(self.token.as_str())
    }

    /// Reply sent for a request frame
    fn reply_for(&self, frame: &Frame) -> Value {
        match frame.t.as_deref() {
            Some("send_message") => json!({
                "success": true,
                "data": { "_id": format!("srv-{}", frame.id.unwrap_or_default()) }
            }),
            Some("get_online_status") => {
                let statuses: serde_json::Map<String, Value> = frame
                    .d
                    .as_ref()
                    .and_then(Value::as_array)
                    .into_iter()
                    .flatten()
                    .filter_map(Value::as_str)
                    .map(|id| (id.to_string(), Value::Bool(true)))
                    .collect();
                Value::Object(statuses)
            }
            _ => json!({ "success": true }),
        }
    }

    fn take_injected_failure(&self) -> Option<StatusCode> {
        let mut failures = self.register_failures.lock();
        let (remaining, status) = failures.as_mut()?;
        if *remaining == 0 {
            return None;
        }
        *remaining -= 1;
        StatusCode::from_u16(*status).ok()
    }
}

/// Mock realtime gateway and REST API on one local port
pub struct MockGateway {
    pub addr: SocketAddr,
    state: Arc<GatewayState>,
    _handle: JoinHandle<()>,
}

impl MockGateway {
    /// Start a gateway that accepts [`TEST_TOKEN`]
    pub async fn start() -> Result<Self> {
        let (kick, _) = broadcast::channel(16);
        let (push, _) = broadcast::channel(64);
        let state = Arc::new(GatewayState {
            token: TEST_TOKEN.to_string(),
            received: Mutex::new(Vec::new()),
            connections: AtomicUsize::new(0),
            kick,
            push,
            register_calls: AtomicUsize::new(0),
            register_failures: Mutex::new(None),
            devices: Mutex::new(Vec::new()),
        });

        let app = Router::new()
            .route("/ws", get(ws_handler))
            .route("/api/notifications/devices/register", post(register_device))
            .route("/api/notifications/devices/unregister", post(unregister_device))
            .route("/api/notifications/devices", get(list_devices))
            .with_state(state.clone());

        let listener = TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0))).await?;
        let addr = listener.local_addr()?;
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        Ok(Self {
            addr,
            state,
            _handle: handle,
        })
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }

    pub fn api_url(&self) -> String {
        format!("http://{}/api", self.addr)
    }

    /// Event frames received so far
    pub fn received(&self) -> Vec<Frame> {
        self.state.received.lock().clone()
    }

    /// Received event frames with the given name
    pub fn received_named(&self, name: &str) -> Vec<Frame> {
        self.received()
            .into_iter()
            .filter(|frame| frame.t.as_deref() == Some(name))
            .collect()
    }

    /// Number of authenticated sockets accepted so far
    pub fn connections(&self) -> usize {
        self.state.connections.load(Ordering::SeqCst)
    }

    /// Close every open socket with a reconnectable close code
    pub fn kick(&self) {
        let _ = self.state.kick.send(());
    }

    /// Send an event to every open socket
    pub fn push_event(&self, name: &str, data: Value) {
        let _ = self.state.push.send(Frame::event(name, data));
    }

    /// Answer the next `count` registrations with `status`
    pub fn fail_next_registrations(&self, count: u32, status: u16) {
        *self.state.register_failures.lock() = Some((count, status));
    }

    pub fn register_calls(&self) -> usize {
        self.state.register_calls.load(Ordering::SeqCst)
    }

    /// Registrations currently stored by the REST API
    pub fn devices(&self) -> Vec<Value> {
        self.state.devices.lock().clone()
    }
}

async fn ws_handler(
    State(state): State<Arc<GatewayState>>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Response {
    let authorized = state.authorized(&headers);
    ws.on_upgrade(move |socket| handle_socket(socket, state, authorized))
}

async fn send_frame(socket: &mut WebSocket, frame: &Frame) -> bool {
    match frame.to_json() {
        Ok(json) => socket.send(Message::Text(json)).await.is_ok(),
        Err(_) => false,
    }
}

fn close_message(code: CloseCode) -> Message {
    Message::Close(Some(CloseFrame {
        code: code.as_u16(),
        reason: code.description().into(),
    }))
}

async fn handle_socket(mut socket: WebSocket, state: Arc<GatewayState>, authorized: bool) {
    if !authorized {
        let _ = socket
            .send(close_message(CloseCode::AuthenticationFailed))
            .await;
        return;
    }

    let number = state.connections.fetch_add(1, Ordering::SeqCst) + 1;
    let mut kick = state.kick.subscribe();
    let mut push = state.push.subscribe();
    if !send_frame(&mut socket, &Frame::hello(format!("session-{number}"), 25_000)).await {
        return;
    }

    loop {
        tokio::select! {
            message = socket.recv() => match message {
                Some(Ok(Message::Text(text))) => {
                    let Ok(frame) = Frame::from_json(&text) else {
                        continue;
                    };
                    match frame.op {
                        OpCode::Heartbeat => {
                            if !send_frame(&mut socket, &Frame::heartbeat_ack()).await {
                                break;
                            }
                        }
                        OpCode::Event => {
                            state.received.lock().push(frame.clone());
                            if let Some(id) = frame.id {
                                let reply = Frame::ack(id, state.reply_for(&frame));
                                if !send_frame(&mut socket, &reply).await {
                                    break;
                                }
                            }
                        }
                        _ => {}
                    }
                }
                Some(Ok(Message::Close(_)) | Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
            Ok(()) = kick.recv() => {
                let _ = socket.send(close_message(CloseCode::UnknownError)).await;
                break;
            }
            Ok(frame) = push.recv() => {
                if !send_frame(&mut socket, &frame).await {
                    break;
                }
            }
        }
    }
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "message": "Unauthorized" })),
    )
        .into_response()
}

async fn register_device(
    State(state): State<Arc<GatewayState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !state.authorized(&headers) {
        return unauthorized();
    }
    state.register_calls.fetch_add(1, Ordering::SeqCst);
    if let Some(status) = state.take_injected_failure() {
        return (status, Json(json!({ "message": "injected failure" }))).into_response();
    }

    let device_id = body.get("deviceId").cloned().unwrap_or(Value::Null);
    {
        let mut devices = state.devices.lock();
        devices.retain(|device| device.get("deviceId") != Some(&device_id));
        devices.push(body.clone());
    }
    Json(json!({ "success": true, "data": { "device": body } })).into_response()
}

async fn unregister_device(
    State(state): State<Arc<GatewayState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !state.authorized(&headers) {
        return unauthorized();
    }
    let device_id = body.get("deviceId").cloned().unwrap_or(Value::Null);
    state
        .devices
        .lock()
        .retain(|device| device.get("deviceId") != Some(&device_id));
    StatusCode::NO_CONTENT.into_response()
}

async fn list_devices(State(state): State<Arc<GatewayState>>, headers: HeaderMap) -> Response {
    if !state.authorized(&headers) {
        return unauthorized();
    }
    let devices = state.devices.lock().clone();
    Json(json!({ "success": true, "data": { "devices": devices } })).into_response()
}

// ============================================================================
// Client side
// ============================================================================

/// Client configuration pointed at the mock gateway, with short reconnect delays
pub fn test_config(gateway: &MockGateway) -> ClientConfig {
    let mut config = ClientConfig::with_gateway_url(gateway.ws_url());
    config.gateway.connect_timeout_ms = 5_000;
    config.gateway.handshake_timeout_ms = 2_000;
    config.gateway.reconnect_delay_min_ms = 150;
    config.gateway.reconnect_delay_max_ms = 300;
    config.api.base_url = gateway.api_url();
    config.api.retry_base_delay_ms = 10;
    config
}

/// Auth provider with a fixed credential
pub struct StaticAuth {
    pub token: Option<String>,
    pub user_id: Option<UserId>,
}

#[async_trait]
impl AuthProvider for StaticAuth {
    async fn credential(&self) -> Option<String> {
        self.token.clone()
    }

    async fn current_user_id(&self) -> Option<UserId> {
        self.user_id.clone()
    }
}

/// Signed in with [`TEST_TOKEN`] as [`TEST_USER`]
pub fn signed_in() -> Arc<StaticAuth> {
    with_token(TEST_TOKEN)
}

pub fn with_token(token: &str) -> Arc<StaticAuth> {
    Arc::new(StaticAuth {
        token: Some(token.to_string()),
        user_id: Some(UserId::from(TEST_USER)),
    })
}

/// Realtime client over a real WebSocket transport to the mock gateway
pub fn client_for(gateway: &MockGateway, auth: Arc<StaticAuth>) -> RealtimeClient {
    let config = test_config(gateway);
    RealtimeClient::new(
        ClientOptions::from(&config),
        Arc::new(WsTransport::from_config(&config.gateway)),
        auth,
    )
}

/// Poll `cond` every 10ms for up to 5 seconds
pub async fn wait_until(mut cond: impl FnMut() -> bool) -> bool {
    for _ in 0..500 {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    cond()
}

/// Presenter that keeps what it was given
#[derive(Default)]
pub struct CollectingPresenter {
    pub presented: Mutex<Vec<Notification>>,
}

impl CollectingPresenter {
    pub fn count(&self) -> usize {
        self.presented.lock().len()
    }
}

#[async_trait]
impl NotificationPresenter for CollectingPresenter {
    async fn present(&self, notification: &Notification) -> PortResult<()> {
        self.presented.lock().push(notification.clone());
        Ok(())
    }
}
