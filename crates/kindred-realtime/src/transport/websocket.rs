//! WebSocket transport
//!
//! One background task per [`Transport::open`] call. The task connects, waits for Hello,
//! then pumps frames until the socket ends, sleeps for the backoff delay and starts over.

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::time::{interval_at, timeout, Instant};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::{header::AUTHORIZATION, HeaderValue};
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use kindred_common::GatewayConfig;

use super::{ReconnectPolicy, Transport, TransportError, TransportSignal};
use crate::protocol::{CloseCode, Frame, HelloPayload, OpCode};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Lower bound for the heartbeat period announced by the server
const MIN_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(1);

/// [`Transport`] over a tokio-tungstenite client socket
pub struct WsTransport {
    url: String,
    handshake_timeout: Duration,
    policy: ReconnectPolicy,
    active: Mutex<Option<Active>>,
}

/// State of one `open()` call
struct Active {
    shared: Arc<Shared>,
    shutdown: watch::Sender<bool>,
}

/// Socket state visible to `send()`
#[derive(Default)]
struct Shared {
    outbound: Mutex<Option<mpsc::UnboundedSender<Frame>>>,
    connected: AtomicBool,
}

impl Shared {
    fn mark_up(&self, outbound: mpsc::UnboundedSender<Frame>) {
        *self.outbound.lock() = Some(outbound);
        self.connected.store(true, Ordering::SeqCst);
    }

    fn mark_down(&self) {
        self.outbound.lock().take();
        self.connected.store(false, Ordering::SeqCst);
    }
}

/// How a socket ended
enum SocketEnd {
    Shutdown,
    Closed { code: Option<u16>, reason: String },
}

/// Why a connection attempt failed
enum ConnectFailure {
    Rejected(String),
    Failed(String),
}

impl WsTransport {
    #[must_use]
    pub fn new(url: impl Into<String>, handshake_timeout: Duration, policy: ReconnectPolicy) -> Self {
        Self {
            url: url.into(),
            handshake_timeout,
            policy,
            active: Mutex::new(None),
        }
    }

    /// Create a transport from gateway configuration
    #[must_use]
    pub fn from_config(config: &GatewayConfig) -> Self {
        Self::new(
            config.url.clone(),
            config.handshake_timeout(),
            ReconnectPolicy::new(config.reconnect_delay_min(), config.reconnect_delay_max()),
        )
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Transport for WsTransport {
    fn open(&self, credential: String) -> mpsc::UnboundedReceiver<TransportSignal> {
        self.close();

        let (signals_tx, signals_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let shared = Arc::new(Shared::default());

        let worker = SocketWorker {
            url: self.url.clone(),
            credential,
            handshake_timeout: self.handshake_timeout,
            policy: self.policy,
            shared: shared.clone(),
            signals: signals_tx,
        };
        tokio::spawn(worker.run(shutdown_rx));

        *self.active.lock() = Some(Active {
            shared,
            shutdown: shutdown_tx,
        });
        signals_rx
    }

    fn send(&self, frame: Frame) -> Result<(), TransportError> {
        let active = self.active.lock();
        let Some(active) = active.as_ref() else {
            return Err(TransportError::Closed);
        };
        let outbound = active.shared.outbound.lock();
        match outbound.as_ref() {
            Some(tx) => tx.send(frame).map_err(|_| TransportError::NotConnected),
            None => Err(TransportError::NotConnected),
        }
    }

    fn is_connected(&self) -> bool {
        self.active
            .lock()
            .as_ref()
            .is_some_and(|active| active.shared.connected.load(Ordering::SeqCst))
    }

    fn close(&self) {
        if let Some(active) = self.active.lock().take() {
            active.shared.mark_down();
            let _ = active.shutdown.send(true);
            tracing::debug!(url = %self.url, "WebSocket transport closed");
        }
    }
}

impl Drop for WsTransport {
    fn drop(&mut self) {
        self.close();
    }
}

/// Background task owning the socket
struct SocketWorker {
    url: String,
    credential: String,
    handshake_timeout: Duration,
    policy: ReconnectPolicy,
    shared: Arc<Shared>,
    signals: mpsc::UnboundedSender<TransportSignal>,
}

impl SocketWorker {
    async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut attempt: u32 = 0;

        loop {
            if self.signals.is_closed() || *shutdown.borrow() {
                break;
            }

            let outcome = tokio::select! {
                outcome = self.connect_once() => outcome,
                _ = shutdown.changed() => break,
            };

            match outcome {
                Ok((socket, hello)) => {
                    attempt = 0;
                    match self.drive(socket, hello, &mut shutdown).await {
                        SocketEnd::Shutdown => break,
                        SocketEnd::Closed { code, reason } => {
                            let close_code = code.and_then(CloseCode::from_u16);
                            if close_code.is_some_and(CloseCode::is_auth_failure) {
                                tracing::warn!(reason = %reason, "Server rejected credential");
                                let _ = self.signals.send(TransportSignal::AuthRejected { reason });
                                break;
                            }
                            tracing::info!(code = ?code, reason = %reason, "WebSocket disconnected");
                            let _ = self.signals.send(TransportSignal::Disconnected {
                                reason,
                                will_reconnect: true,
                            });
                        }
                    }
                }
                Err(ConnectFailure::Rejected(reason)) => {
                    tracing::warn!(reason = %reason, "Server rejected credential");
                    let _ = self.signals.send(TransportSignal::AuthRejected { reason });
                    break;
                }
                Err(ConnectFailure::Failed(message)) => {
                    tracing::debug!(error = %message, "Connection attempt failed");
                    let _ = self.signals.send(TransportSignal::ConnectError { message });
                }
            }

            attempt = attempt.saturating_add(1);
            let delay = self.policy.delay_for(attempt);
            tracing::debug!(attempt, delay = ?delay, "Scheduling reconnect");

            tokio::select! {
                () = tokio::time::sleep(delay) => {}
                _ = shutdown.changed() => break,
            }
        }

        self.shared.mark_down();
        tracing::debug!(url = %self.url, "WebSocket worker stopped");
    }

    async fn connect_once(&self) -> Result<(WsStream, HelloPayload), ConnectFailure> {
        let mut request = self
            .url
            .as_str()
            .into_client_request()
            .map_err(|e| ConnectFailure::Failed(e.to_string()))?;
        let bearer = HeaderValue::from_str(&format!("Bearer {}", self.credential))
            .map_err(|e| ConnectFailure::Rejected(format!("unusable credential: {e}")))?;
        request.headers_mut().insert(AUTHORIZATION, bearer);

        let (mut socket, _) = match timeout(self.handshake_timeout, connect_async(request)).await {
            Err(_) => return Err(ConnectFailure::Failed("handshake timed out".to_string())),
            Ok(Err(WsError::Http(response))) if matches!(response.status().as_u16(), 401 | 403) => {
                return Err(ConnectFailure::Rejected(format!(
                    "upgrade refused with HTTP {}",
                    response.status()
                )));
            }
            Ok(Err(e)) => return Err(ConnectFailure::Failed(e.to_string())),
            Ok(Ok(pair)) => pair,
        };

        let hello = timeout(self.handshake_timeout, wait_for_hello(&mut socket))
            .await
            .map_err(|_| ConnectFailure::Failed("no hello from server".to_string()))??;

        Ok((socket, hello))
    }

    async fn drive(
        &self,
        socket: WsStream,
        hello: HelloPayload,
        shutdown: &mut watch::Receiver<bool>,
    ) -> SocketEnd {
        let (mut sink, mut stream) = socket.split();
        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Frame>();

        self.shared.mark_up(outbound_tx);
        tracing::info!(session_id = %hello.session_id, "WebSocket connected");
        let _ = self.signals.send(TransportSignal::Connected {
            session_id: Some(hello.session_id),
        });

        let period = Duration::from_millis(hello.heartbeat_interval).max(MIN_HEARTBEAT_INTERVAL);
        let mut heartbeat = interval_at(Instant::now() + period, period);

        let end = loop {
            tokio::select! {
                message = stream.next() => match message {
                    Some(Ok(Message::Text(text))) => {
                        if let Some(reply) = self.handle_text(&text) {
                            if let Err(e) = send_frame(&mut sink, &reply).await {
                                break SocketEnd::Closed { code: None, reason: e };
                            }
                        }
                    }
                    Some(Ok(Message::Close(frame))) => {
                        let (code, reason) = describe_close(frame.as_ref());
                        break SocketEnd::Closed { code, reason };
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => break SocketEnd::Closed { code: None, reason: e.to_string() },
                    None => break SocketEnd::Closed { code: None, reason: "connection closed".to_string() },
                },
                Some(frame) = outbound_rx.recv() => {
                    if let Err(e) = send_frame(&mut sink, &frame).await {
                        break SocketEnd::Closed { code: None, reason: e };
                    }
                }
                _ = heartbeat.tick() => {
                    if let Err(e) = send_frame(&mut sink, &Frame::heartbeat()).await {
                        break SocketEnd::Closed { code: None, reason: e };
                    }
                }
                _ = shutdown.changed() => {
                    let _ = sink.send(Message::Close(None)).await;
                    break SocketEnd::Shutdown;
                }
            }
        };

        self.shared.mark_down();
        end
    }

    /// Route an inbound text frame; returns a frame to send back, if any
    fn handle_text(&self, text: &str) -> Option<Frame> {
        let frame = match Frame::from_json(text) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!(error = %e, "Dropping undecodable frame");
                return None;
            }
        };

        match frame.op {
            OpCode::Event => {
                let Some(name) = frame.t else {
                    tracing::warn!("Dropping event frame without a name");
                    return None;
                };
                let data = frame.d.unwrap_or(Value::Null);
                let _ = self.signals.send(TransportSignal::Event { name, data });
                None
            }
            OpCode::Ack => {
                let Some(id) = frame.id else {
                    tracing::warn!("Dropping ack frame without an id");
                    return None;
                };
                let data = frame.d.unwrap_or(Value::Null);
                let _ = self.signals.send(TransportSignal::Ack { id, data });
                None
            }
            OpCode::Heartbeat => Some(Frame::heartbeat_ack()),
            OpCode::HeartbeatAck => {
                tracing::trace!("Heartbeat acknowledged");
                None
            }
            OpCode::Hello => {
                tracing::debug!("Ignoring repeated hello");
                None
            }
        }
    }
}

async fn wait_for_hello(socket: &mut WsStream) -> Result<HelloPayload, ConnectFailure> {
    while let Some(message) = socket.next().await {
        match message {
            Ok(Message::Text(text)) => {
                if let Some(hello) = Frame::from_json(&text).ok().and_then(|f| f.as_hello()) {
                    return Ok(hello);
                }
            }
            Ok(Message::Close(frame)) => {
                let (code, reason) = describe_close(frame.as_ref());
                return match code.and_then(CloseCode::from_u16) {
                    Some(code) if code.is_auth_failure() => Err(ConnectFailure::Rejected(reason)),
                    _ => Err(ConnectFailure::Failed(reason)),
                };
            }
            Ok(_) => {}
            Err(e) => return Err(ConnectFailure::Failed(e.to_string())),
        }
    }
    Err(ConnectFailure::Failed("connection closed before hello".to_string()))
}

async fn send_frame<S>(sink: &mut S, frame: &Frame) -> Result<(), String>
where
    S: futures_util::Sink<Message, Error = WsError> + Unpin,
{
    let json = frame.to_json().map_err(|e| e.to_string())?;
    sink.send(Message::Text(json.into()))
        .await
        .map_err(|e| e.to_string())
}

fn describe_close(frame: Option<&CloseFrame<'_>>) -> (Option<u16>, String) {
    let Some(frame) = frame else {
        return (None, "connection closed".to_string());
    };

    let code = u16::from(frame.code);
    let reason = if frame.reason.is_empty() {
        CloseCode::from_u16(code).map_or_else(
            || format!("closed with code {code}"),
            |known| known.description().to_string(),
        )
    } else {
        frame.reason.to_string()
    };
    (Some(code), reason)
}
