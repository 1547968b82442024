//! In-memory transport for connection manager tests

use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::mpsc;

use super::{Transport, TransportError, TransportSignal};
use crate::protocol::Frame;

#[derive(Default)]
struct MockState {
    signals: Option<mpsc::UnboundedSender<TransportSignal>>,
    connected: bool,
    credentials: Vec<String>,
    sent: Vec<Frame>,
    fail_encode: bool,
    closed: usize,
}

/// Transport driven by the test: every signal is injected by hand
#[derive(Default)]
pub struct MockTransport {
    state: Mutex<MockState>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn signal(&self, signal: TransportSignal) {
        if let Some(tx) = self.state.lock().signals.as_ref() {
            let _ = tx.send(signal);
        }
    }

    /// Bring the socket up and report it
    pub fn connect(&self, session_id: &str) {
        self.state.lock().connected = true;
        self.signal(TransportSignal::Connected {
            session_id: Some(session_id.to_string()),
        });
    }

    /// Flip the socket up without reporting it
    pub fn set_connected_silently(&self, connected: bool) {
        self.state.lock().connected = connected;
    }

    /// Drop the socket; the transport "keeps retrying"
    pub fn drop_connection(&self, reason: &str) {
        self.state.lock().connected = false;
        self.signal(TransportSignal::Disconnected {
            reason: reason.to_string(),
            will_reconnect: true,
        });
    }

    pub fn fail_attempt(&self, message: &str) {
        self.signal(TransportSignal::ConnectError {
            message: message.to_string(),
        });
    }

    pub fn reject_auth(&self, reason: &str) {
        self.state.lock().connected = false;
        self.signal(TransportSignal::AuthRejected {
            reason: reason.to_string(),
        });
    }

    pub fn push_event(&self, name: &str, data: Value) {
        self.signal(TransportSignal::Event {
            name: name.to_string(),
            data,
        });
    }

    pub fn push_ack(&self, id: u64, data: Value) {
        self.signal(TransportSignal::Ack { id, data });
    }

    /// Make every following send fail with an encode error
    pub fn fail_sends(&self, fail: bool) {
        self.state.lock().fail_encode = fail;
    }

    pub fn sent(&self) -> Vec<Frame> {
        self.state.lock().sent.clone()
    }

    /// Names of sent event frames, in order
    pub fn sent_names(&self) -> Vec<String> {
        self.state
            .lock()
            .sent
            .iter()
            .filter_map(|f| f.t.clone())
            .collect()
    }

    /// Sent event frames with the given name
    pub fn sent_named(&self, name: &str) -> Vec<Frame> {
        self.state
            .lock()
            .sent
            .iter()
            .filter(|f| f.t.as_deref() == Some(name))
            .cloned()
            .collect()
    }

    /// Id of the last request frame with the given name
    pub fn last_request_id(&self, name: &str) -> Option<u64> {
        self.sent_named(name).last().and_then(|f| f.id)
    }

    pub fn clear_sent(&self) {
        self.state.lock().sent.clear();
    }

    pub fn credentials(&self) -> Vec<String> {
        self.state.lock().credentials.clone()
    }

    pub fn close_count(&self) -> usize {
        self.state.lock().closed
    }
}

impl Transport for MockTransport {
    fn open(&self, credential: String) -> mpsc::UnboundedReceiver<TransportSignal> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut state = self.state.lock();
        state.credentials.push(credential);
        state.signals = Some(tx);
        state.connected = false;
        rx
    }

    fn send(&self, frame: Frame) -> Result<(), TransportError> {
        let mut state = self.state.lock();
        if state.fail_encode {
            return Err(TransportError::Encode("mock failure".to_string()));
        }
        if !state.connected {
            return Err(TransportError::NotConnected);
        }
        state.sent.push(frame);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.state.lock().connected
    }

    fn close(&self) {
        let mut state = self.state.lock();
        state.signals = None;
        state.connected = false;
        state.closed += 1;
    }
}
