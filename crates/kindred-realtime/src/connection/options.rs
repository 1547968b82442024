//! Connection manager tuning

use kindred_common::ClientConfig;
use std::time::Duration;

/// Timers used by [`RealtimeClient`](super::RealtimeClient)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientOptions {
    /// How long `connect()` waits for the first transport signal
    pub connect_timeout: Duration,
    /// Pause between a (re)connect and the room/subscription replay
    pub settle_delay: Duration,
    /// Typing indicator auto-stop
    pub typing_idle: Duration,
    /// Lifetime of a cached presence entry
    pub presence_ttl: Duration,
    /// Upper bound for a batched `get_online_status` round-trip
    pub presence_query_timeout: Duration,
    /// Period of the expired-presence sweep
    pub presence_sweep_interval: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(15),
            settle_delay: Duration::from_millis(100),
            typing_idle: Duration::from_secs(3),
            presence_ttl: Duration::from_secs(300),
            presence_query_timeout: Duration::from_secs(10),
            presence_sweep_interval: Duration::from_secs(60),
        }
    }
}

impl From<&ClientConfig> for ClientOptions {
    fn from(config: &ClientConfig) -> Self {
        Self {
            connect_timeout: config.gateway.connect_timeout(),
            settle_delay: config.gateway.settle_delay(),
            typing_idle: config.typing.idle_timeout(),
            presence_ttl: config.presence.ttl(),
            presence_query_timeout: config.presence.query_timeout(),
            presence_sweep_interval: config.presence.sweep_interval(),
        }
    }
}
