//! Headless Kindred client
//!
//! Run with:
//! ```bash
//! KINDRED_GATEWAY_URL=ws://127.0.0.1:3001/ws cargo run -p kindred-realtime
//! ```
//!
//! Configuration is loaded from environment variables. `KINDRED_TOKEN` and
//! `KINDRED_USER_ID` sign in before connecting; `KINDRED_PUSH_TOKEN` enables device
//! registration. Notifications are written to the log.

use std::sync::Arc;

use anyhow::Context;
use kindred_cache::{FileStore, StoredAuthProvider};
use kindred_common::{try_init_tracing_with_config, ClientConfig, TracingConfig};
use kindred_core::{EventKind, ServerEvent, UserId};
use kindred_realtime::api::RestDeviceApi;
use kindred_realtime::notify::{LogPresenter, StaticPushProvider};
use kindred_realtime::{RealtimeSession, WsTransport};
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    let config = match ClientConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = try_init_tracing_with_config(TracingConfig::for_environment(config.app.env)) {
        eprintln!("Warning: Failed to initialize tracing: {e}");
    }

    if let Err(e) = run(config).await {
        error!(error = %e, "Client failed");
        std::process::exit(1);
    }
}

async fn run(config: ClientConfig) -> anyhow::Result<()> {
    info!(
        env = ?config.app.env,
        gateway = %config.gateway.url,
        api = %config.api.base_url,
        "Configuration loaded"
    );

    let store = Arc::new(
        FileStore::open(&config.storage.path)
            .await
            .with_context(|| format!("opening store at {}", config.storage.path))?,
    );
    info!(path = %store.path().display(), "Store ready");

    let auth = Arc::new(StoredAuthProvider::new(store.clone()));
    if let (Ok(token), Ok(user_id)) = (std::env::var("KINDRED_TOKEN"), std::env::var("KINDRED_USER_ID")) {
        auth.sign_in(&token, &UserId::from(user_id)).await?;
    }

    let push = StaticPushProvider::new(
        std::env::var("KINDRED_PUSH_TOKEN").ok(),
        std::env::var("KINDRED_PLATFORM").unwrap_or_else(|_| "desktop".to_string()),
    );
    let session = RealtimeSession::builder(config.clone())
        .transport(Arc::new(WsTransport::from_config(&config.gateway)))
        .device_api(Arc::new(RestDeviceApi::new(&config.api, auth.clone())?))
        .auth(auth)
        .store(store)
        .push_provider(Arc::new(push))
        .presenter(Arc::new(LogPresenter))
        .build()
        .await?;

    let client = session.client();
    client.on(EventKind::Connect, |event| {
        if let ServerEvent::Connect(connect) = event {
            info!(session_id = ?connect.session_id, reconnected = connect.reconnected, "Connected");
        }
        Ok(())
    });
    client.on(EventKind::Disconnect, |event| {
        if let ServerEvent::Disconnect(disconnect) = event {
            warn!(reason = %disconnect.reason, will_reconnect = disconnect.will_reconnect, "Disconnected");
        }
        Ok(())
    });
    client.on(EventKind::ConnectError, |event| {
        if let ServerEvent::ConnectError(failure) = event {
            warn!(message = %failure.message, "Connection attempt failed");
        }
        Ok(())
    });

    if !session.is_device_registered() {
        match session.register_device().await {
            Ok(device_id) => info!(device_id = %device_id, "Device registered"),
            Err(e) => warn!(error = %e, "Device not registered, notifications are off"),
        }
    }

    session.connect().await?;
    info!("Press Ctrl+C to exit");

    tokio::signal::ctrl_c().await?;
    info!("Shutting down...");
    session.disconnect();
    Ok(())
}
