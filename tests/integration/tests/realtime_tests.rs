//! End-to-end tests for the connection manager over a real WebSocket
//!
//! Each test starts its own mock gateway on a free local port.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use integration_tests::*;
use kindred_common::ClientError;
use kindred_core::{ConversationId, EventKind, PresenceStatus, SendMessageRequest, UserId};
use kindred_realtime::{ConnectionState, EmitOutcome};
use serde_json::json;

/// Let the post-connect settle delay pass
async fn settle() {
    tokio::time::sleep(Duration::from_millis(250)).await;
}

// ============================================================================
// Connection
// ============================================================================

#[tokio::test]
async fn test_connect_and_disconnect() {
    let gateway = MockGateway::start().await.unwrap();
    let client = client_for(&gateway, signed_in());

    client.connect().await.unwrap();
    assert_eq!(client.state(), ConnectionState::Connected);
    assert_eq!(client.session_id().as_deref(), Some("session-1"));
    assert_eq!(client.status().reconnect_attempts, 0);

    client.disconnect();
    assert_eq!(client.state(), ConnectionState::Disconnected);
}

#[tokio::test]
async fn test_wrong_credential_is_rejected() {
    let gateway = MockGateway::start().await.unwrap();
    let client = client_for(&gateway, with_token("not-the-token"));

    let result = client.connect().await;
    assert!(matches!(result, Err(ClientError::AuthRejected(_))));
    assert!(!client.is_connected());
    assert_eq!(gateway.connections(), 0);
}

#[tokio::test]
async fn test_reconnects_after_server_close() {
    let gateway = MockGateway::start().await.unwrap();
    let client = client_for(&gateway, signed_in());
    client.connect().await.unwrap();

    gateway.kick();
    assert!(wait_until(|| gateway.connections() == 2 && client.is_connected()).await);
    assert_eq!(client.session_id().as_deref(), Some("session-2"));
}

// ============================================================================
// Session state replay
// ============================================================================

#[tokio::test]
async fn test_rooms_rejoined_once_after_reconnect() {
    let gateway = MockGateway::start().await.unwrap();
    let client = client_for(&gateway, signed_in());
    client.connect().await.unwrap();

    client.join_conversation(&ConversationId::from("c1"));
    client.join_conversation(&ConversationId::from("c2"));
    assert!(wait_until(|| gateway.received_named("join_conversation").len() == 2).await);

    gateway.kick();
    assert!(wait_until(|| gateway.received_named("join_conversation").len() == 4).await);
    settle().await;

    let joins = gateway.received_named("join_conversation");
    assert_eq!(joins.len(), 4);
    let rejoined: Vec<_> = joins[2..]
        .iter()
        .filter_map(|frame| frame.d.as_ref()?.get("conversationId")?.as_str())
        .collect();
    assert_eq!(rejoined, ["c1", "c2"]);
}

#[tokio::test]
async fn test_queued_emits_delivered_in_order() {
    let gateway = MockGateway::start().await.unwrap();
    let client = client_for(&gateway, signed_in());
    client.connect().await.unwrap();
    settle().await;

    gateway.kick();
    assert!(wait_until(|| !client.is_connected()).await);
    for n in 1..=3 {
        assert_eq!(client.emit("ping_test", json!({ "n": n })), EmitOutcome::Queued);
    }
    assert_eq!(client.pending_events(), 3);

    assert!(wait_until(|| gateway.received_named("ping_test").len() == 3).await);
    settle().await;

    let order: Vec<_> = gateway
        .received_named("ping_test")
        .iter()
        .filter_map(|frame| frame.d.as_ref()?.get("n")?.as_i64())
        .collect();
    assert_eq!(order, [1, 2, 3]);
    assert_eq!(client.pending_events(), 0);
}

#[tokio::test]
async fn test_subscriptions_resent_after_connect() {
    let gateway = MockGateway::start().await.unwrap();
    let client = client_for(&gateway, signed_in());

    let ids = [UserId::from("u1"), UserId::from("u2")];
    assert_eq!(client.subscribe_to_status(&ids), EmitOutcome::Deferred);
    client.connect().await.unwrap();

    assert!(wait_until(|| !gateway.received_named("subscribe_to_status").is_empty()).await);
    settle().await;
    let subscribes = gateway.received_named("subscribe_to_status");
    assert_eq!(subscribes.len(), 1);
    assert_eq!(subscribes[0].d, Some(json!(["u1", "u2"])));
}

// ============================================================================
// Requests and events
// ============================================================================

#[tokio::test]
async fn test_send_message_round_trip() {
    let gateway = MockGateway::start().await.unwrap();
    let client = client_for(&gateway, signed_in());
    client.connect().await.unwrap();

    let reply = client
        .send_message(SendMessageRequest::text(ConversationId::from("c1"), "hello"))
        .await
        .unwrap();
    assert!(reply.is_success());
    assert!(reply.data().and_then(|d| d.get("_id")).is_some());
}

#[tokio::test]
async fn test_presence_query_is_cached() {
    let gateway = MockGateway::start().await.unwrap();
    let client = client_for(&gateway, signed_in());
    client.connect().await.unwrap();

    let ids = [UserId::from("u1"), UserId::from("u2")];
    let statuses = client.get_status(&ids).await.unwrap();
    assert_eq!(statuses.get(&ids[0]), Some(&PresenceStatus::Online));
    assert_eq!(statuses.get(&ids[1]), Some(&PresenceStatus::Online));

    client.get_status(&ids).await.unwrap();
    assert_eq!(gateway.received_named("get_online_status").len(), 1);
}

#[tokio::test]
async fn test_server_events_reach_handlers() {
    let gateway = MockGateway::start().await.unwrap();
    let client = client_for(&gateway, signed_in());
    let seen = Arc::new(AtomicUsize::new(0));
    client.on(EventKind::NewMessage, {
        let seen = seen.clone();
        move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    });
    client.connect().await.unwrap();

    gateway.push_event("new_message", new_message("u2", "m1"));
    assert!(wait_until(|| seen.load(Ordering::SeqCst) == 1).await);
}
