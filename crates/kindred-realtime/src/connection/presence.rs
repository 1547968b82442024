//! Presence queries, subscriptions and the expiry sweep

use kindred_common::{ClientError, ClientResult};
use kindred_core::{
    AckResponse, ClientOp, OnlineStatusSnapshot, OnlineStatusUpdate, PresenceStatus,
    ServerEvent, UserId,
};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

use super::ack::EmitOutcome;
use super::client::{to_payload, ClientInner, RealtimeClient};
use crate::queue::PendingEvent;

impl RealtimeClient {
    /// Status of each user.
    ///
    /// Fresh cache entries are answered locally; the rest are fetched with one
    /// `get_online_status` request and merged into the cache. Users the server did
    /// not report are absent from the result.
    ///
    /// # Errors
    /// [`ClientError::RemoteQuery`] if a query is needed and fails, times out, or the
    /// client is offline. The cache is left untouched in that case.
    pub async fn get_status(
        &self,
        user_ids: &[UserId],
    ) -> ClientResult<HashMap<UserId, PresenceStatus>> {
        let (mut statuses, misses) = self.inner.presence.partition(user_ids);
        if misses.is_empty() {
            return Ok(statuses);
        }
        if !self.is_connected() {
            return Err(ClientError::RemoteQuery("not connected".to_string()));
        }

        debug!(hits = statuses.len(), misses = misses.len(), "Querying presence");
        let reply = self
            .emit_with_ack(ClientOp::GetOnlineStatus, to_payload(&misses))
            .with_timeout(self.inner.options.presence_query_timeout)
            .await
            .map_err(|e| match e {
                ClientError::RemoteQuery(_) => e,
                other => ClientError::RemoteQuery(other.to_string()),
            })?;

        let fetched = parse_status_reply(&reply)?;
        let mut snapshot = OnlineStatusSnapshot::default();
        for user_id in misses {
            if let Some(status) = fetched.get(&user_id).copied() {
                self.inner.presence.insert(user_id.clone(), status);
                snapshot.statuses.insert(user_id.clone(), status.is_online());
                statuses.insert(user_id, status);
            }
        }

        self.inner
            .dispatcher
            .dispatch(&ServerEvent::OnlineStatusResponse(snapshot));
        Ok(statuses)
    }

    /// Follow presence pushes for these users.
    ///
    /// The set is resent after every reconnect. Returns [`EmitOutcome::Deferred`] when
    /// offline.
    pub fn subscribe_to_status(&self, user_ids: &[UserId]) -> EmitOutcome {
        let mut state = self.inner.session.lock();
        let added = state.subscriptions.add(user_ids);
        debug!(added = added.len(), total = state.subscriptions.len(), "Status subscription");

        let mut requested: Vec<&UserId> = Vec::with_capacity(user_ids.len());
        for user_id in user_ids {
            if !requested.contains(&user_id) {
                requested.push(user_id);
            }
        }
        self.inner
            .announce_locked(&state, ClientOp::SubscribeToStatus, to_payload(&requested))
    }

    /// Stop following presence pushes for these users
    pub fn unsubscribe_from_status(&self, user_ids: &[UserId]) -> EmitOutcome {
        let mut state = self.inner.session.lock();
        let removed = state.subscriptions.remove(user_ids);
        if removed.is_empty() {
            return EmitOutcome::Deferred;
        }
        self.inner
            .announce_locked(&state, ClientOp::UnsubscribeFromStatus, to_payload(&removed))
    }

    /// Publish our own status; no reply is expected
    pub fn update_own_status(&self, is_online: bool, status: Option<PresenceStatus>) -> EmitOutcome {
        let payload = to_payload(&OnlineStatusUpdate::new(is_online, status));
        let mut state = self.inner.session.lock();
        self.inner.emit_locked(
            &mut state,
            PendingEvent::new(ClientOp::UpdateOnlineStatus, payload, None),
        )
    }

    /// Cached, non-expired status
    #[must_use]
    pub fn cached_status(&self, user_id: &UserId) -> Option<PresenceStatus> {
        self.inner.presence.get(user_id)
    }

    #[must_use]
    pub fn is_user_online(&self, user_id: &UserId) -> bool {
        self.cached_status(user_id)
            .is_some_and(PresenceStatus::is_online)
    }

    pub fn clear_presence(&self) {
        self.inner.presence.clear();
    }

    #[must_use]
    pub fn subscriptions(&self) -> Vec<UserId> {
        self.inner.session.lock().subscriptions.ids().to_vec()
    }
}

impl ClientInner {
    /// Cache pushed statuses, but only for subscribed users
    pub(crate) fn observe_presence(&self, event: &ServerEvent) {
        match event {
            ServerEvent::UserOnline(push) => {
                self.cache_pushed(&push.user_id, PresenceStatus::Online);
            }
            ServerEvent::UserOffline(push) => {
                self.cache_pushed(&push.user_id, PresenceStatus::Offline);
            }
            ServerEvent::UserStatusChange(push) => {
                self.cache_pushed(&push.user_id, push.effective_status(PresenceStatus::Offline));
            }
            ServerEvent::OnlineStatusResponse(snapshot) => {
                for (user_id, status) in snapshot.iter() {
                    self.cache_pushed(user_id, status);
                }
            }
            _ => {}
        }
    }

    fn cache_pushed(&self, user_id: &UserId, status: PresenceStatus) {
        let subscribed = self.session.lock().subscriptions.contains(user_id);
        if subscribed {
            self.presence.insert(user_id.clone(), status);
        }
    }

    pub(crate) fn spawn_sweeper(self: &Arc<Self>) -> JoinHandle<()> {
        let weak = Arc::downgrade(self);
        let period = self.options.presence_sweep_interval;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                let purged = inner.presence.purge_expired();
                if purged > 0 {
                    debug!(purged, "Expired presence entries removed");
                }
            }
        })
    }
}

/// Parse a `get_online_status` reply: userId → bool (or a status string)
fn parse_status_reply(reply: &AckResponse) -> ClientResult<HashMap<UserId, PresenceStatus>> {
    if reply.has_error() {
        return Err(ClientError::RemoteQuery(
            reply
                .error_message()
                .unwrap_or_else(|| "presence query failed".to_string()),
        ));
    }

    let body = reply
        .data()
        .filter(|data| data.is_object())
        .unwrap_or(reply.as_value());
    let Some(entries) = body.as_object() else {
        return Err(ClientError::RemoteQuery(format!(
            "unexpected presence reply: {body}"
        )));
    };

    Ok(entries
        .iter()
        .filter_map(|(user_id, value)| {
            let status = match value {
                Value::Bool(online) => PresenceStatus::from_online(*online),
                Value::String(status) => status.parse().ok()?,
                _ => return None,
            };
            Some((UserId::from(user_id.as_str()), status))
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::super::client::test_support::*;
    use super::*;
    use crate::transport::mock::MockTransport;
    use serde_json::json;
    use std::time::Duration;

    fn ids(raw: &[&str]) -> Vec<UserId> {
        raw.iter().map(|id| UserId::from(*id)).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_fresh_entries_need_no_query() {
        let transport = Arc::new(MockTransport::new());
        let client = client_with(&transport);
        client.inner.presence.insert(UserId::from("u1"), PresenceStatus::Online);
        client.inner.presence.insert(UserId::from("u2"), PresenceStatus::Away);

        let statuses = client.get_status(&ids(&["u1", "u2"])).await.unwrap();
        assert_eq!(statuses[&UserId::from("u1")], PresenceStatus::Online);
        assert_eq!(statuses[&UserId::from("u2")], PresenceStatus::Away);
        assert!(transport.sent().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_misses_are_fetched_in_one_batch() {
        let (client, transport) = connected_client().await;
        client.inner.presence.insert(UserId::from("u1"), PresenceStatus::Online);

        let task = tokio::spawn({
            let client = client.clone();
            async move { client.get_status(&ids(&["u1", "u2", "u3", "u2"])).await }
        });
        until(|| transport.last_request_id("get_online_status").is_some()).await;

        let request = transport.sent_named("get_online_status");
        assert_eq!(request.len(), 1);
        assert_eq!(request[0].d, Some(json!(["u2", "u3"])));

        let id = transport.last_request_id("get_online_status").unwrap();
        transport.push_ack(id, json!({ "u2": true, "u3": false }));

        let statuses = task.await.unwrap().unwrap();
        assert_eq!(statuses.len(), 3);
        assert_eq!(statuses[&UserId::from("u3")], PresenceStatus::Offline);
        assert_eq!(client.cached_status(&UserId::from("u2")), Some(PresenceStatus::Online));
    }

    #[tokio::test(start_paused = true)]
    async fn test_query_error_leaves_cache_untouched() {
        let (client, transport) = connected_client().await;

        let task = tokio::spawn({
            let client = client.clone();
            async move { client.get_status(&ids(&["u2"])).await }
        });
        until(|| transport.last_request_id("get_online_status").is_some()).await;
        let id = transport.last_request_id("get_online_status").unwrap();
        transport.push_ack(id, json!({ "error": "rate limited" }));

        let result = task.await.unwrap();
        assert!(matches!(result, Err(ClientError::RemoteQuery(reason)) if reason == "rate limited"));
        assert!(client.cached_status(&UserId::from("u2")).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_query_timeout() {
        let (client, _transport) = connected_client().await;

        let result = client.get_status(&ids(&["u2"])).await;
        assert!(matches!(result, Err(ClientError::RemoteQuery(_))));
        assert_eq!(client.status().cached_presence, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timed_out_queries_leave_no_pending_replies() {
        let (client, _transport) = connected_client().await;

        for n in 0..5 {
            let result = client.get_status(&[UserId::from(format!("u{n}"))]).await;
            assert!(matches!(result, Err(ClientError::RemoteQuery(_))));
        }
        assert_eq!(client.inner.acks.len(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_query_while_offline() {
        let transport = Arc::new(MockTransport::new());
        let client = client_with(&transport);

        let result = client.get_status(&ids(&["u2"])).await;
        assert!(matches!(result, Err(ClientError::RemoteQuery(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_subscribe_before_connect_resends_once() {
        let transport = Arc::new(MockTransport::new());
        let client = client_with(&transport);

        assert_eq!(
            client.subscribe_to_status(&ids(&["u1", "u2"])),
            EmitOutcome::Deferred
        );
        connect(&client, &transport).await;
        settle().await;

        let sent = transport.sent_named("subscribe_to_status");
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].d, Some(json!(["u1", "u2"])));
    }

    #[tokio::test(start_paused = true)]
    async fn test_pushes_cached_only_for_subscribed_users() {
        let (client, transport) = connected_client().await;
        client.subscribe_to_status(&ids(&["u1"]));

        transport.push_event("user_online", json!({ "userId": "u1" }));
        transport.push_event("user_online", json!({ "userId": "u9" }));
        transport.push_event(
            "user_status_change",
            json!({ "userId": "u1", "status": "busy" }),
        );
        until(|| client.cached_status(&UserId::from("u1")) == Some(PresenceStatus::Busy)).await;

        assert!(client.cached_status(&UserId::from("u9")).is_none());
        assert!(!client.is_user_online(&UserId::from("u1")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unsubscribe_sends_removed_ids() {
        let (client, transport) = connected_client().await;
        client.subscribe_to_status(&ids(&["u1", "u2"]));

        assert_eq!(
            client.unsubscribe_from_status(&ids(&["u2", "u7"])),
            EmitOutcome::Sent
        );
        let sent = transport.sent_named("unsubscribe_from_status");
        assert_eq!(sent[0].d, Some(json!(["u2"])));
        assert_eq!(client.subscriptions(), ids(&["u1"]));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_purges_expired_entries() {
        let (client, transport) = connected_client().await;
        client.subscribe_to_status(&ids(&["u1"]));
        transport.push_event("user_offline", json!({ "userId": "u1" }));
        until(|| client.status().cached_presence == 1).await;

        tokio::time::sleep(Duration::from_secs(400)).await;
        assert_eq!(client.status().cached_presence, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_update_own_status_payload() {
        let (client, transport) = connected_client().await;

        assert_eq!(client.update_own_status(true, None), EmitOutcome::Sent);
        let sent = transport.sent_named("update_online_status");
        assert_eq!(sent[0].d, Some(json!({ "isOnline": true, "status": "online" })));
    }
}
