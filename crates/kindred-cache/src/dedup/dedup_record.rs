//! Capped record of surfaced notifications.

use kindred_core::{ConversationId, MatchId, MessageId, UserId};
use std::collections::{HashSet, VecDeque};

/// Key prefix for message notifications
const MESSAGE_PREFIX: &str = "msg:";
/// Key prefix for like notifications
const LIKE_PREFIX: &str = "like:";
/// Key prefix for match notifications
const MATCH_PREFIX: &str = "match:";

/// Builders for dedup keys
pub struct DedupKey;

impl DedupKey {
    /// `msg:{conversation}:{message}`
    #[must_use]
    pub fn message(conversation_id: &ConversationId, message_id: &MessageId) -> String {
        format!("{MESSAGE_PREFIX}{conversation_id}:{message_id}")
    }

    /// `like:{match or liker}:{liker}:{like}`; `None` when the like carries no identity
    /// and cannot be told apart from a later like by the same user
    #[must_use]
    pub fn like(
        user_id: &UserId,
        match_id: Option<&MatchId>,
        event_id: Option<&str>,
    ) -> Option<String> {
        let event_id = event_id?;
        Some(match match_id {
            Some(match_id) => format!("{LIKE_PREFIX}{match_id}:{user_id}:{event_id}"),
            None => format!("{LIKE_PREFIX}{user_id}:{user_id}:{event_id}"),
        })
    }

    /// `match:{match}`
    #[must_use]
    pub fn match_(match_id: &MatchId) -> String {
        format!("{MATCH_PREFIX}{match_id}")
    }
}

/// Insertion-ordered set of keys with batch eviction.
///
/// Once the set grows past `capacity`, the oldest `evict_batch` keys are dropped in one go.
#[derive(Debug, Clone)]
pub struct DedupRecord {
    keys: HashSet<String>,
    order: VecDeque<String>,
    capacity: usize,
    evict_batch: usize,
}

impl DedupRecord {
    /// Default number of keys held before eviction
    pub const DEFAULT_CAPACITY: usize = 1000;
    /// Default number of keys dropped per eviction
    pub const DEFAULT_EVICT_BATCH: usize = 500;

    #[must_use]
    pub fn new(capacity: usize, evict_batch: usize) -> Self {
        Self {
            keys: HashSet::with_capacity(capacity + 1),
            order: VecDeque::with_capacity(capacity + 1),
            capacity,
            evict_batch: evict_batch.clamp(1, capacity.max(1)),
        }
    }

    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(Self::DEFAULT_CAPACITY, Self::DEFAULT_EVICT_BATCH)
    }

    /// Insert a key. Returns `true` if it was new, `false` if already recorded.
    pub fn check_and_insert(&mut self, key: impl Into<String>) -> bool {
        let key = key.into();
        if self.keys.contains(&key) {
            return false;
        }

        self.keys.insert(key.clone());
        self.order.push_back(key);

        if self.order.len() > self.capacity {
            let batch = self.evict_batch.min(self.order.len());
            for old in self.order.drain(..batch) {
                self.keys.remove(&old);
            }
            tracing::debug!(evicted = batch, remaining = self.order.len(), "Dedup record evicted");
        }

        true
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn clear(&mut self) {
        self.keys.clear();
        self.order.clear();
    }
}

impl Default for DedupRecord {
    fn default() -> Self {
        Self::with_defaults()
    }
}
