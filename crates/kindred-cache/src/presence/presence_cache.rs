//! TTL-bounded presence cache

use kindred_core::{PresenceStatus, UserId};
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

use crate::clock::SharedClock;

/// A cached status observation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PresenceEntry {
    pub status: PresenceStatus,
    pub observed_at: Instant,
}

/// Last-write-wins status cache with per-entry expiry.
///
/// Expired entries are never returned. They are physically removed either by
/// [`PresenceCache::purge_expired`] or by [`PresenceCache::expire_if_unchanged`], which
/// only removes an entry that has not been overwritten since it was observed.
#[derive(Debug)]
pub struct PresenceCache {
    entries: RwLock<HashMap<UserId, PresenceEntry>>,
    ttl: Duration,
    clock: SharedClock,
}

impl PresenceCache {
    /// Default entry lifetime (5 minutes)
    pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

    #[must_use]
    pub fn new(ttl: Duration, clock: SharedClock) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
            clock,
        }
    }

    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn is_fresh(&self, entry: &PresenceEntry, now: Instant) -> bool {
        now.saturating_duration_since(entry.observed_at) < self.ttl
    }

    /// Record a status; returns the stored entry
    pub fn insert(&self, user_id: UserId, status: PresenceStatus) -> PresenceEntry {
        let entry = PresenceEntry {
            status,
            observed_at: self.clock.now(),
        };
        self.entries.write().insert(user_id, entry);
        entry
    }

    /// Fresh status for a user
    #[must_use]
    pub fn get(&self, user_id: &UserId) -> Option<PresenceStatus> {
        self.entry(user_id).map(|entry| entry.status)
    }

    /// Fresh entry for a user
    #[must_use]
    pub fn entry(&self, user_id: &UserId) -> Option<PresenceEntry> {
        let now = self.clock.now();
        self.entries
            .read()
            .get(user_id)
            .filter(|entry| self.is_fresh(entry, now))
            .copied()
    }

    /// Split a request into fresh hits and ids that need a remote lookup.
    ///
    /// Misses keep request order and contain no duplicates.
    #[must_use]
    pub fn partition(&self, user_ids: &[UserId]) -> (HashMap<UserId, PresenceStatus>, Vec<UserId>) {
        let now = self.clock.now();
        let entries = self.entries.read();
        let mut hits = HashMap::new();
        let mut misses = Vec::new();
        let mut seen = HashSet::new();

        for user_id in user_ids {
            if !seen.insert(user_id) {
                continue;
            }
            match entries.get(user_id).filter(|e| self.is_fresh(e, now)) {
                Some(entry) => {
                    hits.insert(user_id.clone(), entry.status);
                }
                None => misses.push(user_id.clone()),
            }
        }

        (hits, misses)
    }

    /// Remove `user_id` if its entry is still `observed` and has expired.
    ///
    /// Returns false when the entry was overwritten in the meantime or is still fresh.
    pub fn expire_if_unchanged(&self, user_id: &UserId, observed: &PresenceEntry) -> bool {
        let now = self.clock.now();
        let mut entries = self.entries.write();
        match entries.get(user_id) {
            Some(current) if current == observed && !self.is_fresh(current, now) => {
                entries.remove(user_id);
                true
            }
            _ => false,
        }
    }

    /// Drop every expired entry; returns the number removed
    ///
    /// Entries overwritten between the scan and the removal are kept.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let expired: Vec<(UserId, PresenceEntry)> = self
            .entries
            .read()
            .iter()
            .filter(|(_, entry)| !self.is_fresh(entry, now))
            .map(|(id, entry)| (id.clone(), *entry))
            .collect();

        let removed = expired
            .iter()
            .filter(|(id, entry)| self.expire_if_unchanged(id, entry))
            .count();
        if removed > 0 {
            tracing::trace!(removed = removed, "Purged expired presence entries");
        }
        removed
    }

    pub fn remove(&self, user_id: &UserId) -> bool {
        self.entries.write().remove(user_id).is_some()
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }

    /// Number of stored entries, expired ones included until purged
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use std::sync::Arc;

    fn cache() -> (PresenceCache, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        (PresenceCache::new(PresenceCache::DEFAULT_TTL, clock.clone()), clock)
    }

    #[test]
    fn test_insert_and_get() {
        let (cache, _) = cache();
        cache.insert(UserId::from("u1"), PresenceStatus::Online);
        assert_eq!(cache.get(&UserId::from("u1")), Some(PresenceStatus::Online));
        assert_eq!(cache.get(&UserId::from("u2")), None);
    }

    #[test]
    fn test_last_write_wins() {
        let (cache, _) = cache();
        cache.insert(UserId::from("u1"), PresenceStatus::Online);
        cache.insert(UserId::from("u1"), PresenceStatus::Away);
        assert_eq!(cache.get(&UserId::from("u1")), Some(PresenceStatus::Away));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_entry_expires_after_ttl() {
        let (cache, clock) = cache();
        cache.insert(UserId::from("u1"), PresenceStatus::Online);

        clock.advance(Duration::from_secs(299));
        assert_eq!(cache.get(&UserId::from("u1")), Some(PresenceStatus::Online));

        clock.advance(Duration::from_secs(1));
        assert_eq!(cache.get(&UserId::from("u1")), None);
    }

    #[test]
    fn test_partition_hits_and_misses() {
        let (cache, _) = cache();
        cache.insert(UserId::from("u1"), PresenceStatus::Online);
        cache.insert(UserId::from("u2"), PresenceStatus::Busy);

        let ids = vec![
            UserId::from("u1"),
            UserId::from("u3"),
            UserId::from("u2"),
            UserId::from("u3"),
        ];
        let (hits, misses) = cache.partition(&ids);

        assert_eq!(hits.len(), 2);
        assert_eq!(hits[&UserId::from("u2")], PresenceStatus::Busy);
        assert_eq!(misses, vec![UserId::from("u3")]);
    }

    #[test]
    fn test_expire_if_unchanged_skips_overwritten_entry() {
        let (cache, clock) = cache();
        let first = cache.insert(UserId::from("u1"), PresenceStatus::Online);

        clock.advance(Duration::from_secs(200));
        cache.insert(UserId::from("u1"), PresenceStatus::Offline);
        clock.advance(Duration::from_secs(200));

        // first observation is stale but was overwritten, so nothing is removed
        assert!(!cache.expire_if_unchanged(&UserId::from("u1"), &first));
        assert_eq!(cache.get(&UserId::from("u1")), Some(PresenceStatus::Offline));
    }

    #[test]
    fn test_expire_if_unchanged_removes_stale_entry() {
        let (cache, clock) = cache();
        let entry = cache.insert(UserId::from("u1"), PresenceStatus::Online);

        assert!(!cache.expire_if_unchanged(&UserId::from("u1"), &entry));

        clock.advance(Duration::from_secs(300));
        assert!(cache.expire_if_unchanged(&UserId::from("u1"), &entry));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_purge_expired() {
        let (cache, clock) = cache();
        cache.insert(UserId::from("u1"), PresenceStatus::Online);
        clock.advance(Duration::from_secs(240));
        cache.insert(UserId::from("u2"), PresenceStatus::Online);
        clock.advance(Duration::from_secs(120));

        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&UserId::from("u2")), Some(PresenceStatus::Online));
    }
}
