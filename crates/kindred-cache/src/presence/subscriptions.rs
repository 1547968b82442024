//! Status subscription set

use kindred_core::UserId;

/// Users whose presence pushes should be cached, in subscription order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusSubscriptions {
    ids: Vec<UserId>,
}

impl StatusSubscriptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add ids; returns those that were not subscribed yet
    pub fn add(&mut self, user_ids: &[UserId]) -> Vec<UserId> {
        let mut added = Vec::new();
        for user_id in user_ids {
            if !self.ids.contains(user_id) {
                self.ids.push(user_id.clone());
                added.push(user_id.clone());
            }
        }
        added
    }

    /// Remove ids; returns those that were subscribed
    pub fn remove(&mut self, user_ids: &[UserId]) -> Vec<UserId> {
        let mut removed = Vec::new();
        self.ids.retain(|id| {
            if user_ids.contains(id) {
                removed.push(id.clone());
                false
            } else {
                true
            }
        });
        removed
    }

    #[must_use]
    pub fn contains(&self, user_id: &UserId) -> bool {
        self.ids.contains(user_id)
    }

    #[must_use]
    pub fn ids(&self) -> &[UserId] {
        &self.ids
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }
}
