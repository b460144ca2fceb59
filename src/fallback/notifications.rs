use chrono::Utc;
use dashmap::DashMap;

use crate::identity::EntityId;
use crate::models::{NewNotification, Notification};

/// Per-user notification lists, newest first
#[derive(Debug, Default)]
pub struct NotificationStore {
    by_user: DashMap<EntityId, Vec<Notification>>,
}

impl NotificationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn save(&self, new: &NewNotification) -> Notification {
        let now = Utc::now();
        let notification = Notification {
            id: EntityId::mint("notif"),
            user_id: new.user_id.clone(),
            notification_type: new.notification_type.clone(),
            title: new.title.clone(),
            message: new.message.clone(),
            related_type: new.related_type.clone(),
            related_id: new.related_id.clone(),
            action_url: new.action_url.clone(),
            is_read: false,
            created_at: now,
            updated_at: now,
        };
        self.by_user
            .entry(new.user_id.clone())
            .or_default()
            .insert(0, notification.clone());
        notification
    }

    pub fn list(&self, user_id: &EntityId, limit: usize) -> Vec<Notification> {
        self.by_user
            .get(user_id)
            .map(|list| list.iter().take(limit).cloned().collect())
            .unwrap_or_default()
    }

    pub fn unread_count(&self, user_id: &EntityId) -> i64 {
        self.by_user
            .get(user_id)
            .map(|list| list.iter().filter(|n| !n.is_read).count() as i64)
            .unwrap_or(0)
    }

    pub fn contains(&self, user_id: &EntityId, notification_id: &EntityId) -> bool {
        self.by_user
            .get(user_id)
            .map(|list| list.iter().any(|n| &n.id == notification_id))
            .unwrap_or(false)
    }

    /// Returns the number of notifications flipped to read
    pub fn mark_read(&self, user_id: &EntityId, notification_id: &EntityId) -> u64 {
        self.mark_where(user_id, |n| &n.id == notification_id)
    }

    pub fn mark_all_read(&self, user_id: &EntityId) -> u64 {
        self.mark_where(user_id, |_| true)
    }

    pub fn mark_related_read(
        &self,
        user_id: &EntityId,
        notification_type: &str,
        related_id: &str,
    ) -> u64 {
        self.mark_where(user_id, |n| {
            n.notification_type == notification_type && n.related_id.as_deref() == Some(related_id)
        })
    }

    pub fn remove(&self, user_id: &EntityId, notification_id: &EntityId) -> Option<Notification> {
        let mut list = self.by_user.get_mut(user_id)?;
        let position = list.iter().position(|n| &n.id == notification_id)?;
        Some(list.remove(position))
    }

    fn mark_where<F>(&self, user_id: &EntityId, predicate: F) -> u64
    where
        F: Fn(&Notification) -> bool,
    {
        let Some(mut list) = self.by_user.get_mut(user_id) else {
            return 0;
        };
        let now = Utc::now();
        let mut changed = 0;
        for notification in list.iter_mut().filter(|n| !n.is_read && predicate(n)) {
            notification.is_read = true;
            notification.updated_at = now;
            changed += 1;
        }
        changed
    }
}
