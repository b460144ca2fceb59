use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identity::EntityId;

/// In-app notification, maps to `notifications`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: EntityId,
    pub user_id: EntityId,
    #[serde(rename = "type")]
    pub notification_type: String,
    pub title: String,
    pub message: String,
    pub related_type: Option<String>,
    pub related_id: Option<String>,
    pub action_url: Option<String>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// New notification (without generated fields)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewNotification {
    pub user_id: EntityId,
    #[serde(rename = "type")]
    pub notification_type: String,
    pub title: String,
    pub message: String,
    pub related_type: Option<String>,
    pub related_id: Option<String>,
    pub action_url: Option<String>,
}

impl NewNotification {
    pub fn new(
        user_id: EntityId,
        notification_type: impl Into<String>,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            user_id,
            notification_type: notification_type.into(),
            title: title.into(),
            message: message.into(),
            related_type: None,
            related_id: None,
            action_url: None,
        }
    }

    pub fn related_to(mut self, related_type: impl Into<String>, related_id: impl Into<String>) -> Self {
        self.related_type = Some(related_type.into());
        self.related_id = Some(related_id.into());
        self
    }
}
