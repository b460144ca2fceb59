use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::UserSummary;
use crate::identity::EntityId;

/// Block record, maps to `user_blocks`
///
/// Field names are camelCase on disk so the persisted fallback block list
/// stays readable by earlier deployments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub id: EntityId,
    pub blocker_id: EntityId,
    pub blocked_id: EntityId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Block {
    pub fn is_between(&self, a: &EntityId, b: &EntityId) -> bool {
        (&self.blocker_id == a && &self.blocked_id == b)
            || (&self.blocker_id == b && &self.blocked_id == a)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockedUser {
    pub id: EntityId,
    pub blocked_user: UserSummary,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockStatus {
    pub i_blocked_them: bool,
    pub they_blocked_me: bool,
    pub is_blocked: bool,
}

impl BlockStatus {
    pub fn new(i_blocked_them: bool, they_blocked_me: bool) -> Self {
        Self {
            i_blocked_them,
            they_blocked_me,
            is_blocked: i_blocked_them || they_blocked_me,
        }
    }
}
