use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identity::EntityId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    #[default]
    Open,
    InProgress,
    Resolved,
    Closed,
}

impl TicketStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Open => "open",
            TicketStatus::InProgress => "in_progress",
            TicketStatus::Resolved => "resolved",
            TicketStatus::Closed => "closed",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "open" => Some(TicketStatus::Open),
            "in_progress" => Some(TicketStatus::InProgress),
            "resolved" => Some(TicketStatus::Resolved),
            "closed" => Some(TicketStatus::Closed),
            _ => None,
        }
    }
}

/// Support ticket, maps to `support_tickets`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    pub id: EntityId,
    pub user_id: EntityId,
    pub subject: String,
    pub description: String,
    pub ticket_type: String,
    pub priority: String,
    pub status: TicketStatus,
    #[serde(default)]
    pub messages: Vec<TicketMessage>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Ticket {
    pub fn empty(id: EntityId) -> Self {
        let now = Utc::now();
        Self {
            user_id: id.clone(),
            id,
            subject: String::new(),
            description: String::new(),
            ticket_type: String::new(),
            priority: NewTicket::DEFAULT_PRIORITY.to_string(),
            status: TicketStatus::default(),
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Message thread entry, maps to `ticket_messages`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketMessage {
    pub id: EntityId,
    pub ticket_id: EntityId,
    pub sender_id: EntityId,
    pub text: String,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
}

/// Administrator reply written together with a status change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TicketReply<'a> {
    pub sender_id: &'a EntityId,
    pub text: &'a str,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTicket {
    pub subject: String,
    pub description: String,
    pub ticket_type: String,
    pub priority: Option<String>,
}

impl NewTicket {
    pub const DEFAULT_PRIORITY: &'static str = "medium";

    pub fn priority_or_default(&self) -> String {
        self.priority
            .clone()
            .unwrap_or_else(|| Self::DEFAULT_PRIORITY.to_string())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketPatch {
    pub status: Option<TicketStatus>,
    pub priority: Option<String>,
}
