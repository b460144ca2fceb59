use chrono::Utc;

use super::keyed::KeyedStore;
use crate::identity::EntityId;
use crate::models::{NewTicket, Ticket, TicketMessage, TicketPatch, TicketStatus};

#[derive(Debug, Default)]
pub struct TicketStore {
    tickets: KeyedStore<Ticket>,
}

impl TicketStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&self, user_id: &EntityId, new: &NewTicket) -> Ticket {
        let now = Utc::now();
        let ticket = Ticket {
            id: EntityId::mint("ticket"),
            user_id: user_id.clone(),
            subject: new.subject.clone(),
            description: new.description.clone(),
            ticket_type: new.ticket_type.clone(),
            priority: new.priority_or_default(),
            status: TicketStatus::Open,
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        self.tickets.insert(ticket.clone());
        ticket
    }

    pub fn get(&self, ticket_id: &EntityId) -> Option<Ticket> {
        self.tickets.get(ticket_id)
    }

    /// Newest first
    pub fn by_user(&self, user_id: &EntityId) -> Vec<Ticket> {
        let mut tickets = self.tickets.filter(|t| &t.user_id == user_id);
        sort_newest_first(&mut tickets);
        tickets
    }

    /// Newest first
    pub fn all(&self) -> Vec<Ticket> {
        let mut tickets = self.tickets.values();
        sort_newest_first(&mut tickets);
        tickets
    }

    pub fn update_status(&self, ticket_id: &EntityId, status: TicketStatus) -> Option<Ticket> {
        if !self.tickets.contains(ticket_id) {
            return None;
        }
        Some(self.tickets.upsert_merge(
            ticket_id,
            TicketPatch {
                status: Some(status),
                priority: None,
            },
        ))
    }

    /// `None` if the ticket does not exist
    pub fn append_message(
        &self,
        ticket_id: &EntityId,
        sender_id: &EntityId,
        text: &str,
        is_admin: bool,
    ) -> Option<TicketMessage> {
        self.tickets.update(ticket_id, |ticket| {
            let now = Utc::now();
            let message = TicketMessage {
                id: EntityId::mint("msg"),
                ticket_id: ticket_id.clone(),
                sender_id: sender_id.clone(),
                text: text.to_string(),
                is_admin,
                created_at: now,
            };
            ticket.messages.push(message.clone());
            ticket.updated_at = now;
            message
        })
    }

    pub fn len(&self) -> usize {
        self.tickets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tickets.is_empty()
    }
}

fn sort_newest_first(tickets: &mut [Ticket]) {
    tickets.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}
