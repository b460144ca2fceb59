use super::Actor;
use crate::availability::Connector;
use crate::database::TicketQueries;
use crate::error::{MarketplaceError, MarketplaceResult};
use crate::identity::EntityId;
use crate::models::{NewTicket, Ticket, TicketMessage, TicketReply, TicketStatus};
use crate::router::PersistenceRouter;

/// Support tickets; owners see their own, administrators see all
pub struct TicketService<C: Connector> {
    router: PersistenceRouter<C>,
}

fn ticket_not_found(ticket_id: &EntityId) -> MarketplaceError {
    MarketplaceError::not_found(format!("support ticket {ticket_id}"))
}

fn ensure_participant(actor: &Actor, ticket: &Ticket) -> MarketplaceResult<()> {
    if actor.is_admin() || ticket.user_id == actor.id {
        Ok(())
    } else {
        Err(MarketplaceError::Forbidden(
            "not a participant of this ticket".to_string(),
        ))
    }
}

impl<C> TicketService<C>
where
    C: Connector,
    C::Connection: TicketQueries,
{
    pub fn new(router: PersistenceRouter<C>) -> Self {
        Self { router }
    }

    pub async fn create(&self, actor: &Actor, new: &NewTicket) -> MarketplaceResult<Ticket> {
        if [&new.subject, &new.description, &new.ticket_type]
            .iter()
            .any(|field| field.trim().is_empty())
        {
            return Err(MarketplaceError::validation(
                "subject, description and ticket type are required",
            ));
        }

        let user_id = &actor.id;
        self.router
            .execute(
                "create_ticket",
                &[user_id],
                |db| async move { db.insert_ticket(user_id, new).await },
                |store| async move { Ok(store.tickets.create(user_id, new)) },
            )
            .await
    }

    /// Newest first
    pub async fn my_tickets(&self, actor: &Actor) -> MarketplaceResult<Vec<Ticket>> {
        let user_id = &actor.id;
        self.router
            .execute(
                "my_tickets",
                &[user_id],
                |db| async move { db.tickets_for_user(user_id).await },
                |store| async move { Ok(store.tickets.by_user(user_id)) },
            )
            .await
    }

    /// Visible to the owner and to administrators; hidden from everyone else
    pub async fn detail(&self, actor: &Actor, ticket_id: &EntityId) -> MarketplaceResult<Ticket> {
        let ticket = self
            .router
            .execute(
                "ticket_detail",
                &[ticket_id],
                |db| async move { db.find_ticket(ticket_id).await },
                |store| async move { Ok(store.tickets.get(ticket_id)) },
            )
            .await?
            .ok_or_else(|| ticket_not_found(ticket_id))?;

        match ensure_participant(actor, &ticket) {
            Ok(()) => Ok(ticket),
            Err(_) => Err(ticket_not_found(ticket_id)),
        }
    }

    /// Administrators only, newest first
    pub async fn all(&self, actor: &Actor) -> MarketplaceResult<Vec<Ticket>> {
        actor.require_admin()?;
        self.router
            .execute(
                "all_tickets",
                &[],
                |db| async move { db.all_tickets().await },
                |store| async move { Ok(store.tickets.all()) },
            )
            .await
    }

    /// Administrators only; an optional reply is appended as an admin message
    /// together with the status change
    pub async fn update_status(
        &self,
        actor: &Actor,
        ticket_id: &EntityId,
        status: TicketStatus,
        reply: Option<&str>,
    ) -> MarketplaceResult<Ticket> {
        actor.require_admin()?;
        let reply = reply.filter(|text| !text.trim().is_empty());
        let admin_id = &actor.id;

        self.router
            .execute(
                "update_ticket_status",
                &[ticket_id, admin_id],
                |db| async move {
                    let reply = reply.map(|text| TicketReply {
                        sender_id: admin_id,
                        text,
                    });
                    db.update_ticket_status(ticket_id, status, reply)
                        .await?
                        .ok_or_else(|| ticket_not_found(ticket_id))
                },
                |store| async move {
                    store
                        .tickets
                        .update_status(ticket_id, status)
                        .ok_or_else(|| ticket_not_found(ticket_id))?;
                    if let Some(text) = reply {
                        store.tickets.append_message(ticket_id, admin_id, text, true);
                    }
                    store
                        .tickets
                        .get(ticket_id)
                        .ok_or_else(|| ticket_not_found(ticket_id))
                },
            )
            .await
    }

    /// Owner or administrator; `is_admin` on the message follows the sender
    pub async fn add_message(
        &self,
        actor: &Actor,
        ticket_id: &EntityId,
        text: &str,
    ) -> MarketplaceResult<TicketMessage> {
        if text.trim().is_empty() {
            return Err(MarketplaceError::validation("message cannot be empty"));
        }

        self.router
            .execute(
                "add_ticket_message",
                &[ticket_id, &actor.id],
                |db| async move {
                    let ticket = db
                        .find_ticket(ticket_id)
                        .await?
                        .ok_or_else(|| ticket_not_found(ticket_id))?;
                    ensure_participant(actor, &ticket)?;
                    db.insert_ticket_message(ticket_id, &actor.id, text, actor.is_admin())
                        .await
                },
                |store| async move {
                    let ticket = store
                        .tickets
                        .get(ticket_id)
                        .ok_or_else(|| ticket_not_found(ticket_id))?;
                    ensure_participant(actor, &ticket)?;
                    store
                        .tickets
                        .append_message(ticket_id, &actor.id, text, actor.is_admin())
                        .ok_or_else(|| ticket_not_found(ticket_id))
                },
            )
            .await
    }
}
