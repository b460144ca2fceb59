use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgConnection;

use super::decode_enum;
use crate::database::connection::PgDatabase;
use crate::database::queries::TicketQueries;
use crate::error::{MarketplaceError, MarketplaceResult};
use crate::identity::EntityId;
use crate::models::{NewTicket, Ticket, TicketMessage, TicketReply, TicketStatus};

#[derive(Debug, sqlx::FromRow)]
struct TicketRow {
    id: String,
    user_id: String,
    subject: String,
    description: String,
    ticket_type: String,
    priority: String,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<TicketRow> for Ticket {
    type Error = MarketplaceError;

    fn try_from(row: TicketRow) -> Result<Self, Self::Error> {
        Ok(Ticket {
            status: decode_enum(&row.status, "support_tickets.status", TicketStatus::parse)?,
            id: row.id.into(),
            user_id: row.user_id.into(),
            subject: row.subject,
            description: row.description,
            ticket_type: row.ticket_type,
            priority: row.priority,
            messages: Vec::new(),
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct TicketMessageRow {
    id: String,
    ticket_id: String,
    sender_id: String,
    text: String,
    is_admin: bool,
    created_at: DateTime<Utc>,
}

impl From<TicketMessageRow> for TicketMessage {
    fn from(row: TicketMessageRow) -> Self {
        TicketMessage {
            id: row.id.into(),
            ticket_id: row.ticket_id.into(),
            sender_id: row.sender_id.into(),
            text: row.text,
            is_admin: row.is_admin,
            created_at: row.created_at,
        }
    }
}

const TICKET_COLUMNS: &str = "id::text AS id, user_id::text AS user_id, subject, description, \
     ticket_type, priority, status, created_at, updated_at";

const MESSAGE_COLUMNS: &str =
    "id::text AS id, ticket_id::text AS ticket_id, sender_id::text AS sender_id, text, is_admin, created_at";

#[async_trait]
impl TicketQueries for PgDatabase {
    async fn insert_ticket(&self, user_id: &EntityId, new: &NewTicket) -> MarketplaceResult<Ticket> {
        let sql = format!(
            "INSERT INTO support_tickets (user_id, subject, description, ticket_type, priority) \
             VALUES ($1::uuid, $2, $3, $4, $5) RETURNING {TICKET_COLUMNS}"
        );
        let row = sqlx::query_as::<_, TicketRow>(&sql)
            .bind(user_id.as_str())
            .bind(&new.subject)
            .bind(&new.description)
            .bind(&new.ticket_type)
            .bind(new.priority_or_default())
            .fetch_one(self.pool())
            .await?;
        row.try_into()
    }

    async fn tickets_for_user(&self, user_id: &EntityId) -> MarketplaceResult<Vec<Ticket>> {
        let sql = format!(
            "SELECT {TICKET_COLUMNS} FROM support_tickets WHERE user_id = $1::uuid ORDER BY created_at DESC"
        );
        let rows = sqlx::query_as::<_, TicketRow>(&sql)
            .bind(user_id.as_str())
            .fetch_all(self.pool())
            .await?;
        rows.into_iter().map(Ticket::try_from).collect()
    }

    async fn find_ticket(&self, ticket_id: &EntityId) -> MarketplaceResult<Option<Ticket>> {
        let sql = format!("SELECT {TICKET_COLUMNS} FROM support_tickets WHERE id = $1::uuid");
        let Some(row) = sqlx::query_as::<_, TicketRow>(&sql)
            .bind(ticket_id.as_str())
            .fetch_optional(self.pool())
            .await?
        else {
            return Ok(None);
        };
        let mut ticket = Ticket::try_from(row)?;

        let mut conn = self.pool().acquire().await?;
        ticket.messages = messages_in(&mut *conn, ticket_id).await?;
        Ok(Some(ticket))
    }

    async fn all_tickets(&self) -> MarketplaceResult<Vec<Ticket>> {
        let sql = format!("SELECT {TICKET_COLUMNS} FROM support_tickets ORDER BY created_at DESC");
        let rows = sqlx::query_as::<_, TicketRow>(&sql)
            .fetch_all(self.pool())
            .await?;
        rows.into_iter().map(Ticket::try_from).collect()
    }

    async fn update_ticket_status(
        &self,
        ticket_id: &EntityId,
        status: TicketStatus,
        reply: Option<TicketReply<'_>>,
    ) -> MarketplaceResult<Option<Ticket>> {
        let mut tx = self.pool().begin().await?;

        let sql = format!(
            "UPDATE support_tickets SET status = $2, updated_at = NOW() \
             WHERE id = $1::uuid RETURNING {TICKET_COLUMNS}"
        );
        let Some(row) = sqlx::query_as::<_, TicketRow>(&sql)
            .bind(ticket_id.as_str())
            .bind(status.as_str())
            .fetch_optional(&mut *tx)
            .await?
        else {
            return Ok(None);
        };
        let mut ticket = Ticket::try_from(row)?;

        if let Some(reply) = reply {
            insert_message_in(&mut *tx, ticket_id, reply.sender_id, reply.text, true).await?;
        }
        ticket.messages = messages_in(&mut *tx, ticket_id).await?;

        tx.commit().await?;
        Ok(Some(ticket))
    }

    async fn insert_ticket_message(
        &self,
        ticket_id: &EntityId,
        sender_id: &EntityId,
        text: &str,
        is_admin: bool,
    ) -> MarketplaceResult<TicketMessage> {
        let mut tx = self.pool().begin().await?;
        let message = insert_message_in(&mut *tx, ticket_id, sender_id, text, is_admin).await?;
        tx.commit().await?;
        Ok(message)
    }
}

/// Oldest first
async fn messages_in(
    conn: &mut PgConnection,
    ticket_id: &EntityId,
) -> MarketplaceResult<Vec<TicketMessage>> {
    let sql = format!(
        "SELECT {MESSAGE_COLUMNS} FROM ticket_messages WHERE ticket_id = $1::uuid ORDER BY created_at ASC"
    );
    let rows = sqlx::query_as::<_, TicketMessageRow>(&sql)
        .bind(ticket_id.as_str())
        .fetch_all(&mut *conn)
        .await?;
    Ok(rows.into_iter().map(TicketMessage::from).collect())
}

/// Append a message and touch the ticket's `updated_at`
async fn insert_message_in(
    conn: &mut PgConnection,
    ticket_id: &EntityId,
    sender_id: &EntityId,
    text: &str,
    is_admin: bool,
) -> MarketplaceResult<TicketMessage> {
    let sql = format!(
        "INSERT INTO ticket_messages (ticket_id, sender_id, text, is_admin) \
         VALUES ($1::uuid, $2::uuid, $3, $4) RETURNING {MESSAGE_COLUMNS}"
    );
    let row = sqlx::query_as::<_, TicketMessageRow>(&sql)
        .bind(ticket_id.as_str())
        .bind(sender_id.as_str())
        .bind(text)
        .bind(is_admin)
        .fetch_one(&mut *conn)
        .await?;

    sqlx::query("UPDATE support_tickets SET updated_at = NOW() WHERE id = $1::uuid")
        .bind(ticket_id.as_str())
        .execute(&mut *conn)
        .await?;

    Ok(row.into())
}
