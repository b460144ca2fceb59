//! # Database Query Seams
//!
//! One trait per area of the marketplace. The PostgreSQL implementation lives
//! in [`super::pg`]; services are generic over these traits so the failover
//! discipline can be exercised against an in-memory database in tests.
//!
//! Every method returns [`MarketplaceResult`], with `sqlx` failures already
//! classified into connectivity, constraint and plain database errors.

use async_trait::async_trait;

use crate::error::MarketplaceResult;
use crate::identity::EntityId;
use crate::models::{
    Block, BlockedUser, CreditChange, CreditEntry, Job, Location, LocationInput, NewJob,
    NewNotification, NewPayment, NewTicket, Notification, PageRequest, PendingVerification,
    Ticket, TicketMessage, TicketReply, TicketStatus, User, UserCounts, UserFilter,
    VerificationReview,
};

#[async_trait]
pub trait BlockQueries: Send + Sync {
    async fn find_block(
        &self,
        blocker_id: &EntityId,
        blocked_id: &EntityId,
    ) -> MarketplaceResult<Option<Block>>;

    async fn insert_block(
        &self,
        blocker_id: &EntityId,
        blocked_id: &EntityId,
        reason: Option<&str>,
    ) -> MarketplaceResult<Block>;

    /// Returns the number of rows removed
    async fn delete_block(&self, blocker_id: &EntityId, blocked_id: &EntityId)
        -> MarketplaceResult<u64>;

    /// Newest first
    async fn blocked_users(&self, blocker_id: &EntityId) -> MarketplaceResult<Vec<BlockedUser>>;

    /// True if either user has blocked the other
    async fn any_block_between(&self, a: &EntityId, b: &EntityId) -> MarketplaceResult<bool>;
}

#[async_trait]
pub trait NotificationQueries: Send + Sync {
    async fn insert_notification(&self, new: &NewNotification) -> MarketplaceResult<Notification>;

    /// Newest first
    async fn notifications_for(
        &self,
        user_id: &EntityId,
        limit: usize,
    ) -> MarketplaceResult<Vec<Notification>>;

    async fn unread_count(&self, user_id: &EntityId) -> MarketplaceResult<i64>;

    async fn mark_read(&self, user_id: &EntityId, notification_id: &EntityId)
        -> MarketplaceResult<u64>;

    async fn mark_all_read(&self, user_id: &EntityId) -> MarketplaceResult<u64>;

    async fn mark_related_read(
        &self,
        user_id: &EntityId,
        notification_type: &str,
        related_id: &str,
    ) -> MarketplaceResult<u64>;

    async fn delete_notification(
        &self,
        user_id: &EntityId,
        notification_id: &EntityId,
    ) -> MarketplaceResult<u64>;
}

#[async_trait]
pub trait CreditQueries: Send + Sync {
    async fn payment_exists(&self, transaction_id: &str) -> MarketplaceResult<bool>;

    /// Record the payment row, then credit the balance, in one transaction
    ///
    /// The payment insert runs first so a reused transaction id fails with
    /// `Conflict` before any credit is applied. Fails with `NotFound` when
    /// the user has no electrician profile.
    async fn apply_purchase(
        &self,
        payment: &NewPayment,
        change: &CreditChange,
    ) -> MarketplaceResult<CreditEntry>;

    /// Newest first
    async fn credit_history(
        &self,
        user_id: &EntityId,
        limit: usize,
    ) -> MarketplaceResult<Vec<CreditEntry>>;

    /// Sum of all purchase amounts
    async fn total_purchased(&self) -> MarketplaceResult<i64>;
}

#[async_trait]
pub trait JobQueries: Send + Sync {
    async fn insert_job(&self, new: &NewJob) -> MarketplaceResult<Job>;

    async fn find_job(&self, job_id: &EntityId) -> MarketplaceResult<Option<Job>>;

    /// Newest first
    async fn list_jobs(&self, page: PageRequest) -> MarketplaceResult<Vec<Job>>;

    async fn count_jobs(&self) -> MarketplaceResult<i64>;

    async fn count_open_jobs(&self) -> MarketplaceResult<i64>;

    async fn delete_job(&self, job_id: &EntityId) -> MarketplaceResult<u64>;
}

#[async_trait]
pub trait LocationQueries: Send + Sync {
    /// Active locations only, newest first
    async fn locations_for(&self, user_id: &EntityId) -> MarketplaceResult<Vec<Location>>;

    /// A new default clears the user's previous default in the same transaction
    async fn insert_location(
        &self,
        user_id: &EntityId,
        input: &LocationInput,
    ) -> MarketplaceResult<Location>;

    /// `None` when the user has no such active location
    async fn update_location(
        &self,
        user_id: &EntityId,
        location_id: &EntityId,
        input: &LocationInput,
    ) -> MarketplaceResult<Option<Location>>;

    /// Soft delete; returns the number of rows deactivated
    async fn deactivate_location(
        &self,
        user_id: &EntityId,
        location_id: &EntityId,
    ) -> MarketplaceResult<u64>;
}

#[async_trait]
pub trait TicketQueries: Send + Sync {
    async fn insert_ticket(&self, user_id: &EntityId, new: &NewTicket) -> MarketplaceResult<Ticket>;

    /// Newest first, without messages
    async fn tickets_for_user(&self, user_id: &EntityId) -> MarketplaceResult<Vec<Ticket>>;

    /// With messages, oldest message first
    async fn find_ticket(&self, ticket_id: &EntityId) -> MarketplaceResult<Option<Ticket>>;

    /// Newest first, without messages
    async fn all_tickets(&self) -> MarketplaceResult<Vec<Ticket>>;

    /// Status change and optional admin reply in one transaction; the
    /// returned ticket carries its messages
    async fn update_ticket_status(
        &self,
        ticket_id: &EntityId,
        status: TicketStatus,
        reply: Option<TicketReply<'_>>,
    ) -> MarketplaceResult<Option<Ticket>>;

    async fn insert_ticket_message(
        &self,
        ticket_id: &EntityId,
        sender_id: &EntityId,
        text: &str,
        is_admin: bool,
    ) -> MarketplaceResult<TicketMessage>;
}

#[async_trait]
pub trait UserQueries: Send + Sync {
    async fn find_user(&self, user_id: &EntityId) -> MarketplaceResult<Option<User>>;

    async fn pending_verifications(&self) -> MarketplaceResult<Vec<PendingVerification>>;

    /// Apply a review decision and, when given, the bonus credit change in
    /// one transaction
    ///
    /// Fails with `NotFound` when the user has no electrician profile.
    async fn apply_verification_decision(
        &self,
        review: &VerificationReview<'_>,
        bonus: Option<&CreditChange>,
    ) -> MarketplaceResult<Option<CreditEntry>>;

    async fn user_counts(&self) -> MarketplaceResult<UserCounts>;

    /// Newest first; returns the page and the total matching count
    async fn list_users(
        &self,
        filter: &UserFilter,
        page: PageRequest,
    ) -> MarketplaceResult<(Vec<User>, i64)>;
}
