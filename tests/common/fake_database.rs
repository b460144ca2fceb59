//! In-memory stand-in for the PostgreSQL query layer.
//!
//! Implements every query trait with the same semantics as the SQL in
//! `src/database/pg`, plus switches to inject connectivity and constraint
//! failures and a call counter to prove a path never touched the database.

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use uuid::Uuid;

use marketplace_core::database::{
    BlockQueries, CreditQueries, JobQueries, LocationQueries, NotificationQueries, TicketQueries,
    UserQueries,
};
use marketplace_core::error::{MarketplaceError, MarketplaceResult};
use marketplace_core::identity::EntityId;
use marketplace_core::models::{
    Block, BlockedUser, CreditChange, CreditEntry, CreditTransactionType, Job, JobStatus,
    Location, LocationInput, NewJob, NewNotification, NewPayment, NewTicket, Notification,
    PageRequest, PendingVerification, Ticket, TicketMessage, TicketReply, TicketStatus, User,
    UserCounts, UserFilter, UserType, VerificationReview, VerificationStatus,
};

#[derive(Debug, Default)]
pub struct FakeTables {
    pub users: Vec<User>,
    pub blocks: Vec<Block>,
    pub notifications: Vec<Notification>,
    pub balances: Vec<(EntityId, i64)>,
    pub credits: Vec<CreditEntry>,
    pub payments: Vec<NewPayment>,
    pub jobs: Vec<Job>,
    pub tickets: Vec<Ticket>,
    pub locations: Vec<Location>,
}

impl FakeTables {
    /// Same effect as `apply_change_in`: the whole change or nothing
    fn apply_change(&mut self, change: &CreditChange) -> MarketplaceResult<CreditEntry> {
        let (_, balance) = self
            .balances
            .iter_mut()
            .find(|(id, _)| id == &change.user_id)
            .ok_or_else(|| {
                MarketplaceError::not_found(format!(
                    "electrician profile for user {}",
                    change.user_id
                ))
            })?;
        let balance_after = balance
            .checked_add(change.amount)
            .ok_or_else(|| MarketplaceError::validation("credit balance out of range"))?;
        *balance = balance_after;

        let entry = CreditEntry {
            id: database_id(),
            user_id: change.user_id.clone(),
            amount: change.amount,
            transaction_type: change.transaction_type,
            description: change.description.clone(),
            related_id: change.related_id.clone(),
            balance_after,
            created_at: Utc::now(),
        };
        self.credits.push(entry.clone());
        Ok(entry)
    }

    fn push_message(
        &mut self,
        ticket_id: &EntityId,
        sender_id: &EntityId,
        text: &str,
        is_admin: bool,
    ) -> MarketplaceResult<TicketMessage> {
        let ticket = self
            .tickets
            .iter_mut()
            .find(|ticket| &ticket.id == ticket_id)
            .ok_or_else(|| MarketplaceError::ConstraintViolation {
                code: "23503".to_string(),
                message: "ticket_messages_ticket_id_fkey".to_string(),
            })?;
        let message = TicketMessage {
            id: database_id(),
            ticket_id: ticket_id.clone(),
            sender_id: sender_id.clone(),
            text: text.to_string(),
            is_admin,
            created_at: Utc::now(),
        };
        ticket.messages.push(message.clone());
        ticket.updated_at = message.created_at;
        Ok(message)
    }

    fn clear_default_location(&mut self, user_id: &EntityId) {
        self.locations
            .iter_mut()
            .filter(|l| &l.user_id == user_id)
            .for_each(|l| l.is_default = false);
    }
}

#[derive(Debug, Default)]
struct FakeState {
    tables: Mutex<FakeTables>,
    connectivity_down: AtomicBool,
    reject_writes: AtomicBool,
    calls: AtomicUsize,
    /// 1-based call number that fails with a connectivity error; 0 is off
    fail_at_call: AtomicUsize,
}

/// Cheap to clone; every clone shares the same tables and switches
#[derive(Debug, Clone, Default)]
pub struct FakeDatabase {
    state: Arc<FakeState>,
}

pub fn database_id() -> EntityId {
    EntityId::parse(Uuid::new_v4().to_string())
}

impl FakeDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call fails with a connectivity error while set
    pub fn set_connectivity_down(&self, down: bool) {
        self.state.connectivity_down.store(down, Ordering::SeqCst);
    }

    /// Every write fails with a unique violation while set
    pub fn set_reject_writes(&self, reject: bool) {
        self.state.reject_writes.store(reject, Ordering::SeqCst);
    }

    /// The `n`th query call from now fails with a connectivity error, as if
    /// the connection dropped mid-request; later calls succeed again
    pub fn drop_connection_on_call(&self, n: usize) {
        self.state
            .fail_at_call
            .store(self.calls() + n, Ordering::SeqCst);
    }

    /// Number of query calls made, including failed ones
    pub fn calls(&self) -> usize {
        self.state.calls.load(Ordering::SeqCst)
    }

    pub fn with_tables<T>(&self, f: impl FnOnce(&mut FakeTables) -> T) -> T {
        f(&mut self.state.tables.lock())
    }

    pub fn seed_user(&self, full_name: &str, user_type: UserType) -> User {
        let user = User {
            full_name: full_name.to_string(),
            email: format!("{}@example.com", full_name.to_lowercase().replace(' ', ".")),
            phone: "5550000000".to_string(),
            user_type,
            verification_status: (user_type == UserType::Electrician)
                .then_some(VerificationStatus::Pending),
            ..User::empty(database_id())
        };
        self.with_tables(|t| {
            if user_type == UserType::Electrician {
                t.balances.push((user.id.clone(), 0));
            }
            t.users.push(user.clone());
        });
        user
    }

    pub fn seed_job(&self, citizen_id: &EntityId, title: &str) -> Job {
        let job = Job {
            citizen_id: citizen_id.clone(),
            title: title.to_string(),
            description: format!("{title} description"),
            ..Job::empty(database_id())
        };
        self.with_tables(|t| t.jobs.push(job.clone()));
        job
    }

    pub fn seed_notification(&self, user_id: &EntityId, title: &str) -> Notification {
        let now = Utc::now();
        let notification = Notification {
            id: database_id(),
            user_id: user_id.clone(),
            notification_type: "SYSTEM".to_string(),
            title: title.to_string(),
            message: title.to_string(),
            related_type: None,
            related_id: None,
            action_url: None,
            is_read: false,
            created_at: now,
            updated_at: now,
        };
        self.with_tables(|t| t.notifications.push(notification.clone()));
        notification
    }

    pub fn balance(&self, user_id: &EntityId) -> Option<i64> {
        self.with_tables(|t| {
            t.balances
                .iter()
                .find(|(id, _)| id == user_id)
                .map(|(_, balance)| *balance)
        })
    }

    fn read(&self) -> MarketplaceResult<()> {
        let call = self.state.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.state.connectivity_down.load(Ordering::SeqCst)
            || self.state.fail_at_call.load(Ordering::SeqCst) == call
        {
            return Err(MarketplaceError::Connectivity(
                "connection refused (injected)".to_string(),
            ));
        }
        Ok(())
    }

    fn write(&self) -> MarketplaceResult<()> {
        self.read()?;
        if self.state.reject_writes.load(Ordering::SeqCst) {
            return Err(MarketplaceError::ConstraintViolation {
                code: "23505".to_string(),
                message: "duplicate key value violates unique constraint (injected)".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl BlockQueries for FakeDatabase {
    async fn find_block(
        &self,
        blocker_id: &EntityId,
        blocked_id: &EntityId,
    ) -> MarketplaceResult<Option<Block>> {
        self.read()?;
        Ok(self.with_tables(|t| {
            t.blocks
                .iter()
                .find(|b| &b.blocker_id == blocker_id && &b.blocked_id == blocked_id)
                .cloned()
        }))
    }

    async fn insert_block(
        &self,
        blocker_id: &EntityId,
        blocked_id: &EntityId,
        reason: Option<&str>,
    ) -> MarketplaceResult<Block> {
        self.write()?;
        self.with_tables(|t| {
            if t.blocks
                .iter()
                .any(|b| &b.blocker_id == blocker_id && &b.blocked_id == blocked_id)
            {
                return Err(MarketplaceError::Conflict("user is already blocked".to_string()));
            }
            let block = Block {
                id: database_id(),
                blocker_id: blocker_id.clone(),
                blocked_id: blocked_id.clone(),
                reason: reason.map(str::to_string),
                created_at: Utc::now(),
            };
            t.blocks.push(block.clone());
            Ok(block)
        })
    }

    async fn delete_block(
        &self,
        blocker_id: &EntityId,
        blocked_id: &EntityId,
    ) -> MarketplaceResult<u64> {
        self.write()?;
        Ok(self.with_tables(|t| {
            let before = t.blocks.len();
            t.blocks
                .retain(|b| !(&b.blocker_id == blocker_id && &b.blocked_id == blocked_id));
            (before - t.blocks.len()) as u64
        }))
    }

    async fn blocked_users(&self, blocker_id: &EntityId) -> MarketplaceResult<Vec<BlockedUser>> {
        self.read()?;
        Ok(self.with_tables(|t| {
            let mut blocks: Vec<&Block> =
                t.blocks.iter().filter(|b| &b.blocker_id == blocker_id).collect();
            blocks.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            blocks
                .into_iter()
                .map(|block| BlockedUser {
                    id: block.id.clone(),
                    blocked_user: t
                        .users
                        .iter()
                        .find(|u| u.id == block.blocked_id)
                        .cloned()
                        .unwrap_or_else(|| User::empty(block.blocked_id.clone()))
                        .summary(),
                    reason: block.reason.clone(),
                    created_at: block.created_at,
                })
                .collect()
        }))
    }

    async fn any_block_between(&self, a: &EntityId, b: &EntityId) -> MarketplaceResult<bool> {
        self.read()?;
        Ok(self.with_tables(|t| t.blocks.iter().any(|block| block.is_between(a, b))))
    }
}

#[async_trait]
impl NotificationQueries for FakeDatabase {
    async fn insert_notification(&self, new: &NewNotification) -> MarketplaceResult<Notification> {
        self.write()?;
        let now = Utc::now();
        let notification = Notification {
            id: database_id(),
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
        self.with_tables(|t| t.notifications.push(notification.clone()));
        Ok(notification)
    }

    async fn notifications_for(
        &self,
        user_id: &EntityId,
        limit: usize,
    ) -> MarketplaceResult<Vec<Notification>> {
        self.read()?;
        Ok(self.with_tables(|t| {
            let mut found: Vec<Notification> = t
                .notifications
                .iter()
                .filter(|n| &n.user_id == user_id)
                .cloned()
                .collect();
            found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            found.truncate(limit);
            found
        }))
    }

    async fn unread_count(&self, user_id: &EntityId) -> MarketplaceResult<i64> {
        self.read()?;
        Ok(self.with_tables(|t| {
            t.notifications
                .iter()
                .filter(|n| &n.user_id == user_id && !n.is_read)
                .count() as i64
        }))
    }

    async fn mark_read(
        &self,
        user_id: &EntityId,
        notification_id: &EntityId,
    ) -> MarketplaceResult<u64> {
        self.write()?;
        Ok(self.with_tables(|t| {
            let mut updated = 0;
            for n in t
                .notifications
                .iter_mut()
                .filter(|n| &n.user_id == user_id && &n.id == notification_id)
            {
                n.is_read = true;
                updated += 1;
            }
            updated
        }))
    }

    async fn mark_all_read(&self, user_id: &EntityId) -> MarketplaceResult<u64> {
        self.write()?;
        Ok(self.with_tables(|t| {
            let mut updated = 0;
            for n in t
                .notifications
                .iter_mut()
                .filter(|n| &n.user_id == user_id && !n.is_read)
            {
                n.is_read = true;
                updated += 1;
            }
            updated
        }))
    }

    async fn mark_related_read(
        &self,
        user_id: &EntityId,
        notification_type: &str,
        related_id: &str,
    ) -> MarketplaceResult<u64> {
        self.write()?;
        Ok(self.with_tables(|t| {
            let mut updated = 0;
            for n in t.notifications.iter_mut().filter(|n| {
                &n.user_id == user_id
                    && !n.is_read
                    && n.notification_type == notification_type
                    && n.related_id.as_deref() == Some(related_id)
            }) {
                n.is_read = true;
                updated += 1;
            }
            updated
        }))
    }

    async fn delete_notification(
        &self,
        user_id: &EntityId,
        notification_id: &EntityId,
    ) -> MarketplaceResult<u64> {
        self.write()?;
        Ok(self.with_tables(|t| {
            let before = t.notifications.len();
            t.notifications
                .retain(|n| !(&n.user_id == user_id && &n.id == notification_id));
            (before - t.notifications.len()) as u64
        }))
    }
}

#[async_trait]
impl CreditQueries for FakeDatabase {
    async fn payment_exists(&self, transaction_id: &str) -> MarketplaceResult<bool> {
        self.read()?;
        Ok(self.with_tables(|t| t.payments.iter().any(|p| p.transaction_id == transaction_id)))
    }

    async fn apply_purchase(
        &self,
        payment: &NewPayment,
        change: &CreditChange,
    ) -> MarketplaceResult<CreditEntry> {
        self.write()?;
        self.with_tables(|t| {
            if t.payments
                .iter()
                .any(|p| p.transaction_id == payment.transaction_id)
            {
                return Err(MarketplaceError::Conflict(
                    "purchase has already been processed".to_string(),
                ));
            }
            let entry = t.apply_change(change)?;
            t.payments.push(payment.clone());
            Ok(entry)
        })
    }

    async fn credit_history(
        &self,
        user_id: &EntityId,
        limit: usize,
    ) -> MarketplaceResult<Vec<CreditEntry>> {
        self.read()?;
        Ok(self.with_tables(|t| {
            t.credits
                .iter()
                .rev()
                .filter(|c| &c.user_id == user_id)
                .take(limit)
                .cloned()
                .collect()
        }))
    }

    async fn total_purchased(&self) -> MarketplaceResult<i64> {
        self.read()?;
        Ok(self.with_tables(|t| {
            t.credits
                .iter()
                .filter(|c| c.transaction_type == CreditTransactionType::Purchase)
                .map(|c| c.amount)
                .sum()
        }))
    }
}

#[async_trait]
impl JobQueries for FakeDatabase {
    async fn insert_job(&self, new: &NewJob) -> MarketplaceResult<Job> {
        self.write()?;
        let job = Job {
            citizen_id: new.citizen_id.clone(),
            title: new.title.clone(),
            description: new.description.clone(),
            city: new.city.clone(),
            ..Job::empty(database_id())
        };
        self.with_tables(|t| t.jobs.push(job.clone()));
        Ok(job)
    }

    async fn find_job(&self, job_id: &EntityId) -> MarketplaceResult<Option<Job>> {
        self.read()?;
        Ok(self.with_tables(|t| t.jobs.iter().find(|j| &j.id == job_id).cloned()))
    }

    async fn list_jobs(&self, page: PageRequest) -> MarketplaceResult<Vec<Job>> {
        self.read()?;
        Ok(self.with_tables(|t| {
            let mut jobs = t.jobs.clone();
            jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            jobs.into_iter()
                .skip(page.offset())
                .take(page.limit())
                .collect()
        }))
    }

    async fn count_jobs(&self) -> MarketplaceResult<i64> {
        self.read()?;
        Ok(self.with_tables(|t| t.jobs.len() as i64))
    }

    async fn count_open_jobs(&self) -> MarketplaceResult<i64> {
        self.read()?;
        Ok(self.with_tables(|t| t.jobs.iter().filter(|j| j.status == JobStatus::Open).count() as i64))
    }

    async fn delete_job(&self, job_id: &EntityId) -> MarketplaceResult<u64> {
        self.write()?;
        Ok(self.with_tables(|t| {
            let before = t.jobs.len();
            t.jobs.retain(|j| &j.id != job_id);
            (before - t.jobs.len()) as u64
        }))
    }
}

#[async_trait]
impl TicketQueries for FakeDatabase {
    async fn insert_ticket(&self, user_id: &EntityId, new: &NewTicket) -> MarketplaceResult<Ticket> {
        self.write()?;
        let ticket = Ticket {
            user_id: user_id.clone(),
            subject: new.subject.clone(),
            description: new.description.clone(),
            ticket_type: new.ticket_type.clone(),
            priority: new.priority_or_default(),
            ..Ticket::empty(database_id())
        };
        self.with_tables(|t| t.tickets.push(ticket.clone()));
        Ok(ticket)
    }

    async fn tickets_for_user(&self, user_id: &EntityId) -> MarketplaceResult<Vec<Ticket>> {
        self.read()?;
        Ok(self.with_tables(|t| {
            t.tickets
                .iter()
                .rev()
                .filter(|ticket| &ticket.user_id == user_id)
                .map(|ticket| Ticket {
                    messages: Vec::new(),
                    ..ticket.clone()
                })
                .collect()
        }))
    }

    async fn find_ticket(&self, ticket_id: &EntityId) -> MarketplaceResult<Option<Ticket>> {
        self.read()?;
        Ok(self.with_tables(|t| t.tickets.iter().find(|ticket| &ticket.id == ticket_id).cloned()))
    }

    async fn all_tickets(&self) -> MarketplaceResult<Vec<Ticket>> {
        self.read()?;
        Ok(self.with_tables(|t| {
            t.tickets
                .iter()
                .rev()
                .map(|ticket| Ticket {
                    messages: Vec::new(),
                    ..ticket.clone()
                })
                .collect()
        }))
    }

    async fn update_ticket_status(
        &self,
        ticket_id: &EntityId,
        status: TicketStatus,
        reply: Option<TicketReply<'_>>,
    ) -> MarketplaceResult<Option<Ticket>> {
        self.write()?;
        self.with_tables(|t| {
            let Some(index) = t.tickets.iter().position(|ticket| &ticket.id == ticket_id) else {
                return Ok(None);
            };
            if let Some(reply) = reply {
                t.push_message(ticket_id, reply.sender_id, reply.text, true)?;
            }
            let ticket = &mut t.tickets[index];
            ticket.status = status;
            ticket.updated_at = Utc::now();
            Ok(Some(ticket.clone()))
        })
    }

    async fn insert_ticket_message(
        &self,
        ticket_id: &EntityId,
        sender_id: &EntityId,
        text: &str,
        is_admin: bool,
    ) -> MarketplaceResult<TicketMessage> {
        self.write()?;
        self.with_tables(|t| t.push_message(ticket_id, sender_id, text, is_admin))
    }
}

#[async_trait]
impl LocationQueries for FakeDatabase {
    async fn locations_for(&self, user_id: &EntityId) -> MarketplaceResult<Vec<Location>> {
        self.read()?;
        Ok(self.with_tables(|t| {
            t.locations
                .iter()
                .rev()
                .filter(|l| &l.user_id == user_id && l.is_active)
                .cloned()
                .collect()
        }))
    }

    async fn insert_location(
        &self,
        user_id: &EntityId,
        input: &LocationInput,
    ) -> MarketplaceResult<Location> {
        self.write()?;
        let (latitude, longitude) = input.coordinates();
        let location = Location {
            id: database_id(),
            user_id: user_id.clone(),
            city: input.city.clone(),
            district: input.district.clone(),
            neighborhood: input.neighborhood_or_empty(),
            address: input.details.clone(),
            is_default: input.is_default,
            is_active: true,
            latitude,
            longitude,
            created_at: Utc::now(),
        };
        self.with_tables(|t| {
            if location.is_default {
                t.clear_default_location(user_id);
            }
            t.locations.push(location.clone());
        });
        Ok(location)
    }

    async fn update_location(
        &self,
        user_id: &EntityId,
        location_id: &EntityId,
        input: &LocationInput,
    ) -> MarketplaceResult<Option<Location>> {
        self.write()?;
        Ok(self.with_tables(|t| {
            let index = t
                .locations
                .iter()
                .position(|l| &l.id == location_id && &l.user_id == user_id && l.is_active)?;
            if input.is_default {
                t.clear_default_location(user_id);
            }
            input.apply_to(&mut t.locations[index]);
            Some(t.locations[index].clone())
        }))
    }

    async fn deactivate_location(
        &self,
        user_id: &EntityId,
        location_id: &EntityId,
    ) -> MarketplaceResult<u64> {
        self.write()?;
        Ok(self.with_tables(|t| {
            let mut updated = 0;
            for l in t
                .locations
                .iter_mut()
                .filter(|l| &l.id == location_id && &l.user_id == user_id && l.is_active)
            {
                l.is_active = false;
                l.is_default = false;
                updated += 1;
            }
            updated
        }))
    }
}

#[async_trait]
impl UserQueries for FakeDatabase {
    async fn find_user(&self, user_id: &EntityId) -> MarketplaceResult<Option<User>> {
        self.read()?;
        Ok(self.with_tables(|t| t.users.iter().find(|u| &u.id == user_id).cloned()))
    }

    async fn pending_verifications(&self) -> MarketplaceResult<Vec<PendingVerification>> {
        self.read()?;
        Ok(self.with_tables(|t| {
            t.users
                .iter()
                .filter(|u| {
                    u.user_type == UserType::Electrician
                        && u.verification_status == Some(VerificationStatus::Pending)
                })
                .map(|u| PendingVerification {
                    user_id: u.id.clone(),
                    full_name: u.full_name.clone(),
                    email: u.email.clone(),
                    phone: u.phone.clone(),
                    service_category: u.service_category.clone(),
                    verification_documents: None,
                })
                .collect()
        }))
    }

    async fn apply_verification_decision(
        &self,
        review: &VerificationReview<'_>,
        bonus: Option<&CreditChange>,
    ) -> MarketplaceResult<Option<CreditEntry>> {
        self.write()?;
        self.with_tables(|t| {
            let index = t
                .users
                .iter()
                .position(|u| &u.id == review.user_id && u.user_type == UserType::Electrician)
                .ok_or_else(|| {
                    MarketplaceError::not_found(format!(
                        "electrician profile for user {}",
                        review.user_id
                    ))
                })?;
            let entry = bonus.map(|change| t.apply_change(change)).transpose()?;
            let user = &mut t.users[index];
            user.verification_status = Some(review.status);
            user.is_verified = review.is_approval();
            Ok(entry)
        })
    }

    async fn user_counts(&self) -> MarketplaceResult<UserCounts> {
        self.read()?;
        Ok(self.with_tables(|t| {
            let count = |pred: &dyn Fn(&User) -> bool| t.users.iter().filter(|u| pred(u)).count() as i64;
            UserCounts {
                total: t.users.len() as i64,
                electricians: count(&|u| u.user_type == UserType::Electrician),
                citizens: count(&|u| u.user_type == UserType::Citizen),
                pending_verifications: count(&|u| {
                    u.user_type == UserType::Electrician
                        && u.verification_status == Some(VerificationStatus::Pending)
                }),
            }
        }))
    }

    async fn list_users(
        &self,
        filter: &UserFilter,
        page: PageRequest,
    ) -> MarketplaceResult<(Vec<User>, i64)> {
        self.read()?;
        Ok(self.with_tables(|t| {
            let mut users: Vec<User> = t.users.iter().filter(|u| filter.matches(u)).cloned().collect();
            users.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            let total = users.len() as i64;
            let users = users
                .into_iter()
                .skip(page.offset())
                .take(page.limit())
                .collect();
            (users, total)
        }))
    }
}
