//! # Marketplace Models
//!
//! Records shared by both persistence backends. The database layer maps rows
//! into these types and the fallback store holds them directly, so call sites
//! never see which backend produced a value.
//!
//! - [`User`] / [`UserPatch`] - accounts and electrician profiles
//! - [`Job`] - job posts
//! - [`Location`] - saved service addresses
//! - [`CreditEntry`] / [`CreditChange`] - credit ledger
//! - [`Block`] - user blocks (persisted to disk in fallback mode)
//! - [`Notification`] - in-app notifications
//! - [`Ticket`] / [`TicketMessage`] - support tickets

pub mod block;
pub mod credit;
pub mod job;
pub mod location;
pub mod notification;
pub mod ticket;
pub mod user;

use serde::{Deserialize, Serialize};

pub use block::{Block, BlockStatus, BlockedUser};
pub use credit::{CreditChange, CreditEntry, CreditPackage, CreditTransactionType, NewPayment};
pub use job::{Job, JobPatch, JobStatus, NewJob};
pub use location::{Location, LocationInput};
pub use notification::{NewNotification, Notification};
pub use ticket::{NewTicket, Ticket, TicketMessage, TicketPatch, TicketReply, TicketStatus};
pub use user::{
    PendingVerification, User, UserCounts, UserFilter, UserPatch, UserSummary, UserType,
    VerificationReview, VerificationStatus,
};

/// 1-based page request; page and limit are never below 1
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "PageParams")]
pub struct PageRequest {
    page: usize,
    limit: usize,
}

/// Wire shape of [`PageRequest`] before clamping
#[derive(Deserialize)]
struct PageParams {
    page: usize,
    limit: usize,
}

impl From<PageParams> for PageRequest {
    fn from(params: PageParams) -> Self {
        Self::new(params.page, params.limit)
    }
}

impl PageRequest {
    pub fn new(page: usize, limit: usize) -> Self {
        Self {
            page: page.max(1),
            limit: limit.max(1),
        }
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn offset(&self) -> usize {
        self.page.saturating_sub(1).saturating_mul(self.limit)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(1, crate::constants::DEFAULT_PAGE_SIZE)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub limit: usize,
    pub total: usize,
    pub total_pages: usize,
    pub has_more: bool,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, request: PageRequest, total: usize) -> Self {
        let total_pages = total.div_ceil(request.limit);
        Self {
            items,
            page: request.page,
            limit: request.limit,
            total,
            total_pages,
            has_more: request.page < total_pages,
        }
    }

    /// Slice an already-sorted full collection
    pub fn from_all(all: Vec<T>, request: PageRequest) -> Self {
        let total = all.len();
        let items = all
            .into_iter()
            .skip(request.offset())
            .take(request.limit)
            .collect();
        Self::new(items, request, total)
    }
}

/// Admin dashboard counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_users: i64,
    pub total_electricians: i64,
    pub total_citizens: i64,
    pub active_jobs: i64,
    pub pending_verifications: i64,
    pub total_revenue: i64,
}
