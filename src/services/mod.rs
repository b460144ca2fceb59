//! # Marketplace Services
//!
//! The data-access call sites of the marketplace. Every operation goes
//! through [`PersistenceRouter`](crate::router::PersistenceRouter), so each
//! one answers from the database when it can and from the fallback store
//! when it must, with identical business rules in both branches.

pub mod admin;
pub mod blocks;
pub mod jobs;
pub mod locations;
pub mod notifications;
pub mod payments;
pub mod tickets;

pub use admin::{AdminService, VerificationDecision, VerificationResult};
pub use blocks::BlockService;
pub use jobs::JobService;
pub use locations::LocationService;
pub use notifications::NotificationService;
pub use payments::{
    PaymentService, PurchaseReceipt, PurchaseRequest, PurchaseVerifier, UnconfiguredVerifier,
    VerificationOutcome,
};
pub use tickets::TicketService;

use crate::error::{MarketplaceError, MarketplaceResult};
use crate::identity::EntityId;
use crate::models::UserType;

/// The authenticated user on whose behalf an operation runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub id: EntityId,
    pub user_type: UserType,
}

impl Actor {
    pub fn new(id: impl Into<EntityId>, user_type: UserType) -> Self {
        Self {
            id: id.into(),
            user_type,
        }
    }

    pub fn admin(id: impl Into<EntityId>) -> Self {
        Self::new(id, UserType::Admin)
    }

    pub fn is_admin(&self) -> bool {
        self.user_type == UserType::Admin
    }

    pub fn require_admin(&self) -> MarketplaceResult<()> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(MarketplaceError::Forbidden(
                "administrator privileges required".to_string(),
            ))
        }
    }
}
