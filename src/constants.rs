//! # System Constants
//!
//! Reserved identifiers, limits and the credit package catalog shared by both
//! persistence backends.

use crate::models::CreditPackage;

/// Prefix reserved for identifiers minted by the fallback store
pub const FALLBACK_ID_PREFIX: &str = "mock-";

/// Credits awarded when an electrician's documents are verified
pub const VERIFICATION_BONUS_CREDITS: i64 = 5;

/// Maximum notifications returned by a listing
pub const NOTIFICATION_LIST_LIMIT: usize = 50;

/// Maximum credit ledger entries returned by a history request
pub const CREDIT_HISTORY_LIMIT: usize = 50;

/// Default admin listing page size
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// Payee recorded on credit purchase payments
pub const SYSTEM_PAYEE: &str = "SYSTEM";

/// Credit packages offered for in-app purchase
pub fn credit_packages() -> Vec<CreditPackage> {
    vec![
        CreditPackage::new("pkg-10", "Quick Start", 10, 189, false),
        CreditPackage::new("pkg-35", "Growth", 35, 489, false),
        CreditPackage::new("pkg-75", "Eco Advantage", 75, 889, true),
        CreditPackage::new("pkg-175", "Master", 175, 1489, false),
    ]
}

/// Look up a package by id
pub fn find_credit_package(package_id: &str) -> Option<CreditPackage> {
    credit_packages().into_iter().find(|p| p.id == package_id)
}
