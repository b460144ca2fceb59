//! Fallback credit ledger.
//!
//! `add_credits` is the only way to move a balance: it reads the current
//! balance, applies the delta, appends the ledger entry and returns it while
//! holding the per-user shard lock, so concurrent additions for the same user
//! are serialized and every entry's `balance_after` reflects append order.

use chrono::Utc;
use dashmap::DashMap;

use crate::error::{MarketplaceError, MarketplaceResult};
use crate::identity::EntityId;
use crate::models::{CreditChange, CreditEntry, CreditTransactionType};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CreditAccount {
    pub balance: i64,
    /// Oldest first
    pub entries: Vec<CreditEntry>,
}

#[derive(Debug, Default)]
pub struct CreditLedger {
    accounts: DashMap<EntityId, CreditAccount>,
}

impl CreditLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a balance change and record it, atomically per user
    ///
    /// A change that would overflow the balance is rejected and leaves the
    /// account untouched.
    pub fn add_credits(&self, change: &CreditChange) -> MarketplaceResult<CreditEntry> {
        let mut account = self.accounts.entry(change.user_id.clone()).or_default();
        account.balance = account.balance.checked_add(change.amount).ok_or_else(|| {
            MarketplaceError::validation(format!(
                "credit change of {} overflows the balance of user {}",
                change.amount, change.user_id
            ))
        })?;

        let entry = CreditEntry {
            id: EntityId::mint("credit"),
            user_id: change.user_id.clone(),
            amount: change.amount,
            transaction_type: change.transaction_type,
            description: change.description.clone(),
            related_id: change.related_id.clone(),
            balance_after: account.balance,
            created_at: Utc::now(),
        };
        account.entries.push(entry.clone());
        Ok(entry)
    }

    /// Zero for unknown users
    pub fn balance(&self, user_id: &EntityId) -> i64 {
        self.accounts
            .get(user_id)
            .map(|account| account.balance)
            .unwrap_or(0)
    }

    pub fn account(&self, user_id: &EntityId) -> CreditAccount {
        self.accounts
            .get(user_id)
            .map(|account| account.value().clone())
            .unwrap_or_default()
    }

    /// Newest first, at most `limit` entries
    pub fn history(&self, user_id: &EntityId, limit: usize) -> Vec<CreditEntry> {
        self.accounts
            .get(user_id)
            .map(|account| account.entries.iter().rev().take(limit).cloned().collect())
            .unwrap_or_default()
    }

    pub fn all_transactions(&self) -> Vec<CreditEntry> {
        let mut entries: Vec<CreditEntry> = self
            .accounts
            .iter()
            .flat_map(|account| account.entries.clone())
            .collect();
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        entries
    }

    /// Revenue aggregate: sum of every purchase amount
    pub fn total_purchased(&self) -> i64 {
        self.accounts
            .iter()
            .flat_map(|account| {
                account
                    .entries
                    .iter()
                    .filter(|entry| entry.transaction_type == CreditTransactionType::Purchase)
                    .map(|entry| entry.amount)
                    .collect::<Vec<_>>()
            })
            .sum()
    }
}
