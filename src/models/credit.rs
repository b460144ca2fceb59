use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identity::EntityId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CreditTransactionType {
    Purchase,
    Bonus,
    Spend,
    Refund,
}

impl CreditTransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CreditTransactionType::Purchase => "PURCHASE",
            CreditTransactionType::Bonus => "BONUS",
            CreditTransactionType::Spend => "SPEND",
            CreditTransactionType::Refund => "REFUND",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "PURCHASE" => Some(CreditTransactionType::Purchase),
            "BONUS" => Some(CreditTransactionType::Bonus),
            "SPEND" => Some(CreditTransactionType::Spend),
            "REFUND" => Some(CreditTransactionType::Refund),
            _ => None,
        }
    }
}

/// One credit ledger entry, maps to `credits`
///
/// `balance_after` is the balance before this entry plus `amount`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditEntry {
    pub id: EntityId,
    pub user_id: EntityId,
    pub amount: i64,
    pub transaction_type: CreditTransactionType,
    pub description: String,
    pub related_id: Option<String>,
    pub balance_after: i64,
    pub created_at: DateTime<Utc>,
}

/// Credit mutation request, applied identically by both backends
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditChange {
    pub user_id: EntityId,
    /// Signed delta
    pub amount: i64,
    pub transaction_type: CreditTransactionType,
    pub description: String,
    pub related_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditPackage {
    pub id: String,
    pub name: String,
    pub credits: i64,
    /// Price in whole currency units
    pub price: i64,
    pub is_popular: bool,
}

impl CreditPackage {
    pub fn new(id: &str, name: &str, credits: i64, price: i64, is_popular: bool) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            credits,
            price,
            is_popular,
        }
    }
}

/// Payment row recorded alongside a database-mode purchase
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPayment {
    pub payer_id: EntityId,
    pub payee_id: String,
    pub amount: i64,
    pub payment_method: String,
    pub transaction_id: String,
    pub metadata: serde_json::Value,
}
