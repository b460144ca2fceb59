//! # Credit Purchases
//!
//! Purchase flow:
//!
//! 1. resolve the credit package
//! 2. with a store purchase token: double-spend check against `payments`
//!    (database only), then third-party verification
//! 3. without a token: test purchase, allowed only when configured
//! 4. credit the balance through the router; the database branch records
//!    the payment row first, in the same transaction, so a token that raced
//!    past step 2 is rejected with `Conflict` by the unique index
//!
//! In fallback mode no cross-process double-spend protection exists. Such
//! purchases come back with `provisional = true` and are logged, so callers
//! can treat them as provisionally trusted.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use crate::availability::Connector;
use crate::config::PaymentsConfig;
use crate::constants::{credit_packages, find_credit_package, CREDIT_HISTORY_LIMIT, SYSTEM_PAYEE};
use crate::database::CreditQueries;
use crate::error::{MarketplaceError, MarketplaceResult};
use crate::identity::EntityId;
use crate::models::{CreditChange, CreditEntry, CreditPackage, CreditTransactionType, NewPayment};
use crate::router::{Backend, PersistenceRouter};

const STORE_PAYMENT_METHOD: &str = "GOOGLE_PLAY_IAP";
const TEST_PAYMENT_METHOD: &str = "CREDIT_CARD_MOCK";

/// Result of asking the app store about a purchase token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationOutcome {
    pub is_valid: bool,
    pub message: String,
}

impl VerificationOutcome {
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            message: "purchase verified".to_string(),
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            message: message.into(),
        }
    }
}

/// Third-party purchase verification
#[async_trait]
pub trait PurchaseVerifier: Send + Sync {
    async fn verify(
        &self,
        product_id: &str,
        purchase_token: &str,
        package_name: &str,
    ) -> MarketplaceResult<VerificationOutcome>;
}

/// Verifier used when no store credentials are configured; rejects everything
#[derive(Debug, Clone, Copy, Default)]
pub struct UnconfiguredVerifier;

#[async_trait]
impl PurchaseVerifier for UnconfiguredVerifier {
    async fn verify(
        &self,
        _product_id: &str,
        _purchase_token: &str,
        _package_name: &str,
    ) -> MarketplaceResult<VerificationOutcome> {
        Ok(VerificationOutcome::invalid(
            "purchase verification service is not configured",
        ))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseRequest {
    pub user_id: EntityId,
    pub package_id: String,
    pub purchase_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseReceipt {
    pub credits_added: i64,
    pub new_balance: i64,
    pub transaction_id: String,
    /// Accepted without the database double-spend check
    pub provisional: bool,
    /// Accepted although store verification failed
    pub verification_bypassed: bool,
    pub answered_by: String,
}

pub struct PaymentService<C: Connector> {
    router: PersistenceRouter<C>,
    verifier: Arc<dyn PurchaseVerifier>,
    config: PaymentsConfig,
}

impl<C> PaymentService<C>
where
    C: Connector,
    C::Connection: CreditQueries,
{
    pub fn new(
        router: PersistenceRouter<C>,
        verifier: Arc<dyn PurchaseVerifier>,
        config: PaymentsConfig,
    ) -> Self {
        Self {
            router,
            verifier,
            config,
        }
    }

    pub fn packages(&self) -> Vec<CreditPackage> {
        credit_packages()
    }

    pub async fn purchase(&self, request: &PurchaseRequest) -> MarketplaceResult<PurchaseReceipt> {
        let package = find_credit_package(&request.package_id).ok_or_else(|| {
            MarketplaceError::validation(format!("unknown credit package {}", request.package_id))
        })?;

        let token = request
            .purchase_token
            .as_deref()
            .filter(|token| !token.is_empty());

        let mut provisional = false;
        let mut verification_bypassed = false;

        match token {
            Some(token) => {
                provisional = !self.ensure_unused(token).await?;
                verification_bypassed = self.verify(&package, token).await?;
            }
            None if self.config.allow_test_purchases => {
                warn!(
                    user_id = %request.user_id,
                    package_id = %package.id,
                    "No purchase token supplied, processing as a test purchase"
                );
            }
            None => {
                return Err(MarketplaceError::validation("purchase token is required"));
            }
        }

        let transaction_id = token
            .map(str::to_string)
            .unwrap_or_else(|| EntityId::mint("tx").into());
        let change = CreditChange {
            user_id: request.user_id.clone(),
            amount: package.credits,
            transaction_type: CreditTransactionType::Purchase,
            description: if token.is_some() {
                format!("{} credits purchased", package.credits)
            } else {
                format!("{} credits purchased (test)", package.credits)
            },
            related_id: Some(transaction_id.clone()),
        };
        let payment = NewPayment {
            payer_id: request.user_id.clone(),
            payee_id: SYSTEM_PAYEE.to_string(),
            amount: package.price,
            payment_method: if token.is_some() {
                STORE_PAYMENT_METHOD
            } else {
                TEST_PAYMENT_METHOD
            }
            .to_string(),
            transaction_id: transaction_id.clone(),
            metadata: match token {
                Some(_) => serde_json::json!({ "packageId": package.id }),
                None => serde_json::json!({ "mock": true }),
            },
        };

        let (change, payment) = (&change, &payment);
        let (entry, backend) = self
            .router
            .execute_traced(
                "purchase_credits",
                &[&request.user_id],
                |db| async move { db.apply_purchase(payment, change).await },
                |store| async move { store.credits.add_credits(change) },
            )
            .await?;

        if backend == Backend::Fallback && token.is_some() {
            provisional = true;
        }
        if provisional {
            warn!(
                user_id = %request.user_id,
                transaction_id = %transaction_id,
                "Purchase accepted without double-spend protection"
            );
        }

        info!(
            user_id = %request.user_id,
            credits = package.credits,
            balance = entry.balance_after,
            backend = %backend,
            "Credits purchased"
        );

        Ok(PurchaseReceipt {
            credits_added: package.credits,
            new_balance: entry.balance_after,
            transaction_id,
            provisional,
            verification_bypassed,
            answered_by: backend.to_string(),
        })
    }

    /// Newest first, capped at [`CREDIT_HISTORY_LIMIT`]
    pub async fn history(&self, user_id: &EntityId) -> MarketplaceResult<Vec<CreditEntry>> {
        self.router
            .execute(
                "credit_history",
                &[user_id],
                |db| async move { db.credit_history(user_id, CREDIT_HISTORY_LIMIT).await },
                |store| async move { Ok(store.credits.history(user_id, CREDIT_HISTORY_LIMIT)) },
            )
            .await
    }

    /// Returns false when the database could not be consulted
    async fn ensure_unused(&self, token: &str) -> MarketplaceResult<bool> {
        let seen = self
            .router
            .when_available("payment_exists", |db| async move {
                db.payment_exists(token).await
            })
            .await?;

        match seen {
            Some(true) => Err(MarketplaceError::Conflict(
                "purchase has already been processed".to_string(),
            )),
            Some(false) => Ok(true),
            None => Ok(false),
        }
    }

    /// Returns true when a failed verification was bypassed
    async fn verify(&self, package: &CreditPackage, token: &str) -> MarketplaceResult<bool> {
        let outcome = self
            .verifier
            .verify(&package.id, token, &self.config.package_name)
            .await?;

        if outcome.is_valid {
            return Ok(false);
        }
        if self.config.bypass_failed_verification {
            warn!(
                package_id = %package.id,
                reason = %outcome.message,
                "Purchase verification failed; bypass_failed_verification is enabled, accepting"
            );
            return Ok(true);
        }
        Err(MarketplaceError::VerificationFailed(outcome.message))
    }
}
