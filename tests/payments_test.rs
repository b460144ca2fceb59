//! Credit purchases through the router.

mod common;

use async_trait::async_trait;
use std::sync::Arc;

use common::Harness;
use marketplace_core::config::PaymentsConfig;
use marketplace_core::error::{MarketplaceError, MarketplaceResult};
use marketplace_core::identity::EntityId;
use marketplace_core::models::{CreditTransactionType, UserType};
use marketplace_core::services::{
    PaymentService, PurchaseRequest, PurchaseVerifier, UnconfiguredVerifier, VerificationOutcome,
};

struct AcceptingVerifier;

#[async_trait]
impl PurchaseVerifier for AcceptingVerifier {
    async fn verify(
        &self,
        _product_id: &str,
        _purchase_token: &str,
        _package_name: &str,
    ) -> MarketplaceResult<VerificationOutcome> {
        Ok(VerificationOutcome::valid())
    }
}

/// Hands control back to the scheduler before answering, so two purchases
/// with the same token both pass the double-spend check
struct YieldingVerifier;

#[async_trait]
impl PurchaseVerifier for YieldingVerifier {
    async fn verify(
        &self,
        _product_id: &str,
        _purchase_token: &str,
        _package_name: &str,
    ) -> MarketplaceResult<VerificationOutcome> {
        tokio::task::yield_now().await;
        Ok(VerificationOutcome::valid())
    }
}

fn service(
    harness: &Harness,
    verifier: Arc<dyn PurchaseVerifier>,
    config: PaymentsConfig,
) -> PaymentService<common::ScriptedConnector> {
    PaymentService::new(harness.router.clone(), verifier, config)
}

fn request(user_id: &EntityId, package_id: &str, token: Option<&str>) -> PurchaseRequest {
    PurchaseRequest {
        user_id: user_id.clone(),
        package_id: package_id.to_string(),
        purchase_token: token.map(str::to_string),
    }
}

#[tokio::test]
async fn test_store_purchase_credits_database_balance() {
    let harness = Harness::connected().await;
    let payments = service(&harness, Arc::new(AcceptingVerifier), PaymentsConfig::default());
    let electrician = harness.database().seed_user("Can Usta", UserType::Electrician);

    let receipt = payments
        .purchase(&request(&electrician.id, "pkg-35", Some("gp-token-1")))
        .await
        .unwrap();

    assert_eq!(receipt.credits_added, 35);
    assert_eq!(receipt.new_balance, 35);
    assert_eq!(receipt.transaction_id, "gp-token-1");
    assert_eq!(receipt.answered_by, "database");
    assert!(!receipt.provisional);
    assert!(!receipt.verification_bypassed);
    assert_eq!(harness.database().balance(&electrician.id), Some(35));
    assert_eq!(harness.database().with_tables(|t| t.payments.len()), 1);
}

#[tokio::test]
async fn test_reused_token_is_rejected() {
    let harness = Harness::connected().await;
    let payments = service(&harness, Arc::new(AcceptingVerifier), PaymentsConfig::default());
    let electrician = harness.database().seed_user("Can Usta", UserType::Electrician);
    let purchase = request(&electrician.id, "pkg-10", Some("gp-token-2"));

    payments.purchase(&purchase).await.unwrap();
    let second = payments.purchase(&purchase).await;

    assert!(matches!(second, Err(MarketplaceError::Conflict(_))));
    assert_eq!(harness.database().balance(&electrician.id), Some(10));
}

#[tokio::test]
async fn test_failed_verification_rejects_purchase() {
    let harness = Harness::connected().await;
    let payments = service(&harness, Arc::new(UnconfiguredVerifier), PaymentsConfig::default());
    let electrician = harness.database().seed_user("Can Usta", UserType::Electrician);

    let result = payments
        .purchase(&request(&electrician.id, "pkg-10", Some("forged")))
        .await;

    assert!(matches!(result, Err(MarketplaceError::VerificationFailed(_))));
    assert_eq!(harness.database().balance(&electrician.id), Some(0));
}

#[tokio::test]
async fn test_bypass_flag_accepts_failed_verification() {
    let harness = Harness::connected().await;
    let config = PaymentsConfig {
        bypass_failed_verification: true,
        ..PaymentsConfig::default()
    };
    let payments = service(&harness, Arc::new(UnconfiguredVerifier), config);
    let electrician = harness.database().seed_user("Can Usta", UserType::Electrician);

    let receipt = payments
        .purchase(&request(&electrician.id, "pkg-10", Some("unverifiable")))
        .await
        .unwrap();

    assert!(receipt.verification_bypassed);
    assert_eq!(receipt.new_balance, 10);
}

#[tokio::test]
async fn test_test_purchase_requires_flag() {
    let harness = Harness::offline().await;
    let config = PaymentsConfig {
        allow_test_purchases: false,
        ..PaymentsConfig::default()
    };
    let payments = service(&harness, Arc::new(AcceptingVerifier), config);

    let result = payments
        .purchase(&request(&EntityId::mint("user"), "pkg-10", None))
        .await;

    assert!(matches!(result, Err(MarketplaceError::ValidationError(_))));
}

#[tokio::test]
async fn test_offline_test_purchase_uses_fallback_ledger() {
    let harness = Harness::offline().await;
    let payments = service(&harness, Arc::new(AcceptingVerifier), PaymentsConfig::default());
    let user = EntityId::mint("user");

    let first = payments.purchase(&request(&user, "pkg-10", None)).await.unwrap();
    let second = payments.purchase(&request(&user, "pkg-75", None)).await.unwrap();

    assert_eq!(first.answered_by, "fallback");
    assert!(first.transaction_id.starts_with("mock-tx-"));
    assert_eq!(second.new_balance, 85);
    assert_eq!(harness.fallback.credits.balance(&user), 85);

    let history = payments.history(&user).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].amount, 75);
    assert_eq!(history[0].transaction_type, CreditTransactionType::Purchase);
}

#[tokio::test]
async fn test_offline_store_purchase_is_provisional() {
    let harness = Harness::offline().await;
    let payments = service(&harness, Arc::new(AcceptingVerifier), PaymentsConfig::default());
    let user = EntityId::mint("user");

    let receipt = payments
        .purchase(&request(&user, "pkg-10", Some("gp-token-offline")))
        .await
        .unwrap();

    assert!(receipt.provisional);
    assert_eq!(receipt.answered_by, "fallback");
    assert_eq!(receipt.new_balance, 10);
}

#[tokio::test]
async fn test_unknown_package_rejected() {
    let harness = Harness::offline().await;
    let payments = service(&harness, Arc::new(AcceptingVerifier), PaymentsConfig::default());

    let result = payments
        .purchase(&request(&EntityId::mint("user"), "pkg-9000", None))
        .await;

    assert!(matches!(result, Err(MarketplaceError::ValidationError(_))));
    assert_eq!(payments.packages().len(), 4);
}

#[tokio::test]
async fn test_purchase_without_profile_is_not_found() {
    let harness = Harness::connected().await;
    let payments = service(&harness, Arc::new(AcceptingVerifier), PaymentsConfig::default());
    let citizen = harness.database().seed_user("Citizen Only", UserType::Citizen);

    let result = payments
        .purchase(&request(&citizen.id, "pkg-10", Some("gp-token-3")))
        .await;

    assert!(matches!(result, Err(MarketplaceError::NotFound(_))));
}

#[tokio::test]
async fn test_concurrent_reuse_credits_once() {
    let harness = Harness::connected().await;
    let payments = service(&harness, Arc::new(YieldingVerifier), PaymentsConfig::default());
    let electrician = harness.database().seed_user("Can Usta", UserType::Electrician);
    let purchase = request(&electrician.id, "pkg-35", Some("gp-token-race"));

    let (first, second) = tokio::join!(payments.purchase(&purchase), payments.purchase(&purchase));

    let results = [first, second];
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert_eq!(
        results
            .iter()
            .filter(|r| matches!(r, Err(MarketplaceError::Conflict(_))))
            .count(),
        1
    );
    assert_eq!(harness.database().balance(&electrician.id), Some(35));
    assert_eq!(harness.database().with_tables(|t| t.payments.len()), 1);
    assert_eq!(harness.database().with_tables(|t| t.credits.len()), 1);
}

#[tokio::test]
async fn test_purchase_without_profile_leaves_no_payment() {
    let harness = Harness::connected().await;
    let payments = service(&harness, Arc::new(AcceptingVerifier), PaymentsConfig::default());
    let citizen = harness.database().seed_user("Citizen Only", UserType::Citizen);

    let result = payments
        .purchase(&request(&citizen.id, "pkg-10", Some("gp-token-4")))
        .await;

    assert!(matches!(result, Err(MarketplaceError::NotFound(_))));
    assert!(harness.database().with_tables(|t| t.payments.is_empty()));
}
