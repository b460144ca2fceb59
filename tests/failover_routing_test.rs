//! Routing between the database and the fallback store.

mod common;

use common::Harness;
use marketplace_core::error::MarketplaceError;
use marketplace_core::identity::EntityId;
use marketplace_core::models::{NewJob, NewNotification, UserType};
use marketplace_core::router::Backend;
use marketplace_core::services::{BlockService, JobService, NotificationService};

fn new_job(citizen_id: &EntityId, title: &str) -> NewJob {
    NewJob {
        citizen_id: citizen_id.clone(),
        title: title.to_string(),
        description: "Kitchen sockets stopped working".to_string(),
        city: Some("Izmir".to_string()),
    }
}

#[tokio::test]
async fn test_fallback_ids_never_reach_database() {
    let harness = Harness::connected().await;
    let blocks = BlockService::new(harness.router.clone());
    let citizen = harness.database().seed_user("Ayse Kaya", UserType::Citizen);
    let calls_before = harness.database().calls();

    let mock_user = EntityId::parse("mock-user-42");
    let block = blocks
        .block(&mock_user, &citizen.id, Some("spam"))
        .await
        .unwrap();

    assert!(block.id.is_fallback());
    assert!(blocks.is_blocked(&citizen.id, &mock_user).await.unwrap());
    assert_eq!(harness.database().calls(), calls_before);
    assert_eq!(harness.fallback.blocks.len().await, 1);
}

#[tokio::test]
async fn test_offline_answers_from_fallback_store() {
    let harness = Harness::offline().await;
    let jobs = JobService::new(harness.router.clone());
    let citizen = EntityId::parse("mock-user-1");

    let job = jobs.post(&new_job(&citizen, "Rewire kitchen")).await.unwrap();

    assert!(job.id.is_fallback());
    assert_eq!(jobs.get(&job.id).await.unwrap().title, "Rewire kitchen");
    assert_eq!(jobs.count_open().await.unwrap(), 1);
    assert_eq!(harness.database().calls(), 0);
}

#[tokio::test]
async fn test_connectivity_failure_falls_back_for_one_call_only() {
    let harness = Harness::connected().await;
    let notifications = NotificationService::new(harness.router.clone());
    let user = harness.database().seed_user("Mehmet Demir", UserType::Electrician);

    harness.database().set_connectivity_down(true);
    let saved = notifications
        .save(&NewNotification::new(
            user.id.clone(),
            "SYSTEM",
            "Welcome",
            "Thanks for joining",
        ))
        .await
        .unwrap();

    assert!(saved.id.is_fallback());
    assert!(harness.fallback.notifications.contains(&user.id, &saved.id));
    // a failed query never flips the signal; only the monitor does
    assert!(harness.monitor.is_available());

    harness.database().set_connectivity_down(false);
    let saved = notifications
        .save(&NewNotification::new(
            user.id.clone(),
            "SYSTEM",
            "Second",
            "Back on the database",
        ))
        .await
        .unwrap();
    assert!(!saved.id.is_fallback());
    assert_eq!(
        harness.database().with_tables(|t| t.notifications.len()),
        1
    );
}

#[tokio::test]
async fn test_constraint_violation_propagates() {
    let harness = Harness::connected().await;
    let jobs = JobService::new(harness.router.clone());
    let citizen = harness.database().seed_user("Zeynep Aydin", UserType::Citizen);

    harness.database().set_reject_writes(true);
    let result = jobs.post(&new_job(&citizen.id, "Replace breaker")).await;

    assert!(matches!(
        result,
        Err(MarketplaceError::ConstraintViolation { ref code, .. }) if code == "23505"
    ));
    assert!(harness.fallback.jobs.is_empty());
}

#[tokio::test]
async fn test_duplicate_block_is_conflict_in_both_backends() {
    let harness = Harness::connected().await;
    let blocks = BlockService::new(harness.router.clone());
    let a = harness.database().seed_user("A", UserType::Citizen);
    let b = harness.database().seed_user("B", UserType::Electrician);

    blocks.block(&a.id, &b.id, None).await.unwrap();
    assert!(matches!(
        blocks.block(&a.id, &b.id, None).await,
        Err(MarketplaceError::Conflict(_))
    ));

    let offline = Harness::offline().await;
    let blocks = BlockService::new(offline.router.clone());
    let (x, y) = (EntityId::mint("user"), EntityId::mint("user"));
    blocks.block(&x, &y, None).await.unwrap();
    assert!(matches!(
        blocks.block(&x, &y, None).await,
        Err(MarketplaceError::Conflict(_))
    ));
}

#[tokio::test]
async fn test_self_block_rejected_before_routing() {
    let harness = Harness::connected().await;
    let blocks = BlockService::new(harness.router.clone());
    let user = harness.database().seed_user("Solo", UserType::Citizen);
    let calls_before = harness.database().calls();

    let result = blocks.block(&user.id, &user.id, None).await;

    assert!(matches!(result, Err(MarketplaceError::ValidationError(_))));
    assert_eq!(harness.database().calls(), calls_before);
}

#[tokio::test]
async fn test_block_status_from_both_directions() {
    let harness = Harness::connected().await;
    let blocks = BlockService::new(harness.router.clone());
    let a = harness.database().seed_user("A", UserType::Citizen);
    let b = harness.database().seed_user("B", UserType::Citizen);

    blocks.block(&b.id, &a.id, Some("rude")).await.unwrap();

    let status = blocks.status(&a.id, &b.id).await.unwrap();
    assert!(!status.i_blocked_them);
    assert!(status.they_blocked_me);
    assert!(status.is_blocked);

    let listed = blocks.blocked_users(&b.id).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].blocked_user.full_name, "A");

    blocks.unblock(&b.id, &a.id).await.unwrap();
    assert!(matches!(
        blocks.unblock(&b.id, &a.id).await,
        Err(MarketplaceError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_execute_traced_reports_backend() {
    let harness = Harness::connected().await;
    let db_id = EntityId::parse("6b0e5f52-8f7c-4c57-9f57-0d8a3c2b1e10");
    let mock_id = EntityId::parse("mock-user-7");

    let (_, backend) = harness
        .router
        .execute_traced(
            "probe",
            &[&db_id],
            |_db| async move { Ok(()) },
            |_store| async move { Ok(()) },
        )
        .await
        .unwrap();
    assert_eq!(backend, Backend::Database);

    let (_, backend) = harness
        .router
        .execute_traced(
            "probe",
            &[&db_id, &mock_id],
            |_db| async move { Ok(()) },
            |_store| async move { Ok(()) },
        )
        .await
        .unwrap();
    assert_eq!(backend, Backend::Fallback);
}

#[tokio::test]
async fn test_side_channel_skipped_when_unavailable() {
    let offline = Harness::offline().await;
    let answer = offline
        .router
        .when_available("probe", |_db| async move { Ok(true) })
        .await
        .unwrap();
    assert_eq!(answer, None);

    let online = Harness::connected().await;
    online.database().set_connectivity_down(true);
    let answer = online
        .router
        .when_available("probe", |db| async move {
            use marketplace_core::database::CreditQueries;
            db.payment_exists("token").await
        })
        .await
        .unwrap();
    assert_eq!(answer, None);
}
