//! # Administration
//!
//! Verification review, dashboard statistics and user/job management. All
//! operations require an administrator [`Actor`].

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::{Actor, JobService, NotificationService};
use crate::availability::Connector;
use crate::constants::VERIFICATION_BONUS_CREDITS;
use crate::database::{CreditQueries, JobQueries, NotificationQueries, UserQueries};
use crate::error::{MarketplaceError, MarketplaceResult};
use crate::identity::EntityId;
use crate::models::{
    CreditChange, CreditEntry, CreditTransactionType, DashboardStats, Job, JobStatus,
    NewNotification, Page, PageRequest, PendingVerification, User, UserFilter, UserPatch,
    UserType, VerificationReview, VerificationStatus,
};
use crate::reconcile::DeletionOutcome;
use crate::router::{Backend, PersistenceRouter};

const VERIFIED_NOTIFICATION: &str = "VERIFICATION_SUCCESS";
const REJECTED_NOTIFICATION: &str = "VERIFICATION_FAILED";
const PROFILE_RELATED_TYPE: &str = "USER_PROFILE";
const DEFAULT_REJECTION_MESSAGE: &str =
    "Your documents could not be accepted. Please fix the issues and upload them again.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationDecision {
    pub status: VerificationStatus,
    pub reason: Option<String>,
}

impl VerificationDecision {
    pub fn approve() -> Self {
        Self {
            status: VerificationStatus::Verified,
            reason: None,
        }
    }

    pub fn reject(reason: impl Into<String>) -> Self {
        Self {
            status: VerificationStatus::Rejected,
            reason: Some(reason.into()),
        }
    }

    fn is_approval(&self) -> bool {
        self.status == VerificationStatus::Verified
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationResult {
    pub user_id: EntityId,
    pub status: VerificationStatus,
    pub bonus: Option<CreditEntry>,
    pub answered_by: Backend,
}

pub struct AdminService<C: Connector> {
    router: PersistenceRouter<C>,
    jobs: JobService<C>,
    notifications: NotificationService<C>,
}

impl<C> AdminService<C>
where
    C: Connector,
    C::Connection: UserQueries + CreditQueries + JobQueries + NotificationQueries,
{
    pub fn new(router: PersistenceRouter<C>) -> Self {
        Self {
            jobs: JobService::new(router.clone()),
            notifications: NotificationService::new(router.clone()),
            router,
        }
    }

    pub async fn pending_verifications(
        &self,
        actor: &Actor,
    ) -> MarketplaceResult<Vec<PendingVerification>> {
        actor.require_admin()?;
        self.router
            .execute(
                "pending_verifications",
                &[&actor.id],
                |db| async move { db.pending_verifications().await },
                |store| async move {
                    Ok(store
                        .users
                        .filter(|user| {
                            user.user_type == UserType::Electrician
                                && user.verification_status == Some(VerificationStatus::Pending)
                        })
                        .into_iter()
                        .map(|user| PendingVerification {
                            user_id: user.id,
                            full_name: user.full_name,
                            email: user.email,
                            phone: user.phone,
                            service_category: user.service_category,
                            verification_documents: None,
                        })
                        .collect())
                },
            )
            .await
    }

    /// Approve or reject an electrician's documents
    ///
    /// The status change and the [`VERIFICATION_BONUS_CREDITS`] awarded on
    /// approval land in the same backend as one unit. The user is notified
    /// through that backend either way; a failed notification is logged and
    /// does not undo the decision.
    pub async fn process_verification(
        &self,
        actor: &Actor,
        target_id: &EntityId,
        decision: &VerificationDecision,
    ) -> MarketplaceResult<VerificationResult> {
        actor.require_admin()?;
        if decision.status == VerificationStatus::Pending {
            return Err(MarketplaceError::validation(
                "status must be VERIFIED or REJECTED",
            ));
        }

        let approved = decision.is_approval();
        let bonus = CreditChange {
            user_id: target_id.clone(),
            amount: VERIFICATION_BONUS_CREDITS,
            transaction_type: CreditTransactionType::Bonus,
            description: "Verification bonus".to_string(),
            related_id: Some(target_id.to_string()),
        };
        let bonus = approved.then_some(&bonus);
        let review = VerificationReview {
            user_id: target_id,
            status: decision.status,
            reviewer_id: &actor.id,
            rejection_reason: decision.reason.as_deref(),
        };
        let review = &review;

        // the reviewer's id is written alongside the decision, so a fallback
        // reviewer keeps the whole decision in the fallback store
        let (awarded, backend) = self
            .router
            .execute_traced(
                "process_verification",
                &[target_id, &actor.id],
                |db| async move { db.apply_verification_decision(review, bonus).await },
                |store| async move {
                    store.users.upsert_merge(
                        target_id,
                        UserPatch {
                            verification_status: Some(decision.status),
                            is_verified: Some(approved),
                            ..UserPatch::default()
                        },
                    );
                    bonus
                        .map(|change| store.credits.add_credits(change))
                        .transpose()
                },
            )
            .await?;

        info!(
            user_id = %target_id,
            status = decision.status.as_str(),
            backend = %backend,
            "Verification processed"
        );

        let notification = if approved {
            NewNotification::new(
                target_id.clone(),
                VERIFIED_NOTIFICATION,
                "Your membership is approved",
                "Your documents were approved. You now carry the verified electrician badge.",
            )
        } else {
            NewNotification::new(
                target_id.clone(),
                REJECTED_NOTIFICATION,
                "Document verification failed",
                decision
                    .reason
                    .clone()
                    .unwrap_or_else(|| DEFAULT_REJECTION_MESSAGE.to_string()),
            )
        }
        .related_to(PROFILE_RELATED_TYPE, target_id.as_str());

        let saved = match backend {
            Backend::Database => self.notifications.save(&notification).await.map(drop),
            Backend::Fallback => {
                self.router.fallback().notifications.save(&notification);
                Ok(())
            }
        };
        if let Err(error) = saved {
            warn!(
                user_id = %target_id,
                error = %error,
                "Failed to save verification notification"
            );
        }

        Ok(VerificationResult {
            user_id: target_id.clone(),
            status: decision.status,
            bonus: awarded,
            answered_by: backend,
        })
    }

    pub async fn dashboard_stats(&self, actor: &Actor) -> MarketplaceResult<DashboardStats> {
        actor.require_admin()?;
        self.router
            .execute(
                "dashboard_stats",
                &[],
                |db| async move {
                    let (counts, active_jobs, total_revenue) = futures::try_join!(
                        db.user_counts(),
                        db.count_open_jobs(),
                        db.total_purchased()
                    )?;
                    Ok(DashboardStats {
                        total_users: counts.total,
                        total_electricians: counts.electricians,
                        total_citizens: counts.citizens,
                        active_jobs,
                        pending_verifications: counts.pending_verifications,
                        total_revenue,
                    })
                },
                |store| async move {
                    let users = store.users.values();
                    let count_where = |predicate: &dyn Fn(&User) -> bool| {
                        users.iter().filter(|user| predicate(user)).count() as i64
                    };
                    Ok(DashboardStats {
                        total_users: users.len() as i64,
                        total_electricians: count_where(&|u| u.user_type == UserType::Electrician),
                        total_citizens: count_where(&|u| u.user_type == UserType::Citizen),
                        active_jobs: store.jobs.count(|job| job.status == JobStatus::Open) as i64,
                        pending_verifications: count_where(&|u| {
                            u.verification_status == Some(VerificationStatus::Pending)
                        }),
                        total_revenue: store.credits.total_purchased(),
                    })
                },
            )
            .await
    }

    /// Newest first, filtered by type and a name/email/phone search term
    pub async fn list_users(
        &self,
        actor: &Actor,
        filter: &UserFilter,
        page: PageRequest,
    ) -> MarketplaceResult<Page<User>> {
        actor.require_admin()?;
        self.router
            .execute(
                "list_users",
                &[],
                |db| async move {
                    let (users, total) = db.list_users(filter, page).await?;
                    Ok(Page::new(users, page, usize::try_from(total).unwrap_or(0)))
                },
                |store| async move {
                    let mut users = store.users.filter(|user| filter.matches(user));
                    users.sort_by(|a, b| b.created_at.cmp(&a.created_at));
                    Ok(Page::from_all(users, page))
                },
            )
            .await
    }

    pub async fn list_jobs(&self, actor: &Actor, page: PageRequest) -> MarketplaceResult<Page<Job>> {
        actor.require_admin()?;
        self.jobs.list(page).await
    }

    pub async fn delete_job(
        &self,
        actor: &Actor,
        job_id: &EntityId,
    ) -> MarketplaceResult<DeletionOutcome> {
        actor.require_admin()?;
        self.jobs.delete(job_id).await
    }
}
