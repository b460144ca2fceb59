//! Job posts.
//!
//! Jobs read from the database are cached in the fallback store so they stay
//! visible during an outage. That cache is why deleting a job has to be
//! reconciled across both stores.

use chrono::Utc;

use crate::availability::Connector;
use crate::database::JobQueries;
use crate::error::{MarketplaceError, MarketplaceResult};
use crate::identity::EntityId;
use crate::models::{Job, JobStatus, NewJob, Page, PageRequest};
use crate::reconcile::{delete_everywhere, DeletionOutcome};
use crate::router::PersistenceRouter;

pub struct JobService<C: Connector> {
    router: PersistenceRouter<C>,
}

impl<C> JobService<C>
where
    C: Connector,
    C::Connection: JobQueries,
{
    pub fn new(router: PersistenceRouter<C>) -> Self {
        Self { router }
    }

    pub async fn post(&self, new: &NewJob) -> MarketplaceResult<Job> {
        if new.title.trim().is_empty() || new.description.trim().is_empty() {
            return Err(MarketplaceError::validation(
                "title and description are required",
            ));
        }

        self.router
            .execute(
                "post_job",
                &[&new.citizen_id],
                |db| async move { db.insert_job(new).await },
                |store| async move {
                    let job = Job {
                        id: EntityId::mint("job"),
                        citizen_id: new.citizen_id.clone(),
                        title: new.title.clone(),
                        description: new.description.clone(),
                        city: new.city.clone(),
                        status: JobStatus::Open,
                        bid_count: 0,
                        created_at: Utc::now(),
                    };
                    store.jobs.insert(job.clone());
                    Ok(job)
                },
            )
            .await
    }

    pub async fn get(&self, job_id: &EntityId) -> MarketplaceResult<Job> {
        let job = self
            .router
            .execute(
                "get_job",
                &[job_id],
                |db| {
                    let cache = self.router.fallback();
                    async move {
                        let job = db.find_job(job_id).await?;
                        if let Some(job) = &job {
                            cache.jobs.insert(job.clone());
                        }
                        Ok(job)
                    }
                },
                |store| async move { Ok(store.jobs.get(job_id)) },
            )
            .await?;

        job.ok_or_else(|| MarketplaceError::not_found(format!("job {job_id}")))
    }

    /// Newest first
    pub async fn list(&self, page: PageRequest) -> MarketplaceResult<Page<Job>> {
        self.router
            .execute(
                "list_jobs",
                &[],
                |db| async move {
                    let (jobs, total) = futures::try_join!(db.list_jobs(page), db.count_jobs())?;
                    Ok(Page::new(jobs, page, usize::try_from(total).unwrap_or(0)))
                },
                |store| async move {
                    let mut jobs = store.jobs.values();
                    jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
                    Ok(Page::from_all(jobs, page))
                },
            )
            .await
    }

    pub async fn count_open(&self) -> MarketplaceResult<i64> {
        self.router
            .execute(
                "count_open_jobs",
                &[],
                |db| async move { db.count_open_jobs().await },
                |store| async move {
                    Ok(store.jobs.count(|job| job.status == JobStatus::Open) as i64)
                },
            )
            .await
    }

    /// Admin delete; removes the job from every store that holds it
    pub async fn delete(&self, job_id: &EntityId) -> MarketplaceResult<DeletionOutcome> {
        let outcome = delete_everywhere(
            &self.router,
            "delete_job",
            job_id,
            &[],
            |db| async move { db.delete_job(job_id).await },
            |store| store.jobs.remove(job_id).is_some(),
        )
        .await?;

        tracing::info!(
            job_id = %job_id,
            removals = outcome.removals(),
            "Job deleted"
        );
        Ok(outcome)
    }
}
