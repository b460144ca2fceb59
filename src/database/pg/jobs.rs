use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{as_bigint, decode_enum};
use crate::database::connection::PgDatabase;
use crate::database::queries::JobQueries;
use crate::error::{MarketplaceError, MarketplaceResult};
use crate::identity::EntityId;
use crate::models::{Job, JobStatus, NewJob, PageRequest};

#[derive(Debug, sqlx::FromRow)]
struct JobRow {
    id: String,
    citizen_id: String,
    title: String,
    description: String,
    city: Option<String>,
    status: String,
    bid_count: i64,
    created_at: DateTime<Utc>,
}

impl TryFrom<JobRow> for Job {
    type Error = MarketplaceError;

    fn try_from(row: JobRow) -> Result<Self, Self::Error> {
        Ok(Job {
            status: decode_enum(&row.status, "job_posts.status", JobStatus::parse)?,
            id: row.id.into(),
            citizen_id: row.citizen_id.into(),
            title: row.title,
            description: row.description,
            city: row.city,
            bid_count: row.bid_count,
            created_at: row.created_at,
        })
    }
}

const JOB_SELECT: &str = r#"
    SELECT j.id::text AS id, j.citizen_id::text AS citizen_id, j.title, j.description, j.city,
           j.status, j.created_at,
           (SELECT COUNT(*) FROM bids b WHERE b.job_post_id = j.id) AS bid_count
    FROM job_posts j
"#;

#[async_trait]
impl JobQueries for PgDatabase {
    async fn insert_job(&self, new: &NewJob) -> MarketplaceResult<Job> {
        let row = sqlx::query_as::<_, JobRow>(
            r#"
            INSERT INTO job_posts (citizen_id, title, description, city)
            VALUES ($1::uuid, $2, $3, $4)
            RETURNING id::text AS id, citizen_id::text AS citizen_id, title, description, city,
                      status, created_at, 0::bigint AS bid_count
            "#,
        )
        .bind(new.citizen_id.as_str())
        .bind(&new.title)
        .bind(&new.description)
        .bind(new.city.as_deref())
        .fetch_one(self.pool())
        .await?;
        row.try_into()
    }

    async fn find_job(&self, job_id: &EntityId) -> MarketplaceResult<Option<Job>> {
        let sql = format!("{JOB_SELECT} WHERE j.id = $1::uuid");
        let row = sqlx::query_as::<_, JobRow>(&sql)
            .bind(job_id.as_str())
            .fetch_optional(self.pool())
            .await?;
        row.map(Job::try_from).transpose()
    }

    async fn list_jobs(&self, page: PageRequest) -> MarketplaceResult<Vec<Job>> {
        let sql = format!("{JOB_SELECT} ORDER BY j.created_at DESC LIMIT $1 OFFSET $2");
        let rows = sqlx::query_as::<_, JobRow>(&sql)
            .bind(as_bigint(page.limit()))
            .bind(as_bigint(page.offset()))
            .fetch_all(self.pool())
            .await?;
        rows.into_iter().map(Job::try_from).collect()
    }

    async fn count_jobs(&self) -> MarketplaceResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM job_posts")
            .fetch_one(self.pool())
            .await?;
        Ok(count)
    }

    async fn count_open_jobs(&self) -> MarketplaceResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM job_posts WHERE status = $1")
            .bind(JobStatus::Open.as_str())
            .fetch_one(self.pool())
            .await?;
        Ok(count)
    }

    async fn delete_job(&self, job_id: &EntityId) -> MarketplaceResult<u64> {
        let result = sqlx::query("DELETE FROM job_posts WHERE id = $1::uuid")
            .bind(job_id.as_str())
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected())
    }
}
