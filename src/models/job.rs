use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identity::EntityId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    #[default]
    Open,
    InProgress,
    Completed,
    Cancelled,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Open => "OPEN",
            JobStatus::InProgress => "IN_PROGRESS",
            JobStatus::Completed => "COMPLETED",
            JobStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "OPEN" => Some(JobStatus::Open),
            "IN_PROGRESS" => Some(JobStatus::InProgress),
            "COMPLETED" => Some(JobStatus::Completed),
            "CANCELLED" => Some(JobStatus::Cancelled),
            _ => None,
        }
    }
}

/// Job post, maps to `job_posts`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: EntityId,
    pub citizen_id: EntityId,
    pub title: String,
    pub description: String,
    pub city: Option<String>,
    pub status: JobStatus,
    pub bid_count: i64,
    pub created_at: DateTime<Utc>,
}

impl Job {
    pub fn empty(id: EntityId) -> Self {
        Self {
            citizen_id: id.clone(),
            id,
            title: String::new(),
            description: String::new(),
            city: None,
            status: JobStatus::default(),
            bid_count: 0,
            created_at: Utc::now(),
        }
    }
}

/// New job post (without generated fields)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewJob {
    pub citizen_id: EntityId,
    pub title: String,
    pub description: String,
    pub city: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub city: Option<String>,
    pub status: Option<JobStatus>,
    pub bid_count: Option<i64>,
}
