//! Service Registry Abstraction
//!
//! Long running service calls (distribution, retraction) are represented as
//! jobs. The registry is the source of truth for their state.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Instantiated,
    Queued,
    Paused,
    Running,
    Finished,
    Failed,
    Deleted,
}

impl JobStatus {
    /// Finished, failed and deleted jobs will not change anymore.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Finished | JobStatus::Failed | JobStatus::Deleted)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub id: u64,
    pub job_type: String,
    pub operation: String,
    pub status: JobStatus,
    /// Result of the job, e.g. the serialized elements of a distribution.
    pub payload: Option<String>,
    pub date_created: DateTime<Utc>,
}

impl Job {
    pub fn new(id: u64, job_type: impl Into<String>, operation: impl Into<String>) -> Self {
        Self {
            id,
            job_type: job_type.into(),
            operation: operation.into(),
            status: JobStatus::Queued,
            payload: None,
            date_created: Utc::now(),
        }
    }

    pub fn with_status(mut self, status: JobStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_payload(mut self, payload: impl Into<String>) -> Self {
        self.payload = Some(payload.into());
        self
    }
}

/// Job bookkeeping
#[async_trait]
pub trait ServiceRegistry: Send + Sync {
    /// Fails with `NotFound` for unknown ids.
    async fn get_job(&self, id: u64) -> Result<Job>;

    async fn update_job(&self, job: Job) -> Result<Job>;
}
