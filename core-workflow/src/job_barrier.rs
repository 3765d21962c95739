//! # Job Barrier
//!
//! Waits for service jobs by polling the [`ServiceRegistry`].
//!
//! ## Usage
//!
//! ```ignore
//! let barrier = JobBarrier::new(registry, Duration::from_millis(500))
//!     .with_timeout(Duration::from_secs(600));
//! let result = barrier.wait_for(&[job]).await?;
//! if !result.is_success() {
//!     return Err(WorkflowOperationError::JobFailed("distribution".into()));
//! }
//! ```

use bridge_traits::{Job, JobStatus, ServiceRegistry};
use futures::future::try_join_all;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, warn};

use crate::error::Result;

/// Final state of the jobs a barrier waited for
#[derive(Debug, Clone, Default)]
pub struct BarrierResult {
    jobs: BTreeMap<u64, Job>,
    timed_out: bool,
}

impl BarrierResult {
    /// Whether every job finished. Failed, deleted or still running jobs
    /// make the result unsuccessful.
    pub fn is_success(&self) -> bool {
        !self.timed_out
            && self
                .jobs
                .values()
                .all(|job| job.status == JobStatus::Finished)
    }

    pub fn timed_out(&self) -> bool {
        self.timed_out
    }

    pub fn status(&self, job_id: u64) -> Option<JobStatus> {
        self.jobs.get(&job_id).map(|job| job.status)
    }

    /// Latest state of every job, ordered by id.
    pub fn jobs(&self) -> impl Iterator<Item = &Job> {
        self.jobs.values()
    }
}

pub struct JobBarrier {
    registry: Arc<dyn ServiceRegistry>,
    polling_interval: Duration,
    timeout: Option<Duration>,
}

impl JobBarrier {
    pub fn new(registry: Arc<dyn ServiceRegistry>, polling_interval: Duration) -> Self {
        Self {
            registry,
            polling_interval,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Polls until all `jobs` reached a terminal state or the timeout
    /// elapsed.
    ///
    /// # Errors
    ///
    /// Fails when the registry cannot report a job.
    pub async fn wait_for(&self, jobs: &[Job]) -> Result<BarrierResult> {
        let started = Instant::now();
        let mut latest: BTreeMap<u64, Job> = jobs.iter().map(|j| (j.id, j.clone())).collect();

        loop {
            let pending: Vec<u64> = latest
                .values()
                .filter(|job| !job.status.is_terminal())
                .map(|job| job.id)
                .collect();
            if pending.is_empty() {
                debug!(jobs = latest.len(), "All jobs reached a terminal state");
                return Ok(BarrierResult {
                    jobs: latest,
                    timed_out: false,
                });
            }

            if let Some(timeout) = self.timeout {
                if started.elapsed() >= timeout {
                    warn!(
                        pending = ?pending,
                        timeout_ms = timeout.as_millis() as u64,
                        "Timed out waiting for jobs"
                    );
                    return Ok(BarrierResult {
                        jobs: latest,
                        timed_out: true,
                    });
                }
            }

            sleep(self.polling_interval).await;

            let updated = try_join_all(pending.iter().map(|id| self.registry.get_job(*id))).await?;
            for job in updated {
                latest.insert(job.id, job);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::BridgeError;
    use mockall::mock;
    use mockall::predicate::eq;

    mock! {
        pub Registry {}

        #[async_trait]
        impl ServiceRegistry for Registry {
            async fn get_job(&self, id: u64) -> bridge_traits::Result<Job>;
            async fn update_job(&self, job: Job) -> bridge_traits::Result<Job>;
        }
    }

    fn job(id: u64, status: JobStatus) -> Job {
        Job::new(id, "test", "distribute").with_status(status)
    }

    #[tokio::test]
    async fn test_terminal_jobs_are_not_polled() {
        let registry = MockRegistry::new();
        let barrier = JobBarrier::new(Arc::new(registry), Duration::from_millis(1));
        let result = barrier
            .wait_for(&[job(1, JobStatus::Finished), job(2, JobStatus::Finished)])
            .await
            .unwrap();
        assert!(result.is_success());
        assert_eq!(result.jobs().count(), 2);
    }

    #[tokio::test]
    async fn test_polls_until_finished() {
        let mut registry = MockRegistry::new();
        let mut calls = 0;
        registry.expect_get_job().with(eq(7)).returning(move |id| {
            calls += 1;
            let status = if calls < 3 {
                JobStatus::Running
            } else {
                JobStatus::Finished
            };
            Ok(job(id, status))
        });

        let barrier = JobBarrier::new(Arc::new(registry), Duration::from_millis(1));
        let result = barrier.wait_for(&[job(7, JobStatus::Queued)]).await.unwrap();
        assert!(result.is_success());
        assert_eq!(result.status(7), Some(JobStatus::Finished));
    }

    #[tokio::test]
    async fn test_failed_job_is_not_success() {
        let mut registry = MockRegistry::new();
        registry
            .expect_get_job()
            .returning(|id| Ok(job(id, JobStatus::Failed)));

        let barrier = JobBarrier::new(Arc::new(registry), Duration::from_millis(1));
        let result = barrier
            .wait_for(&[job(1, JobStatus::Finished), job(2, JobStatus::Running)])
            .await
            .unwrap();
        assert!(!result.is_success());
        assert_eq!(result.status(2), Some(JobStatus::Failed));
    }

    #[tokio::test]
    async fn test_timeout() {
        let mut registry = MockRegistry::new();
        registry
            .expect_get_job()
            .returning(|id| Ok(job(id, JobStatus::Running)));

        let barrier = JobBarrier::new(Arc::new(registry), Duration::from_millis(5))
            .with_timeout(Duration::from_millis(20));
        let result = barrier.wait_for(&[job(1, JobStatus::Queued)]).await.unwrap();
        assert!(result.timed_out());
        assert!(!result.is_success());
    }

    #[tokio::test]
    async fn test_registry_error_propagates() {
        let mut registry = MockRegistry::new();
        registry
            .expect_get_job()
            .returning(|id| Err(BridgeError::NotFound(format!("job {}", id))));

        let barrier = JobBarrier::new(Arc::new(registry), Duration::from_millis(1));
        assert!(barrier.wait_for(&[job(1, JobStatus::Queued)]).await.is_err());
    }
}
