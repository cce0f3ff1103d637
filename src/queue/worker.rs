use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info, warn};

use super::JobQueue;
use crate::deploy::DeploymentManager;
use crate::store::Store;
use crate::types::{Job, JobResult};

/// Worker is the single background loop draining the job queue.
///
/// It strictly serializes asynchronous actions in submission order: one job
/// at a time, system-wide. A failed job records a failed result and is never
/// re-enqueued.
pub struct Worker {
    store: Arc<dyn Store>,
    manager: Arc<DeploymentManager>,
    queue: Arc<JobQueue>,
}

impl Worker {
    pub fn new(
        store: Arc<dyn Store>,
        manager: Arc<DeploymentManager>,
        queue: Arc<JobQueue>,
    ) -> Self {
        Self {
            store,
            manager,
            queue,
        }
    }

    pub async fn run(self) {
        info!("job worker started");
        loop {
            match self.store.next_pending_job() {
                Ok(Some(job)) => self.process(job).await,
                Ok(None) => self.queue.wait().await,
                Err(e) => {
                    error!("could not read job queue: {}", e);
                    self.queue.wait().await;
                }
            }
        }
    }

    async fn process(&self, job: Job) {
        info!(
            "job {}: {} on deployment {}",
            job.id, job.action, job.deployment_id
        );

        let outcome = self
            .manager
            .run_action(&job.deployment_id, job.action, &job.params)
            .await;

        let result = match outcome {
            Ok(output) => JobResult {
                job_id: job.id.clone(),
                success: true,
                output,
                created_at: Utc::now(),
            },
            Err(e) => {
                warn!("job {} failed: {}", job.id, e);
                JobResult {
                    job_id: job.id.clone(),
                    success: false,
                    output: e.to_string(),
                    created_at: Utc::now(),
                }
            }
        };

        if let Err(e) = self.store.create_result(&result) {
            error!("could not record result for job {}: {}", job.id, e);
        }
    }
}
