mod worker;

pub use worker::Worker;

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Notify;
use uuid::Uuid;

use crate::error::Result;
use crate::store::Store;
use crate::types::{Action, ActionParams, Job};

/// How long the worker sleeps between queue checks when no submission wakes
/// it first.
const POLL_INTERVAL: Duration = Duration::from_secs(5);

/// JobQueue is a durable FIFO of asynchronous actions. Submission appends a
/// job row and wakes the worker; the caller returns immediately with the job
/// id.
pub struct JobQueue {
    store: Arc<dyn Store>,
    notify: Notify,
}

impl JobQueue {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            notify: Notify::new(),
        }
    }

    /// Appends a job and returns its id. The job row is written once and
    /// never mutated; its eventual outcome lands in a separate result row.
    pub fn submit(&self, deployment_id: &str, action: Action, params: ActionParams) -> Result<String> {
        let job = Job {
            id: Uuid::new_v4().to_string(),
            deployment_id: deployment_id.to_string(),
            action,
            params,
            created_at: Utc::now(),
        };
        self.store.create_job(&job)?;
        self.notify.notify_one();
        Ok(job.id)
    }

    /// Blocks until a submission wakes the queue, or the poll interval
    /// elapses as a safety net.
    pub(crate) async fn wait(&self) {
        let _ = tokio::time::timeout(POLL_INTERVAL, self.notify.notified()).await;
    }
}
