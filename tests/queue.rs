use std::fs;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tempfile::TempDir;

use dockhand::deploy::{DeploymentManager, Executor};
use dockhand::queue::{JobQueue, Worker};
use dockhand::store::{SqliteStore, Store};
use dockhand::types::{Action, ActionParams, DeploymentRecord, JobResult};

struct TestQueue {
    store: Arc<SqliteStore>,
    queue: Arc<JobQueue>,
    root: TempDir,
}

fn test_queue() -> TestQueue {
    let root = TempDir::new().expect("create temp dir");
    let store = Arc::new(SqliteStore::in_memory().expect("open store"));
    store.initialize().expect("initialize store");

    let manager = Arc::new(DeploymentManager::new(
        store.clone(),
        root.path().to_path_buf(),
        Executor::default(),
    ));
    let queue = Arc::new(JobQueue::new(store.clone()));

    let worker = Worker::new(store.clone(), manager, queue.clone());
    tokio::spawn(worker.run());

    TestQueue { store, queue, root }
}

impl TestQueue {
    fn seed(&self, id: &str) {
        let record = DeploymentRecord {
            id: id.to_string(),
            name: None,
            directory: None,
            repository: Some("git@example.com:acme/app.git".to_string()),
            created_at: Utc::now(),
        };
        self.store.create_deployment(&record).expect("seed record");
        fs::create_dir_all(self.root.path().join(id)).expect("seed directory");
    }

    async fn await_result(&self, job_id: &str) -> JobResult {
        for _ in 0..200 {
            if let Some(result) = self.store.get_result(job_id).expect("read result") {
                return result;
            }
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
        panic!("no result for job {job_id} within deadline");
    }
}

#[tokio::test]
async fn test_submit_produces_exactly_one_result() {
    let queue = test_queue();
    queue.seed("ab12cd34");

    // Status on an un-cloned deployment fails fast inside the manager; the
    // worker must record that failure instead of raising it.
    let job_id = queue
        .queue
        .submit("ab12cd34", Action::Status, ActionParams::default())
        .expect("submit");

    let result = queue.await_result(&job_id).await;
    assert!(!result.success);
    assert!(result.output.contains("cloned"));
    assert!(queue.store.next_pending_job().expect("queue").is_none());
}

#[tokio::test]
async fn test_unknown_deployment_job_records_failure() {
    let queue = test_queue();

    let job_id = queue
        .queue
        .submit("ffffffff", Action::Update, ActionParams::default())
        .expect("submit");

    let result = queue.await_result(&job_id).await;
    assert!(!result.success);
    assert!(result.output.contains("not found"));
}

#[tokio::test]
async fn test_results_land_in_submission_order() {
    let queue = test_queue();
    queue.seed("ab12cd34");

    let first = queue
        .queue
        .submit("ab12cd34", Action::Status, ActionParams::default())
        .expect("submit first");
    let second = queue
        .queue
        .submit("ab12cd34", Action::Logs, ActionParams::default())
        .expect("submit second");

    // The worker is strictly FIFO, so whenever the second job has a result
    // the first one must as well.
    queue.await_result(&second).await;
    assert!(
        queue
            .store
            .get_result(&first)
            .expect("read result")
            .is_some()
    );
}

#[tokio::test]
async fn test_info_is_not_queueable() {
    let queue = test_queue();
    queue.seed("ab12cd34");

    let job_id = queue
        .queue
        .submit("ab12cd34", Action::Info, ActionParams::default())
        .expect("submit");

    let result = queue.await_result(&job_id).await;
    assert!(!result.success);
    assert!(result.output.contains("cannot be queued"));
}
