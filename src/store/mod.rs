mod schema;
mod sqlite;

pub use sqlite::SqliteStore;

use crate::error::Result;
use crate::types::*;

/// Store defines the database interface.
pub trait Store: Send + Sync {
    fn initialize(&self) -> Result<()>;

    // Deployment operations
    fn create_deployment(&self, record: &DeploymentRecord) -> Result<()>;
    fn get_deployment(&self, id: &str) -> Result<Option<DeploymentRecord>>;
    fn list_deployments(&self) -> Result<Vec<DeploymentRecord>>;
    fn update_deployment(&self, record: &DeploymentRecord) -> Result<()>;
    fn delete_deployment(&self, id: &str) -> Result<bool>;

    // Job operations
    fn create_job(&self, job: &Job) -> Result<()>;
    fn get_job(&self, id: &str) -> Result<Option<Job>>;
    /// Returns the oldest job that does not yet have a result.
    fn next_pending_job(&self) -> Result<Option<Job>>;

    // Result operations
    fn create_result(&self, result: &JobResult) -> Result<()>;
    fn get_result(&self, job_id: &str) -> Result<Option<JobResult>>;

    fn close(&self) -> Result<()>;
}
