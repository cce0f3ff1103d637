use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Action;

/// One managed deployment: a directory, an SSH keypair, and (once cloned) a
/// git checkout containing a compose definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentRecord {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Relative path inside the checkout where the compose definition lives.
    /// `None` means the checkout root.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directory: Option<String>,
    /// Source URL. Immutable once the repository has been cloned.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Optional parameters carried by an action request or a queued job.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActionParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reset: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tail: Option<u64>,
}

/// A queued asynchronous action. Written once at submission, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub deployment_id: String,
    pub action: Action,
    pub params: ActionParams,
    pub created_at: DateTime<Utc>,
}

/// The single outcome of a job, written exactly once by the worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobResult {
    pub job_id: String,
    pub success: bool,
    pub output: String,
    pub created_at: DateTime<Utc>,
}
