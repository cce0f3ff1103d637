mod action;
mod models;

pub use action::Action;
pub use models::{ActionParams, DeploymentRecord, Job, JobResult};
