use std::collections::HashMap;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex as StdMutex};

use chrono::Utc;
use rand::Rng;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{info, warn};

use super::command::{self, CommandLine, PRIVATE_KEY_NAME, PUBLIC_KEY_NAME, REPOSITORY_DIR};
use super::process::Executor;
use crate::error::{Error, Result};
use crate::store::Store;
use crate::types::{Action, ActionParams, DeploymentRecord};

const ID_BYTES: usize = 4;
const DEFAULT_STOP_TIMEOUT: u64 = 3;
const DEFAULT_LOG_TAIL: u64 = 100;

/// DeploymentManager owns the lifecycle state machine: it gates every
/// operation on the deployment's setup state, renders the matching command,
/// and executes it in the deployment's own directory.
///
/// Every state-mutating action runs under a per-deployment lock so that the
/// synchronous request path and the job worker can never drive the underlying
/// tools against the same project concurrently.
pub struct DeploymentManager {
    store: Arc<dyn Store>,
    root: PathBuf,
    executor: Executor,
    locks: StdMutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

/// Generates an 8-character lowercase hex deployment identifier.
#[must_use]
pub fn generate_id() -> String {
    let mut bytes = [0u8; ID_BYTES];
    rand::thread_rng().fill(&mut bytes);
    hex::encode(bytes)
}

/// Rejects compose directories that could escape the checkout.
pub fn validate_directory(directory: &str) -> Result<()> {
    let path = Path::new(directory);
    if path.is_absolute()
        || !path
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
    {
        return Err(Error::BadRequest(
            "directory must be a relative path inside the checkout".to_string(),
        ));
    }
    Ok(())
}

impl DeploymentManager {
    pub fn new(store: Arc<dyn Store>, root: PathBuf, executor: Executor) -> Self {
        Self {
            store,
            root,
            executor,
            locks: StdMutex::new(HashMap::new()),
        }
    }

    // Paths

    fn deployment_path(&self, id: &str) -> PathBuf {
        self.root.join(id)
    }

    fn repository_path(&self, id: &str) -> PathBuf {
        self.deployment_path(id).join(REPOSITORY_DIR)
    }

    fn private_key_path(&self, id: &str) -> PathBuf {
        self.deployment_path(id).join(PRIVATE_KEY_NAME)
    }

    fn public_key_path(&self, id: &str) -> PathBuf {
        self.deployment_path(id).join(PUBLIC_KEY_NAME)
    }

    /// Whether the repository checkout exists on disk. The filesystem is the
    /// source of truth for this bit; it is never stored.
    #[must_use]
    pub fn cloned(&self, id: &str) -> bool {
        self.repository_path(id).is_dir()
    }

    // Preconditions

    fn require(&self, id: &str) -> Result<DeploymentRecord> {
        self.store.get_deployment(id)?.ok_or(Error::NotFound)
    }

    fn require_cloned(&self, id: &str) -> Result<()> {
        if !self.cloned(id) {
            return Err(Error::State("repository has not been cloned".to_string()));
        }
        Ok(())
    }

    /// Compose project directory relative to the deployment directory,
    /// verified to resolve inside the checkout and to exist.
    fn project_dir(&self, record: &DeploymentRecord) -> Result<PathBuf> {
        let mut relative = PathBuf::from(REPOSITORY_DIR);
        if let Some(directory) = &record.directory {
            validate_directory(directory)?;
            relative.push(directory);
        }
        if !self.deployment_path(&record.id).join(&relative).is_dir() {
            return Err(Error::State(format!(
                "compose directory {} does not exist",
                relative.display()
            )));
        }
        Ok(relative)
    }

    fn lock(&self, id: &str) -> Arc<AsyncMutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        locks
            .entry(id.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }

    // Command bases

    fn compose_cmd(&self, record: &DeploymentRecord) -> Result<CommandLine> {
        self.require_cloned(&record.id)?;
        let project = self.project_dir(record)?;
        Ok(command::compose(&record.id, &project))
    }

    fn git_cmd(&self, id: &str) -> CommandLine {
        command::git(&self.private_key_path(id))
    }

    async fn execute(&self, id: &str, cmd: &CommandLine) -> Result<String> {
        self.executor.run(cmd, &self.deployment_path(id)).await
    }

    // Account-level operations

    /// Allocates an id, an empty record, the deployment directory, and an SSH
    /// keypair. The record is written last so that a keypair failure never
    /// leaves a dangling record.
    pub async fn create(&self) -> Result<DeploymentRecord> {
        let id = loop {
            let candidate = generate_id();
            if self.store.get_deployment(&candidate)?.is_none()
                && !self.deployment_path(&candidate).exists()
            {
                break candidate;
            }
        };

        let path = self.deployment_path(&id);
        fs::create_dir_all(&path)?;

        let keygen = command::keygen(&id, &self.private_key_path(&id));
        if let Err(e) = self.execute(&id, &keygen).await {
            let _ = fs::remove_dir_all(&path);
            return Err(e);
        }

        let record = DeploymentRecord {
            id: id.clone(),
            name: None,
            directory: None,
            repository: None,
            created_at: Utc::now(),
        };
        if let Err(e) = self.store.create_deployment(&record) {
            let _ = fs::remove_dir_all(&path);
            return Err(e);
        }

        info!("created deployment {}", id);
        Ok(record)
    }

    pub fn get(&self, id: &str) -> Result<DeploymentRecord> {
        self.require(id)
    }

    pub fn list(&self) -> Result<Vec<DeploymentRecord>> {
        self.store.list_deployments()
    }

    pub fn public_key(&self, id: &str) -> Result<String> {
        self.require(id)?;
        Ok(fs::read_to_string(self.public_key_path(id))?)
    }

    /// Updates name/directory unconditionally; the repository URL only while
    /// the checkout does not exist yet, so the source of a cloned deployment
    /// cannot be swapped out from under it.
    pub async fn edit(
        &self,
        id: &str,
        name: Option<String>,
        directory: Option<String>,
        repository: Option<String>,
    ) -> Result<DeploymentRecord> {
        let lock = self.lock(id);
        let _guard = lock.lock().await;

        let mut record = self.require(id)?;
        if let Some(name) = name {
            record.name = Some(name);
        }
        if let Some(directory) = directory {
            validate_directory(&directory)?;
            record.directory = Some(directory);
        }
        if let Some(repository) = repository {
            if self.cloned(id) && record.repository.as_deref() != Some(repository.as_str()) {
                return Err(Error::State(
                    "repository cannot be changed after clone".to_string(),
                ));
            }
            record.repository = Some(repository);
        }
        self.store.update_deployment(&record)?;
        Ok(record)
    }

    /// Best-effort teardown, best-effort directory removal, then record
    /// removal. Teardown and removal failures are logged and swallowed so the
    /// record can never be left dangling; an orphaned directory is the
    /// accepted trade-off.
    pub async fn delete(&self, id: &str) -> Result<()> {
        let record = self.require(id)?;
        let lock = self.lock(id);
        let _guard = lock.lock().await;

        if self.cloned(id) {
            if let Err(e) = self.do_destroy(&record, None).await {
                warn!("teardown of {} failed during delete: {}", id, e);
            }
        }

        let path = self.deployment_path(id);
        if path.exists() {
            if let Err(e) = fs::remove_dir_all(&path) {
                warn!("could not remove {}: {}", path.display(), e);
            }
        }

        self.store.delete_deployment(id)?;
        info!("deleted deployment {}", id);
        Ok(())
    }

    // Lifecycle operations

    pub async fn clone_repository(&self, id: &str) -> Result<String> {
        let record = self.require(id)?;
        let lock = self.lock(id);
        let _guard = lock.lock().await;
        self.do_clone(&record).await
    }

    pub async fn pull(&self, id: &str, reset: bool) -> Result<String> {
        let record = self.require(id)?;
        let lock = self.lock(id);
        let _guard = lock.lock().await;
        self.do_pull(&record, reset).await
    }

    pub async fn build(&self, id: &str) -> Result<String> {
        let record = self.require(id)?;
        let lock = self.lock(id);
        let _guard = lock.lock().await;
        self.do_build(&record).await
    }

    pub async fn start(&self, id: &str) -> Result<String> {
        let record = self.require(id)?;
        let lock = self.lock(id);
        let _guard = lock.lock().await;
        self.do_start(&record).await
    }

    pub async fn stop(&self, id: &str, timeout: Option<u64>) -> Result<String> {
        let record = self.require(id)?;
        let lock = self.lock(id);
        let _guard = lock.lock().await;
        self.do_stop(&record, timeout).await
    }

    pub async fn restart(&self, id: &str, timeout: Option<u64>) -> Result<String> {
        let record = self.require(id)?;
        let lock = self.lock(id);
        let _guard = lock.lock().await;
        self.do_restart(&record, timeout).await
    }

    pub async fn destroy(&self, id: &str, timeout: Option<u64>) -> Result<String> {
        let record = self.require(id)?;
        let lock = self.lock(id);
        let _guard = lock.lock().await;
        self.do_destroy(&record, timeout).await
    }

    pub async fn reset(&self, id: &str, timeout: Option<u64>) -> Result<String> {
        let record = self.require(id)?;
        let lock = self.lock(id);
        let _guard = lock.lock().await;
        let destroyed = self.do_destroy(&record, timeout).await?;
        let started = self.do_start(&record).await?;
        Ok(destroyed + &started)
    }

    /// Pull, rebuild, and restart; the payload of a webhook job.
    pub async fn update(&self, id: &str) -> Result<String> {
        let record = self.require(id)?;
        let lock = self.lock(id);
        let _guard = lock.lock().await;
        let mut output = self.do_pull(&record, false).await?;
        output += &self.do_build(&record).await?;
        output += &self.do_restart(&record, None).await?;
        Ok(output)
    }

    pub async fn status(&self, id: &str) -> Result<String> {
        let record = self.require(id)?;
        let cmd = self.compose_cmd(&record)?.arg("ps").arg("--quiet");
        self.execute(id, &cmd).await
    }

    pub async fn logs(&self, id: &str, tail: Option<u64>) -> Result<String> {
        let record = self.require(id)?;
        let tail = tail.unwrap_or(DEFAULT_LOG_TAIL);
        let cmd = self
            .compose_cmd(&record)?
            .arg("logs")
            .arg("--no-color")
            .arg("--no-log-prefix")
            .arg("--tail")
            .arg(tail.to_string());
        self.execute(id, &cmd).await
    }

    /// Dispatch used by the job worker.
    pub async fn run_action(&self, id: &str, action: Action, params: &ActionParams) -> Result<String> {
        match action {
            Action::Status => self.status(id).await,
            Action::Logs => self.logs(id, params.tail).await,
            Action::Pull => self.pull(id, params.reset.unwrap_or(false)).await,
            Action::Clone => self.clone_repository(id).await,
            Action::Build => self.build(id).await,
            Action::Start => self.start(id).await,
            Action::Stop => self.stop(id, params.timeout).await,
            Action::Restart => self.restart(id, params.timeout).await,
            Action::Reset => self.reset(id, params.timeout).await,
            Action::Destroy => self.destroy(id, params.timeout).await,
            Action::Update | Action::Webhook => self.update(id).await,
            Action::Info => Err(Error::BadRequest("info cannot be queued".to_string())),
        }
    }

    // Inner operations; callers hold the deployment lock.

    async fn do_clone(&self, record: &DeploymentRecord) -> Result<String> {
        let repository = record
            .repository
            .as_deref()
            .ok_or_else(|| Error::State("repository is not configured".to_string()))?;
        if self.cloned(&record.id) {
            return Err(Error::State("repository already cloned".to_string()));
        }
        let cmd = self
            .git_cmd(&record.id)
            .arg("clone")
            .arg(repository)
            .arg(REPOSITORY_DIR);
        self.execute(&record.id, &cmd).await
    }

    async fn do_pull(&self, record: &DeploymentRecord, reset: bool) -> Result<String> {
        self.require_cloned(&record.id)?;
        if reset {
            let cmd = self
                .git_cmd(&record.id)
                .arg("-C")
                .arg(REPOSITORY_DIR)
                .arg("reset")
                .arg("--hard");
            self.execute(&record.id, &cmd).await?;
        }
        let cmd = self
            .git_cmd(&record.id)
            .arg("-C")
            .arg(REPOSITORY_DIR)
            .arg("pull");
        self.execute(&record.id, &cmd).await
    }

    async fn do_build(&self, record: &DeploymentRecord) -> Result<String> {
        let cmd = self
            .compose_cmd(record)?
            .arg("build")
            .arg("--pull")
            .arg("--force-rm");
        self.execute(&record.id, &cmd).await
    }

    async fn do_start(&self, record: &DeploymentRecord) -> Result<String> {
        let cmd = self
            .compose_cmd(record)?
            .arg("up")
            .arg("--no-color")
            .arg("--detach");
        self.execute(&record.id, &cmd).await
    }

    async fn do_stop(&self, record: &DeploymentRecord, timeout: Option<u64>) -> Result<String> {
        let timeout = timeout.unwrap_or(DEFAULT_STOP_TIMEOUT);
        let cmd = self
            .compose_cmd(record)?
            .arg("down")
            .arg("--remove-orphans")
            .arg("--timeout")
            .arg(timeout.to_string());
        self.execute(&record.id, &cmd).await
    }

    async fn do_restart(&self, record: &DeploymentRecord, timeout: Option<u64>) -> Result<String> {
        let stopped = self.do_stop(record, timeout).await?;
        let started = self.do_start(record).await?;
        Ok(stopped + &started)
    }

    async fn do_destroy(&self, record: &DeploymentRecord, timeout: Option<u64>) -> Result<String> {
        let stopped = self.do_stop(record, timeout).await?;
        let cmd = self.compose_cmd(record)?.arg("down").arg("--volumes");
        let down = self.execute(&record.id, &cmd).await?;
        Ok(stopped + &down)
    }
}
