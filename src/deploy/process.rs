use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tokio::time::timeout;
use tracing::debug;

use super::command::CommandLine;
use crate::error::{Error, Result};

pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(600);

/// Executor runs rendered commands as child processes, capturing output.
#[derive(Debug, Clone)]
pub struct Executor {
    timeout: Duration,
}

impl Default for Executor {
    fn default() -> Self {
        Self::new(DEFAULT_COMMAND_TIMEOUT)
    }
}

impl Executor {
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Runs a command with `cwd` as working directory.
    ///
    /// Exit 0 returns captured stdout; a non-zero exit fails with the captured
    /// stderr; exceeding the wall-clock bound kills the child and fails.
    pub async fn run(&self, command: &CommandLine, cwd: &Path) -> Result<String> {
        debug!("executing in {}: {}", cwd.display(), command);

        let mut cmd = Command::new(command.program);
        cmd.args(&command.args)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = match timeout(self.timeout, cmd.output()).await {
            Err(_) => {
                return Err(Error::Timeout {
                    seconds: self.timeout.as_secs(),
                });
            }
            Ok(result) => result?,
        };

        if !output.status.success() {
            return Err(Error::Execution {
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deploy::command::CommandLine;

    fn sh(script: &str) -> CommandLine {
        CommandLine {
            program: "sh",
            args: vec!["-c".to_string(), script.to_string()],
        }
    }

    #[tokio::test]
    async fn test_run_captures_stdout() {
        let executor = Executor::default();
        let out = executor
            .run(&sh("printf hello"), Path::new("."))
            .await
            .unwrap();
        assert_eq!(out, "hello");
    }

    #[tokio::test]
    async fn test_nonzero_exit_carries_stderr() {
        let executor = Executor::default();
        let err = executor
            .run(&sh("printf nope >&2; exit 3"), Path::new("."))
            .await
            .unwrap_err();
        match err {
            Error::Execution { stderr } => assert_eq!(stderr, "nope"),
            other => panic!("expected execution error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_working_directory_is_applied() {
        let dir = tempfile::tempdir().unwrap();
        let executor = Executor::default();
        let out = executor.run(&sh("pwd"), dir.path()).await.unwrap();
        let reported = std::fs::canonicalize(out.trim()).unwrap();
        assert_eq!(reported, std::fs::canonicalize(dir.path()).unwrap());
    }

    #[tokio::test]
    async fn test_timeout_kills_long_command() {
        let executor = Executor::new(Duration::from_millis(100));
        let err = executor
            .run(&sh("sleep 5"), Path::new("."))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Timeout { .. }));
    }

    #[tokio::test]
    async fn test_missing_program_is_io_error() {
        let executor = Executor::default();
        let cmd = CommandLine {
            program: "definitely-not-a-real-binary",
            args: vec![],
        };
        let err = executor.run(&cmd, Path::new(".")).await.unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
