use std::fmt;
use std::path::Path;

pub const REPOSITORY_DIR: &str = "repository";
pub const PRIVATE_KEY_NAME: &str = "id_rsa";
pub const PUBLIC_KEY_NAME: &str = "id_rsa.pub";

const COMPOSE_PROGRAM: &str = "docker-compose";
const GIT_PROGRAM: &str = "git";
const KEYGEN_PROGRAM: &str = "ssh-keygen";

/// A rendered command: a program plus discrete argv elements.
///
/// Parameter values are never concatenated into a shell string; each value is
/// exactly one argument, so embedded quotes, spaces, or metacharacters cannot
/// become shell syntax.
#[derive(Debug, Clone)]
pub struct CommandLine {
    pub program: &'static str,
    pub args: Vec<String>,
}

impl CommandLine {
    fn new(program: &'static str) -> Self {
        Self {
            program,
            args: Vec::new(),
        }
    }

    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }
}

impl fmt::Display for CommandLine {
    // For logging only; the executor never passes this through a shell.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Base `docker-compose` invocation for one deployment's project.
#[must_use]
pub fn compose(project_name: &str, project_directory: &Path) -> CommandLine {
    CommandLine::new(COMPOSE_PROGRAM)
        .arg("--ansi")
        .arg("never")
        .arg("--project-name")
        .arg(project_name)
        .arg("--project-directory")
        .arg(project_directory.display().to_string())
}

/// Base `git` invocation using the deployment's SSH key.
#[must_use]
pub fn git(key_path: &Path) -> CommandLine {
    // core.sshCommand is parsed by git itself; the key path is server-derived
    // (root/<hex id>/id_rsa) and contains no user input.
    let ssh_command = format!(
        "ssh -i {} -o IdentitiesOnly=yes -o StrictHostKeyChecking=accept-new",
        key_path.display()
    );
    CommandLine::new(GIT_PROGRAM)
        .arg("-c")
        .arg("pull.rebase=false")
        .arg("-c")
        .arg(format!("core.sshCommand={ssh_command}"))
}

/// `ssh-keygen` invocation creating the deployment's access keypair.
#[must_use]
pub fn keygen(id: &str, key_path: &Path) -> CommandLine {
    CommandLine::new(KEYGEN_PROGRAM)
        .arg("-t")
        .arg("rsa")
        .arg("-b")
        .arg("4096")
        .arg("-f")
        .arg(key_path.display().to_string())
        .arg("-N")
        .arg("")
        .arg("-C")
        .arg(format!("Deployment key for {id}"))
}
