pub mod command;
mod manager;
mod process;

pub use command::{CommandLine, PUBLIC_KEY_NAME, REPOSITORY_DIR};
pub use manager::{DeploymentManager, generate_id, validate_directory};
pub use process::{DEFAULT_COMMAND_TIMEOUT, Executor};
