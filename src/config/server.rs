use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use rand::Rng;

use crate::error::Result;

pub const DEFAULT_ACCESS_TOKEN_TTL: i64 = 60 * 10;
pub const DEFAULT_GENERAL_TOKEN_TTL: i64 = 60 * 60 * 24 * 365;
pub const DEFAULT_COMMAND_TIMEOUT: u64 = 600;

const SECRET_FILE: &str = ".secret";
const SECRET_BYTES: usize = 32;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
    /// Static admin password gating account-level operations.
    pub admin_password: String,
    /// Shared secret signing capability tokens.
    pub secret: String,
    pub access_token_ttl_seconds: i64,
    pub general_token_ttl_seconds: i64,
    pub command_timeout_seconds: u64,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> std::result::Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }

    #[must_use]
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("dockhand.db")
    }

    /// Root under which each deployment gets its own directory.
    #[must_use]
    pub fn deployments_dir(&self) -> PathBuf {
        self.data_dir.join("deployments")
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            data_dir: PathBuf::from("./data"),
            admin_password: String::new(),
            secret: String::new(),
            access_token_ttl_seconds: DEFAULT_ACCESS_TOKEN_TTL,
            general_token_ttl_seconds: DEFAULT_GENERAL_TOKEN_TTL,
            command_timeout_seconds: DEFAULT_COMMAND_TIMEOUT,
        }
    }
}

/// Returns the signing secret: `DOCKHAND_SECRET` if set, otherwise the one
/// persisted under the data directory, generating and persisting a fresh one
/// on first run.
pub fn load_or_create_secret(data_dir: &Path) -> Result<String> {
    if let Ok(secret) = std::env::var("DOCKHAND_SECRET") {
        if !secret.trim().is_empty() {
            return Ok(secret.trim().to_string());
        }
    }

    let secret_file = data_dir.join(SECRET_FILE);
    if secret_file.exists() {
        return Ok(fs::read_to_string(&secret_file)?.trim().to_string());
    }

    let mut bytes = [0u8; SECRET_BYTES];
    rand::thread_rng().fill(&mut bytes);
    let secret = hex::encode(bytes);

    fs::create_dir_all(data_dir)?;
    fs::write(&secret_file, &secret)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Err(e) = fs::set_permissions(&secret_file, fs::Permissions::from_mode(0o600)) {
            tracing::warn!(
                "Failed to set permissions on {}: {e}",
                secret_file.display()
            );
        }
    }

    Ok(secret)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_derive_from_data_dir() {
        let config = ServerConfig {
            data_dir: PathBuf::from("/var/lib/dockhand"),
            ..Default::default()
        };
        assert_eq!(config.db_path(), PathBuf::from("/var/lib/dockhand/dockhand.db"));
        assert_eq!(
            config.deployments_dir(),
            PathBuf::from("/var/lib/dockhand/deployments")
        );
    }

    #[test]
    fn test_secret_is_persisted_across_loads() {
        let dir = tempfile::tempdir().unwrap();
        let first = load_or_create_secret(dir.path()).unwrap();
        let second = load_or_create_secret(dir.path()).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), SECRET_BYTES * 2);
    }
}
