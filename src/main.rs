use std::fs;
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use dockhand::config::{ServerConfig, load_or_create_secret};
use dockhand::queue::Worker;
use dockhand::server::{AppState, create_router};
use dockhand::store::{SqliteStore, Store};

#[derive(Parser)]
#[command(name = "dockhand")]
#[command(about = "A controller for compose deployments living in git repositories", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the server
    Serve {
        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to
        #[arg(long, short, default_value = "8080")]
        port: u16,

        /// Data directory for the database and deployment directories
        #[arg(long, default_value = "./data")]
        data_dir: String,
    },
}

fn env_seconds<T: std::str::FromStr>(name: &str, default: T) -> anyhow::Result<T> {
    match std::env::var(name) {
        Ok(value) => value
            .parse()
            .map_err(|_| anyhow::anyhow!("{name} must be a number of seconds")),
        Err(_) => Ok(default),
    }
}

fn load_config(host: String, port: u16, data_dir: String) -> anyhow::Result<ServerConfig> {
    let defaults = ServerConfig::default();

    let admin_password = match std::env::var("DOCKHAND_PASSWORD") {
        Ok(password) if !password.trim().is_empty() => password,
        _ => bail!("DOCKHAND_PASSWORD must be set; it gates all account-level operations"),
    };

    let data_dir: std::path::PathBuf = data_dir.into();
    fs::create_dir_all(&data_dir)?;
    let secret = load_or_create_secret(&data_dir).context("could not load signing secret")?;

    Ok(ServerConfig {
        host,
        port,
        data_dir,
        admin_password,
        secret,
        access_token_ttl_seconds: env_seconds(
            "DOCKHAND_ACCESS_TOKEN_VALIDITY",
            defaults.access_token_ttl_seconds,
        )?,
        general_token_ttl_seconds: env_seconds(
            "DOCKHAND_TOKEN_VALIDITY",
            defaults.general_token_ttl_seconds,
        )?,
        command_timeout_seconds: env_seconds(
            "DOCKHAND_COMMAND_TIMEOUT",
            defaults.command_timeout_seconds,
        )?,
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("dockhand=info".parse()?))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            host,
            port,
            data_dir,
        } => {
            let config = load_config(host, port, data_dir)?;

            fs::create_dir_all(config.deployments_dir())?;

            let store = Arc::new(SqliteStore::new(config.db_path())?);
            store.initialize()?;

            let state = Arc::new(AppState::new(store.clone(), &config));

            let worker = Worker::new(store, state.manager.clone(), state.queue.clone());
            tokio::spawn(worker.run());

            let app = create_router(state);
            let addr = config.socket_addr()?;

            info!("Starting server on {}", addr);

            let listener = tokio::net::TcpListener::bind(addr).await?;
            axum::serve(listener, app).await?;
        }
    }

    Ok(())
}
