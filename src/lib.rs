//! # Dockhand
//!
//! A small, self-hostable controller for compose deployments that live in
//! git repositories, usable both as a standalone binary and as a library.
//!
//! Each deployment is a directory with its own SSH keypair and, once cloned,
//! a git checkout containing a compose definition. Operators drive the
//! lifecycle (clone, pull, build, start, stop, destroy) over an HTTP API
//! gated by scoped, expiring capability tokens; account-level operations are
//! gated by a static admin password. Webhook-triggered rebuilds run through a
//! durable single-worker job queue.
//!
//! ## Library Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use dockhand::config::ServerConfig;
//! use dockhand::server::{AppState, create_router};
//! use dockhand::store::{SqliteStore, Store};
//!
//! let config = ServerConfig::default();
//! let store = Arc::new(SqliteStore::new(config.db_path()).unwrap());
//! store.initialize().unwrap();
//!
//! let state = Arc::new(AppState::new(store, &config));
//! let router = create_router(state);
//! // Serve with axum...
//! ```

pub mod auth;
pub mod config;
pub mod deploy;
pub mod error;
pub mod queue;
pub mod server;
pub mod store;
pub mod types;
