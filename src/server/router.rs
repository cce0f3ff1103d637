use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::Request;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::{
    Router,
    routing::{delete, get, patch, post},
};

use super::{actions, admin};
use crate::auth::Authority;
use crate::config::ServerConfig;
use crate::deploy::{DeploymentManager, Executor};
use crate::queue::JobQueue;
use crate::store::Store;

pub struct AppState {
    pub store: Arc<dyn Store>,
    pub manager: Arc<DeploymentManager>,
    pub authority: Authority,
    pub queue: Arc<JobQueue>,
    pub admin_password: String,
    pub access_token_ttl: i64,
    pub general_token_ttl: i64,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, config: &ServerConfig) -> Self {
        let executor = Executor::new(Duration::from_secs(config.command_timeout_seconds));
        let manager = Arc::new(DeploymentManager::new(
            store.clone(),
            config.deployments_dir(),
            executor,
        ));
        let queue = Arc::new(JobQueue::new(store.clone()));

        Self {
            store,
            manager,
            authority: Authority::new(config.secret.as_bytes()),
            queue,
            admin_password: config.admin_password.clone(),
            access_token_ttl: config.access_token_ttl_seconds,
            general_token_ttl: config.general_token_ttl_seconds,
        }
    }
}

async fn health() -> &'static str {
    "OK"
}

async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    let response = next.run(request).await;

    let latency = start.elapsed();
    let status = response.status();

    tracing::info!(
        "{} {} {} {}ms",
        method,
        uri.path(),
        status.as_u16(),
        latency.as_millis()
    );

    response
}

fn admin_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/deployments", get(admin::list_deployments))
        .route("/deployments", post(admin::create_deployment))
        .route("/deployments/{id}", get(admin::get_deployment))
        .route("/deployments/{id}", patch(admin::edit_deployment))
        .route("/deployments/{id}", delete(admin::delete_deployment))
        .route("/deployments/{id}/key", get(admin::get_public_key))
        .route("/deployments/{id}/access", post(admin::issue_access_token))
        .route("/deployments/{id}/tokens", post(admin::issue_tokens))
}

fn actions_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/info", post(actions::info))
        .route("/status", post(actions::status))
        .route("/logs", post(actions::logs))
        .route("/pull", post(actions::pull))
        .route("/clone", post(actions::clone))
        .route("/build", post(actions::build))
        .route("/start", post(actions::start))
        .route("/stop", post(actions::stop))
        .route("/restart", post(actions::restart))
        .route("/reset", post(actions::reset))
        .route("/destroy", post(actions::destroy))
        .route("/update", post(actions::update))
        .route("/webhook", post(actions::webhook))
}

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api/admin", admin_router())
        .nest("/api", actions_router())
        .layer(middleware::from_fn(log_request))
        .with_state(state)
}
