use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode};

use crate::auth::Bearer;
use crate::server::AppState;
use crate::server::response::{ApiError, ApiResponse};
use crate::types::{Action, ActionParams, DeploymentRecord};

// Operational handlers: the capability token names the deployment, so none of
// these take a path parameter. Each route validates the bearer token for its
// own action.

fn params(body: Option<Json<ActionParams>>) -> ActionParams {
    body.map(|Json(p)| p).unwrap_or_default()
}

fn authorize(state: &AppState, token: &str, action: Action) -> Result<String, ApiError> {
    let id = state.authority.validate(token, action)?;
    // The subject must still resolve to a live record; tokens outlive
    // deployments.
    state.manager.get(&id)?;
    Ok(id)
}

pub async fn info(
    State(state): State<Arc<AppState>>,
    Bearer(token): Bearer,
) -> Result<Json<ApiResponse<DeploymentRecord>>, ApiError> {
    let id = authorize(&state, &token, Action::Info)?;
    let record = state.manager.get(&id)?;
    Ok(Json(ApiResponse::success(record)))
}

pub async fn status(
    State(state): State<Arc<AppState>>,
    Bearer(token): Bearer,
) -> Result<Json<ApiResponse<String>>, ApiError> {
    let id = authorize(&state, &token, Action::Status)?;
    let output = state.manager.status(&id).await?;
    Ok(Json(ApiResponse::success(output)))
}

pub async fn logs(
    State(state): State<Arc<AppState>>,
    Bearer(token): Bearer,
    body: Option<Json<ActionParams>>,
) -> Result<Json<ApiResponse<String>>, ApiError> {
    let id = authorize(&state, &token, Action::Logs)?;
    let output = state.manager.logs(&id, params(body).tail).await?;
    Ok(Json(ApiResponse::success(output)))
}

pub async fn pull(
    State(state): State<Arc<AppState>>,
    Bearer(token): Bearer,
    body: Option<Json<ActionParams>>,
) -> Result<Json<ApiResponse<String>>, ApiError> {
    let id = authorize(&state, &token, Action::Pull)?;
    let reset = params(body).reset.unwrap_or(false);
    let output = state.manager.pull(&id, reset).await?;
    Ok(Json(ApiResponse::success(output)))
}

pub async fn clone(
    State(state): State<Arc<AppState>>,
    Bearer(token): Bearer,
) -> Result<Json<ApiResponse<String>>, ApiError> {
    let id = authorize(&state, &token, Action::Clone)?;
    let output = state.manager.clone_repository(&id).await?;
    Ok(Json(ApiResponse::success(output)))
}

pub async fn build(
    State(state): State<Arc<AppState>>,
    Bearer(token): Bearer,
) -> Result<Json<ApiResponse<String>>, ApiError> {
    let id = authorize(&state, &token, Action::Build)?;
    let output = state.manager.build(&id).await?;
    Ok(Json(ApiResponse::success(output)))
}

pub async fn start(
    State(state): State<Arc<AppState>>,
    Bearer(token): Bearer,
) -> Result<Json<ApiResponse<String>>, ApiError> {
    let id = authorize(&state, &token, Action::Start)?;
    let output = state.manager.start(&id).await?;
    Ok(Json(ApiResponse::success(output)))
}

pub async fn stop(
    State(state): State<Arc<AppState>>,
    Bearer(token): Bearer,
    body: Option<Json<ActionParams>>,
) -> Result<Json<ApiResponse<String>>, ApiError> {
    let id = authorize(&state, &token, Action::Stop)?;
    let output = state.manager.stop(&id, params(body).timeout).await?;
    Ok(Json(ApiResponse::success(output)))
}

pub async fn restart(
    State(state): State<Arc<AppState>>,
    Bearer(token): Bearer,
    body: Option<Json<ActionParams>>,
) -> Result<Json<ApiResponse<String>>, ApiError> {
    let id = authorize(&state, &token, Action::Restart)?;
    let output = state.manager.restart(&id, params(body).timeout).await?;
    Ok(Json(ApiResponse::success(output)))
}

pub async fn reset(
    State(state): State<Arc<AppState>>,
    Bearer(token): Bearer,
    body: Option<Json<ActionParams>>,
) -> Result<Json<ApiResponse<String>>, ApiError> {
    let id = authorize(&state, &token, Action::Reset)?;
    let output = state.manager.reset(&id, params(body).timeout).await?;
    Ok(Json(ApiResponse::success(output)))
}

pub async fn destroy(
    State(state): State<Arc<AppState>>,
    Bearer(token): Bearer,
    body: Option<Json<ActionParams>>,
) -> Result<Json<ApiResponse<String>>, ApiError> {
    let id = authorize(&state, &token, Action::Destroy)?;
    let output = state.manager.destroy(&id, params(body).timeout).await?;
    Ok(Json(ApiResponse::success(output)))
}

pub async fn update(
    State(state): State<Arc<AppState>>,
    Bearer(token): Bearer,
) -> Result<Json<ApiResponse<String>>, ApiError> {
    let id = authorize(&state, &token, Action::Update)?;
    let output = state.manager.update(&id).await?;
    Ok(Json(ApiResponse::success(output)))
}

/// Accepts a webhook call by enqueueing an update job; returns immediately
/// with no body. The caller polls nothing — a failed update is only recorded
/// in the job's result.
pub async fn webhook(
    State(state): State<Arc<AppState>>,
    Bearer(token): Bearer,
) -> Result<StatusCode, ApiError> {
    let id = authorize(&state, &token, Action::Webhook)?;
    state
        .queue
        .submit(&id, Action::Update, ActionParams::default())?;
    Ok(StatusCode::ACCEPTED)
}
