use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::auth::RequireAdmin;
use crate::server::AppState;
use crate::server::dto::{
    AccessTokenResponse, CreateDeploymentResponse, EditDeploymentRequest, PublicKeyResponse,
    TokenPairResponse,
};
use crate::server::response::{ApiError, ApiResponse};
use crate::server::validation::validate_edit_request;
use crate::types::{Action, DeploymentRecord};

pub async fn list_deployments(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let deployments = state.manager.list().map_err(ApiError::from)?;

    let listing: BTreeMap<String, Option<String>> = deployments
        .into_iter()
        .map(|d| (d.id, d.name))
        .collect();

    Ok::<_, ApiError>(Json(ApiResponse::success(listing)))
}

pub async fn create_deployment(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let record = state.manager.create().await.map_err(ApiError::from)?;

    Ok::<_, ApiError>(Json(ApiResponse::success(CreateDeploymentResponse {
        id: record.id,
    })))
}

pub async fn get_deployment(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let record = state.manager.get(&id).map_err(ApiError::from)?;

    Ok::<_, ApiError>(Json(ApiResponse::success(record)))
}

pub async fn get_public_key(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let public_key = state.manager.public_key(&id).map_err(ApiError::from)?;

    Ok::<_, ApiError>(Json(ApiResponse::success(PublicKeyResponse { public_key })))
}

/// Issues a short-lived token covering the full operator action set for one
/// deployment.
pub async fn issue_access_token(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let record = state.manager.get(&id).map_err(ApiError::from)?;

    let token = state
        .authority
        .issue(&record.id, Action::access_set(), state.access_token_ttl)
        .map_err(ApiError::from)?;

    Ok::<_, ApiError>(Json(ApiResponse::success(AccessTokenResponse { token })))
}

/// Issues the long-lived general and webhook tokens for one deployment.
pub async fn issue_tokens(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let record = state.manager.get(&id).map_err(ApiError::from)?;

    let general = state
        .authority
        .issue(&record.id, Action::general_set(), state.general_token_ttl)
        .map_err(ApiError::from)?;
    let webhook = state
        .authority
        .issue(&record.id, &[Action::Webhook], state.general_token_ttl)
        .map_err(ApiError::from)?;

    Ok::<_, ApiError>(Json(ApiResponse::success(TokenPairResponse {
        general,
        webhook,
    })))
}

pub async fn edit_deployment(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(request): Json<EditDeploymentRequest>,
) -> Result<Json<ApiResponse<DeploymentRecord>>, ApiError> {
    validate_edit_request(&request)?;

    let record = state
        .manager
        .edit(&id, request.name, request.directory, request.repository)
        .await
        .map_err(ApiError::from)?;

    Ok(Json(ApiResponse::success(record)))
}

pub async fn delete_deployment(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    state.manager.delete(&id).await.map_err(ApiError::from)?;

    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}
