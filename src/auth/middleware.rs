use std::sync::Arc;

use axum::{
    Json,
    extract::FromRequestParts,
    http::{StatusCode, header::AUTHORIZATION, request::Parts},
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::server::AppState;

/// Extractor carrying a raw bearer capability token; the handler validates it
/// against its own required action.
pub struct Bearer(pub String);

/// Extractor that requires the static admin password as the bearer credential.
pub struct RequireAdmin;

#[derive(Debug)]
pub enum AuthError {
    MissingAuth,
    InvalidScheme,
    WrongPassword,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AuthError::MissingAuth => (StatusCode::UNAUTHORIZED, "Authentication required"),
            AuthError::InvalidScheme => (StatusCode::UNAUTHORIZED, "Invalid authorization scheme"),
            AuthError::WrongPassword => (StatusCode::UNAUTHORIZED, "Invalid admin credential"),
        };

        let body = json!({ "data": null, "error": message });

        let mut response = (status, Json(body)).into_response();
        response.headers_mut().insert(
            "WWW-Authenticate",
            "Bearer realm=\"dockhand\"".parse().unwrap(),
        );
        response
    }
}

fn bearer_credential(parts: &Parts) -> Result<String, AuthError> {
    let header = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AuthError::MissingAuth)?;

    let credential = header
        .strip_prefix("Bearer ")
        .ok_or(AuthError::InvalidScheme)?;

    if credential.is_empty() {
        return Err(AuthError::MissingAuth);
    }

    Ok(credential.to_string())
}

impl FromRequestParts<Arc<AppState>> for Bearer {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        Ok(Bearer(bearer_credential(parts)?))
    }
}

impl FromRequestParts<Arc<AppState>> for RequireAdmin {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let credential = bearer_credential(parts)?;

        if credential != state.admin_password {
            return Err(AuthError::WrongPassword);
        }

        Ok(RequireAdmin)
    }
}
