use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Deserialize)]
pub struct EditDeploymentRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub directory: Option<String>,
    #[serde(default)]
    pub repository: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreateDeploymentResponse {
    pub id: String,
}

#[derive(Debug, Serialize)]
pub struct PublicKeyResponse {
    pub public_key: String,
}

#[derive(Debug, Serialize)]
pub struct AccessTokenResponse {
    pub token: String,
}

/// The two long-lived tokens issued once per deployment.
#[derive(Debug, Serialize)]
pub struct TokenPairResponse {
    pub general: String,
    pub webhook: String,
}
