use serde::{Deserialize, Serialize};

use super::{ApiClient, ApiError};

#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    /// Both fields are trimmed before anything is sent.
    pub fn new(email: &str, password: &str) -> Self {
        Self {
            email: email.trim().to_string(),
            password: password.trim().to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// `POST /api/auth/login`.
pub async fn login(client: &ApiClient, credentials: &Credentials) -> Result<LoginResponse, ApiError> {
    let body = client.post_value(&["api", "auth", "login"], credentials).await?;
    let resp: LoginResponse =
        serde_json::from_value(body).map_err(|e| ApiError::Decode(format!("login response: {e}")))?;

    tracing::info!(email = %credentials.email, "login accepted");
    Ok(resp)
}

/// `POST /api/auth/register`. The response body is passed through untouched.
pub async fn register(client: &ApiClient, credentials: &Credentials) -> Result<serde_json::Value, ApiError> {
    let body = client.post_value(&["api", "auth", "register"], credentials).await?;
    tracing::info!(email = %credentials.email, "registration accepted");
    Ok(body)
}
