//! Thin HTTP client for the energy tracker REST API.
//!
//! Every request goes through [`ApiClient::send`], which attaches the current
//! bearer token and classifies the response status. A 401 invokes the single
//! [`AuthInvalidHandler`] registered at construction; a 403 is returned as
//! [`ApiError::Forbidden`] for the caller to turn into a placeholder.

pub mod alerts;
pub mod auth;
pub mod bills;
pub mod rewards;
pub mod tips;
pub mod usage;

use std::{sync::Arc, time::Duration};

use reqwest::{Method, Response, StatusCode, Url};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

pub use auth::{Credentials, LoginResponse};

/// Supplies the bearer token to attach to outgoing requests, if any.
pub trait CredentialSource: Send + Sync {
    fn bearer_token(&self) -> Option<String>;
}

/// Invoked once for every response that comes back 401.
pub type AuthInvalidHandler = Arc<dyn Fn() + Send + Sync>;

#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("authentication rejected by server")]
    Unauthorized,
    #[error("access denied")]
    Forbidden,
    #[error("request failed with status {status}: {message}")]
    Status { status: u16, message: String },
    #[error("network error: {0}")]
    Network(String),
    #[error("invalid response: {0}")]
    Decode(String),
    #[error("invalid url: {0}")]
    InvalidUrl(String),
}

impl ApiError {
    /// Short message suitable for showing to the user.
    pub fn user_message(&self) -> String {
        match self {
            Self::Status { message, .. } if !message.is_empty() => message.clone(),
            Self::Status { status, .. } => format!("Request failed ({status})"),
            Self::Unauthorized => "Your session has expired, please log in again".to_string(),
            Self::Forbidden => "You do not have access to this resource".to_string(),
            Self::Network(_) => "Could not reach the server".to_string(),
            Self::Decode(_) => "Unexpected response from the server".to_string(),
            Self::InvalidUrl(_) => "Invalid API address".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    /// `None` waits indefinitely.
    pub timeout: Option<Duration>,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    credentials: Arc<dyn CredentialSource>,
    on_auth_invalid: AuthInvalidHandler,
}

impl ApiClient {
    pub fn new(
        config: &ApiConfig,
        credentials: Arc<dyn CredentialSource>,
        on_auth_invalid: AuthInvalidHandler,
    ) -> Result<Self, ApiError> {
        let base_url = Url::parse(config.base_url.trim())
            .map_err(|e| ApiError::InvalidUrl(format!("{}: {e}", config.base_url)))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::InvalidUrl(format!("{base_url} cannot be used as a base")));
        }

        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|e| ApiError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url,
            credentials,
            on_auth_invalid,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Join path segments onto the base URL, percent-encoding each one.
    pub(crate) fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    pub(crate) async fn send<B>(&self, method: Method, url: Url, body: Option<&B>) -> Result<Response, ApiError>
    where
        B: Serialize + ?Sized,
    {
        metrics::counter!("api_requests_total").increment(1);

        let mut req = self.http.request(method.clone(), url.clone());
        if let Some(token) = self.credentials.bearer_token() {
            req = req.bearer_auth(token);
        }
        if let Some(b) = body {
            req = req.json(b);
        }

        let resp = req.send().await.map_err(|e| {
            metrics::counter!("api_request_failures_total").increment(1);
            tracing::warn!(error = %e, %method, path = url.path(), "request failed before a response arrived");
            ApiError::Network(e.to_string())
        })?;

        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }

        match status {
            StatusCode::UNAUTHORIZED => {
                metrics::counter!("api_unauthorized_total").increment(1);
                tracing::warn!(%method, path = url.path(), "credential rejected, signalling logout");
                (self.on_auth_invalid)();
                Err(ApiError::Unauthorized)
            }
            StatusCode::FORBIDDEN => {
                metrics::counter!("api_forbidden_total").increment(1);
                tracing::debug!(%method, path = url.path(), "request forbidden");
                Err(ApiError::Forbidden)
            }
            _ => {
                metrics::counter!("api_request_failures_total").increment(1);
                let text = resp.text().await.unwrap_or_default();
                let message = serde_json::from_str::<ErrorBody>(&text)
                    .map(|b| b.message)
                    .unwrap_or_else(|_| text.trim().to_string());
                tracing::warn!(status = status.as_u16(), %method, path = url.path(), "request rejected");
                Err(ApiError::Status {
                    status: status.as_u16(),
                    message,
                })
            }
        }
    }

    pub(crate) async fn get_json<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, ApiError> {
        let url = self.endpoint(segments)?;
        let resp = self.send(Method::GET, url, None::<&()>).await?;
        decode_json(resp).await
    }

    pub(crate) async fn get_text(&self, segments: &[&str]) -> Result<String, ApiError> {
        let url = self.endpoint(segments)?;
        let resp = self.send(Method::GET, url, None::<&()>).await?;
        resp.text()
            .await
            .map_err(|e| ApiError::Decode(format!("failed to read body: {e}")))
    }

    /// POST a JSON body. Empty or non-JSON success bodies are tolerated.
    pub(crate) async fn post_value<B>(&self, segments: &[&str], body: &B) -> Result<serde_json::Value, ApiError>
    where
        B: Serialize + ?Sized,
    {
        let url = self.endpoint(segments)?;
        let resp = self.send(Method::POST, url, Some(body)).await?;
        let text = resp
            .text()
            .await
            .map_err(|e| ApiError::Decode(format!("failed to read body: {e}")))?;

        if text.trim().is_empty() {
            return Ok(serde_json::Value::Null);
        }
        Ok(serde_json::from_str(&text).unwrap_or(serde_json::Value::String(text)))
    }
}

async fn decode_json<T: DeserializeOwned>(resp: Response) -> Result<T, ApiError> {
    let bytes = resp
        .bytes()
        .await
        .map_err(|e| ApiError::Decode(format!("failed to read body: {e}")))?;
    serde_json::from_slice(&bytes).map_err(|e| ApiError::Decode(e.to_string()))
}


#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use axum::{http::HeaderMap, http::StatusCode as AxumStatus, routing::get, Json, Router};
    use serde_json::json;

    use super::test_support::{client, serve};
    use super::*;

    #[test]
    fn endpoint_encodes_segments() {
        let (c, _) = client("http://localhost:8080", None);
        let url = c.endpoint(&["api", "alerts", "a b@example.com"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/api/alerts/a%20b@example.com");

        let (c, _) = client("http://localhost:8080/prefix/", None);
        let url = c.endpoint(&["api", "tips"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/prefix/api/tips");
    }

    #[test]
    fn rejects_non_base_urls() {
        let res = ApiClient::new(
            &ApiConfig {
                base_url: "mailto:someone@example.com".to_string(),
                timeout: None,
            },
            Arc::new(test_support::FixedToken(std::sync::Mutex::new(None))),
            Arc::new(|| {}),
        );
        assert!(matches!(res, Err(ApiError::InvalidUrl(_))));
    }

    #[tokio::test]
    async fn attaches_bearer_token_when_present() {
        let app = Router::new().route(
            "/echo",
            get(|headers: HeaderMap| async move {
                let auth = headers
                    .get("authorization")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("")
                    .to_string();
                Json(json!({ "auth": auth }))
            }),
        );
        let base = serve(app).await;

        let (with_token, _) = client(&base, Some("tok-123"));
        let body: serde_json::Value = with_token.get_json(&["echo"]).await.unwrap();
        assert_eq!(body["auth"], "Bearer tok-123");

        let (anonymous, _) = client(&base, None);
        let body: serde_json::Value = anonymous.get_json(&["echo"]).await.unwrap();
        assert_eq!(body["auth"], "");
    }

    #[tokio::test]
    async fn unauthorized_fires_handler_once_and_forbidden_never() {
        let app = Router::new()
            .route("/expired", get(|| async { AxumStatus::UNAUTHORIZED }))
            .route("/denied", get(|| async { AxumStatus::FORBIDDEN }));
        let base = serve(app).await;
        let (c, fired) = client(&base, Some("stale"));

        let res = c.get_text(&["denied"]).await;
        assert!(matches!(res, Err(ApiError::Forbidden)));
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        let res = c.get_text(&["expired"]).await;
        assert!(matches!(res, Err(ApiError::Unauthorized)));
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn error_body_message_is_surfaced() {
        let app = Router::new().route(
            "/broken",
            get(|| async { (AxumStatus::BAD_REQUEST, Json(json!({"message": "Email already registered"}))) }),
        );
        let base = serve(app).await;
        let (c, fired) = client(&base, None);

        let err = c.get_text(&["broken"]).await.unwrap_err();
        assert_eq!(err.user_message(), "Email already registered");
        assert!(matches!(err, ApiError::Status { status: 400, .. }));
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }
}
