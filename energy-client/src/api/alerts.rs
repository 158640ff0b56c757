use super::{ApiClient, ApiError};
use crate::domain::AlertMessage;

/// `GET /api/alerts/{email}`. The email is trimmed and sent as a single
/// encoded path segment.
pub async fn fetch_alert(client: &ApiClient, email: &str) -> Result<AlertMessage, ApiError> {
    let body = client.get_text(&["api", "alerts", email.trim()]).await?;
    Ok(AlertMessage::from_body(&body))
}
