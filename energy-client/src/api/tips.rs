use super::{ApiClient, ApiError};
use crate::domain::Tip;

/// `GET /api/tips`.
pub async fn load_tips(client: &ApiClient) -> Result<Vec<Tip>, ApiError> {
    client.get_json(&["api", "tips"]).await
}

/// `GET /api/tips/today`.
pub async fn tip_of_the_day(client: &ApiClient) -> Result<Tip, ApiError> {
    client.get_json(&["api", "tips", "today"]).await
}
