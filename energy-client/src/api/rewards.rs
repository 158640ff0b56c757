use super::{ApiClient, ApiError};
use crate::domain::RewardSummary;

/// `GET /api/rewards`.
pub async fn load_rewards(client: &ApiClient) -> Result<RewardSummary, ApiError> {
    client.get_json(&["api", "rewards"]).await
}
