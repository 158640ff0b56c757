use reqwest::Method;

use super::{ApiClient, ApiError};

/// `GET /api/bill/download/{id}`: raw bill document bytes (PDF).
pub async fn download_bill(client: &ApiClient, record_id: &str) -> Result<Vec<u8>, ApiError> {
    let url = client.endpoint(&["api", "bill", "download", record_id])?;
    let resp = client.send(Method::GET, url, None::<&()>).await?;
    let bytes = resp
        .bytes()
        .await
        .map_err(|e| ApiError::Decode(format!("failed to read bill body: {e}")))?;

    tracing::info!(record_id, bytes = bytes.len(), "bill downloaded");
    Ok(bytes.to_vec())
}
