use serde::Serialize;

use super::{ApiClient, ApiError};
use crate::domain::UsageRecord;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct SubmitUsage {
    units_consumed: f64,
}

/// Fetch the caller's usage history in the order the server returns it.
///
/// The order matters: the dashboard projection reads the last two entries.
pub async fn load_history(client: &ApiClient) -> Result<Vec<UsageRecord>, ApiError> {
    let records: Vec<UsageRecord> = client.get_json(&["api", "energy", "history"]).await?;
    tracing::debug!(records = records.len(), "history loaded");
    Ok(records)
}

/// Submit a new meter reading in kWh.
pub async fn submit_units(client: &ApiClient, units_consumed: f64) -> Result<(), ApiError> {
    client
        .post_value(&["api", "energy", "submit"], &SubmitUsage { units_consumed })
        .await?;
    tracing::info!(units_consumed, "usage submitted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::{extract::State, routing::{get, post}, Json, Router};
    use serde_json::{json, Value};

    use super::*;
    use crate::api::test_support::{client, serve};

    #[tokio::test]
    async fn history_keeps_server_order_and_coerces() {
        let app = Router::new().route(
            "/api/energy/history",
            get(|| async {
                Json(json!([
                    {"id": 2, "date": "2024-02-01", "unitsConsumed": "140", "billAmount": 560},
                    {"id": 1, "date": "2024-01-01", "unitsConsumed": 100, "billAmount": "n/a"}
                ]))
            }),
        );
        let base = serve(app).await;
        let (c, _) = client(&base, Some("t"));

        let records = load_history(&c).await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, "2");
        assert_eq!(records[0].units_consumed, 140.0);
        assert_eq!(records[1].bill_amount, 0.0);
    }

    #[tokio::test]
    async fn submit_posts_camel_case_body() {
        let seen: Arc<Mutex<Option<Value>>> = Arc::new(Mutex::new(None));
        let app = Router::new()
            .route(
                "/api/energy/submit",
                post(|State(seen): State<Arc<Mutex<Option<Value>>>>, Json(body): Json<Value>| async move {
                    *seen.lock().unwrap() = Some(body);
                }),
            )
            .with_state(seen.clone());
        let base = serve(app).await;
        let (c, _) = client(&base, Some("t"));

        submit_units(&c, 120.5).await.unwrap();
        assert_eq!(seen.lock().unwrap().clone(), Some(json!({"unitsConsumed": 120.5})));
    }
}
