use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::coerce::parse_or_zero;

/// Server-computed reward points. Never derived client-side.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct RewardSummary {
    pub points: f64,
}

// The rewards endpoint answers with either a bare number or `{"points": n}`.
impl<'de> Deserialize<'de> for RewardSummary {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        let points = match &value {
            Value::Object(map) => map.get("points").map(parse_or_zero).unwrap_or(0.0),
            other => parse_or_zero(other),
        };
        Ok(Self { points })
    }
}
