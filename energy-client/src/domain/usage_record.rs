use serde::{Deserialize, Serialize};
use time::{
    format_description::well_known::Rfc3339, macros::format_description, Date, OffsetDateTime,
    PrimitiveDateTime,
};

use super::coerce::{lenient_f64, string_or_number};

/// One historical meter reading as returned by the history endpoint.
///
/// Numeric fields go through [`super::coerce::parse_or_zero`] while being
/// deserialized, so a record never carries `NaN`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageRecord {
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub date: String,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub units_consumed: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub bill_amount: f64,
}

impl UsageRecord {
    /// Best-effort parse of `date` for ordering.
    ///
    /// Accepts `YYYY-MM-DD`, RFC 3339, and `YYYY-MM-DDTHH:MM[:SS]` without an
    /// offset. Offsets are normalized to UTC.
    pub fn reading_time(&self) -> Option<PrimitiveDateTime> {
        let raw = self.date.trim();

        if let Ok(ts) = OffsetDateTime::parse(raw, &Rfc3339) {
            let utc = ts.to_offset(time::UtcOffset::UTC);
            return Some(PrimitiveDateTime::new(utc.date(), utc.time()));
        }
        if let Ok(ts) = PrimitiveDateTime::parse(raw, format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]")) {
            return Some(ts);
        }
        if let Ok(ts) = PrimitiveDateTime::parse(raw, format_description!("[year]-[month]-[day]T[hour]:[minute]")) {
            return Some(ts);
        }
        Date::parse(raw, format_description!("[year]-[month]-[day]"))
            .ok()
            .map(Date::midnight)
    }
}
