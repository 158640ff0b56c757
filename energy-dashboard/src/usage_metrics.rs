//! Derived usage figures: totals and the predicted next bill.
//!
//! Two projection rules coexist and are kept apart on purpose:
//! - [`Projection::RecentTrend`]: average of the last two readings in fetch
//!   order, shown on the dashboard;
//! - [`Projection::HistoricalAverage`]: average over every reading, shown on
//!   the history page.

use energy_client::domain::UsageRecord;
use serde::Serialize;

pub const DASHBOARD_RATE_PER_UNIT: f64 = 4.0;
pub const HISTORY_RATE_PER_UNIT: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct DerivedMetrics {
    pub total_units: f64,
    pub total_bill: f64,
    pub predicted_bill: i64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Projection {
    RecentTrend { rate_per_unit: f64 },
    HistoricalAverage { rate_per_unit: f64 },
}

impl Projection {
    pub const fn dashboard() -> Self {
        Self::RecentTrend {
            rate_per_unit: DASHBOARD_RATE_PER_UNIT,
        }
    }

    pub const fn history() -> Self {
        Self::HistoricalAverage {
            rate_per_unit: HISTORY_RATE_PER_UNIT,
        }
    }

    /// Projected bill, or `None` when there is not enough history.
    ///
    /// `RecentTrend` needs two readings; `HistoricalAverage` needs one.
    pub fn project(&self, records: &[UsageRecord]) -> Option<i64> {
        match *self {
            Self::RecentTrend { rate_per_unit } => match records {
                [.., previous, last] => {
                    let average = (last.units_consumed + previous.units_consumed) / 2.0;
                    Some(round_to_whole(average * rate_per_unit))
                }
                _ => None,
            },
            Self::HistoricalAverage { rate_per_unit } => {
                if records.is_empty() {
                    return None;
                }
                let average = total_units(records) / records.len() as f64;
                Some(round_to_whole(average * rate_per_unit))
            }
        }
    }
}

fn round_to_whole(value: f64) -> i64 {
    // `as` saturates and maps NaN to 0.
    value.round() as i64
}

pub fn total_units(records: &[UsageRecord]) -> f64 {
    records.iter().map(|r| r.units_consumed).sum()
}

pub fn total_bill(records: &[UsageRecord]) -> f64 {
    records.iter().map(|r| r.bill_amount).sum()
}

/// Dashboard figures for `records` in their current order.
pub fn derive(records: &[UsageRecord], projection: Projection) -> DerivedMetrics {
    if records.is_empty() {
        return DerivedMetrics::default();
    }

    DerivedMetrics {
        total_units: total_units(records),
        total_bill: total_bill(records),
        predicted_bill: projection.project(records).unwrap_or(0),
    }
}
