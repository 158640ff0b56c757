//! Plain-text renderings of the dashboard pages.

use std::fmt;

use energy_client::domain::{RewardSummary, Tip, UsageRecord};

use crate::store::UsageSnapshot;

const CURRENCY: &str = "₹";
const TIP_ICONS: [&str; 3] = ["⚡", "🍃", "💡"];

#[derive(Debug, Clone)]
pub struct DashboardView {
    pub identity: String,
    pub snapshot: UsageSnapshot,
    pub rewards: Option<RewardSummary>,
    pub tip: Option<Tip>,
    pub alert: Option<String>,
    /// One-off success message, e.g. after submitting a reading.
    pub notice: Option<String>,
    /// Per-widget failures; the rest of the view is still valid.
    pub errors: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct HistoryView {
    pub rows: Vec<UsageRecord>,
    pub predicted_bill: Option<i64>,
    pub error: Option<String>,
}

/// Copy of `records` ordered newest first. Unparseable dates sort last and
/// keep their relative order.
pub fn sorted_newest_first(records: &[UsageRecord]) -> Vec<UsageRecord> {
    let mut keyed: Vec<_> = records.iter().map(|r| (r.reading_time(), r)).collect();
    keyed.sort_by(|a, b| b.0.cmp(&a.0));
    keyed.into_iter().map(|(_, r)| r.clone()).collect()
}

fn format_amount(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        format!("{value:.2}")
    }
}

/// Icon picked from a numeric id; other ids get the first icon.
pub fn tip_icon(tip: &Tip) -> &'static str {
    let n: i64 = tip.id.trim().parse().unwrap_or(0);
    TIP_ICONS[n.rem_euclid(TIP_ICONS.len() as i64) as usize]
}

impl fmt::Display for DashboardView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Energy dashboard for {}", self.identity)?;

        if let Some(notice) = &self.notice {
            writeln!(f, "✅ {notice}")?;
        }
        if let Some(alert) = &self.alert {
            writeln!(f, "⚠  {alert}")?;
        }
        if let Some(tip) = &self.tip {
            writeln!(f, "💡 Energy Tip of the Day: {}", tip.description)?;
        }

        let m = &self.snapshot.metrics;
        writeln!(f)?;
        writeln!(f, "  Total units:     {} kWh", format_amount(m.total_units))?;
        writeln!(f, "  Total bill:      {CURRENCY}{}", format_amount(m.total_bill))?;
        writeln!(f, "  Predicted bill:  {CURRENCY}{}", m.predicted_bill)?;
        match &self.rewards {
            Some(r) => writeln!(f, "  Reward points:   {}", format_amount(r.points))?,
            None => writeln!(f, "  Reward points:   -")?,
        }

        if !self.snapshot.records.is_empty() {
            writeln!(f)?;
            writeln!(f, "  Usage history ({} readings)", self.snapshot.records.len())?;
            for r in self.snapshot.records.iter() {
                writeln!(
                    f,
                    "    {:<12} {:>8} kWh {:>10}",
                    r.date,
                    format_amount(r.units_consumed),
                    format!("{CURRENCY}{}", format_amount(r.bill_amount))
                )?;
            }
        }

        for e in &self.errors {
            writeln!(f, "❌ {e}")?;
        }
        Ok(())
    }
}

impl fmt::Display for HistoryView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "My Energy History")?;
        if let Some(bill) = self.predicted_bill {
            writeln!(f, "Predicted next bill: {CURRENCY}{bill}")?;
        }
        if let Some(e) = &self.error {
            writeln!(f, "❌ {e}")?;
        }

        if self.rows.is_empty() {
            return writeln!(f, "No energy usage history yet.");
        }

        writeln!(f, "{:<12} {:>12} {:>12}  {}", "Date", "Units (kWh)", "Bill", "Record")?;
        for r in &self.rows {
            writeln!(
                f,
                "{:<12} {:>12} {:>12}  {}",
                r.date,
                format_amount(r.units_consumed),
                format!("{CURRENCY}{}", format_amount(r.bill_amount)),
                r.id
            )?;
        }
        Ok(())
    }
}

pub fn render_rewards(rewards: Option<&RewardSummary>) -> String {
    match rewards {
        Some(r) => format!(
            "🎁 My Rewards\n{} points\nKeep tracking your usage to earn more points!",
            format_amount(r.points)
        ),
        None => "🎁 My Rewards\nNo rewards available yet.".to_string(),
    }
}

pub fn render_tips(tips: &[Tip]) -> String {
    if tips.is_empty() {
        return "No tips available at the moment. Check back later!".to_string();
    }

    let mut out = String::from("Energy Saving Tips\n");
    for tip in tips {
        out.push_str(&format!("{} {}\n   {}\n", tip_icon(tip), tip.title, tip.description));
    }
    out
}
