pub mod alert;
pub mod coerce;
pub mod rewards;
pub mod tip;
pub mod usage_record;

pub use alert::AlertMessage;
pub use rewards::RewardSummary;
pub use tip::Tip;
pub use usage_record::UsageRecord;
