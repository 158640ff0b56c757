pub mod advisory;
pub mod config;
pub mod dashboard;
pub mod export;
pub mod metrics_server;
pub mod observability;
pub mod request_guard;
pub mod session;
pub mod storage;
pub mod store;
pub mod usage_metrics;
pub mod validation;
pub mod views;

pub use dashboard::{CommandError, Dashboard};
pub use session::{Session, SessionState};
pub use store::{UsageSnapshot, UsageStore};
