//! Server-computed advisories: the per-user alert banner and energy tips.
//!
//! Fetch failures never escape this module. A forbidden alert fetch becomes
//! [`NO_ALERTS_PLACEHOLDER`], anything else becomes
//! [`ALERT_FAILED_PLACEHOLDER`], and tip failures become an empty result.

use std::sync::atomic::{AtomicBool, Ordering};

use energy_client::{
    api::{alerts, tips},
    domain::{AlertMessage, Tip},
    ApiClient, ApiError,
};
use tokio::sync::{Mutex, OnceCell};

use crate::request_guard::RequestGeneration;

pub const NO_ALERTS_PLACEHOLDER: &str = "No alerts at the moment.";
pub const ALERT_FAILED_PLACEHOLDER: &str = "Failed to load alerts.";

#[async_trait::async_trait]
pub trait AdvisorySource: Send + Sync {
    async fn alert_for(&self, email: &str) -> Result<AlertMessage, ApiError>;
    async fn tips(&self) -> Result<Vec<Tip>, ApiError>;
    async fn tip_of_the_day(&self) -> Result<Tip, ApiError>;
}

#[async_trait::async_trait]
impl AdvisorySource for ApiClient {
    async fn alert_for(&self, email: &str) -> Result<AlertMessage, ApiError> {
        alerts::fetch_alert(self, email).await
    }

    async fn tips(&self) -> Result<Vec<Tip>, ApiError> {
        tips::load_tips(self).await
    }

    async fn tip_of_the_day(&self) -> Result<Tip, ApiError> {
        tips::tip_of_the_day(self).await
    }
}

/// Map an alert fetch result onto the text the banner shows.
pub fn alert_text(result: Result<AlertMessage, ApiError>) -> String {
    match result {
        Ok(msg) => msg.0,
        Err(ApiError::Forbidden) => NO_ALERTS_PLACEHOLDER.to_string(),
        Err(e) => {
            tracing::warn!(error = %e, "alert fetch failed");
            ALERT_FAILED_PLACEHOLDER.to_string()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    Applied,
    /// A newer refresh started before this one finished; its result was dropped.
    Superseded,
    /// No identity to fetch for; the banner was cleared.
    Skipped,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct BannerState {
    message: Option<String>,
    dismissed: bool,
}

/// Single alert message for the current identity.
#[derive(Default)]
pub struct AlertBanner {
    state: Mutex<BannerState>,
    requests: RequestGeneration,
}

impl AlertBanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch the alert for `identity`. Applying a result resets dismissal.
    pub async fn refresh(&self, source: &dyn AdvisorySource, identity: Option<&str>) -> RefreshOutcome {
        let ticket = self.requests.begin();

        let Some(email) = identity.map(str::trim).filter(|e| !e.is_empty()) else {
            tracing::warn!("no identity for alert fetch, clearing banner");
            let mut state = self.state.lock().await;
            if ticket.is_current() {
                *state = BannerState::default();
            }
            return RefreshOutcome::Skipped;
        };

        let Some(result) = ticket.run(source.alert_for(email)).await else {
            metrics::counter!("alert_stale_responses_total").increment(1);
            return RefreshOutcome::Superseded;
        };
        let text = alert_text(result);

        let mut state = self.state.lock().await;
        if !ticket.is_current() {
            metrics::counter!("alert_stale_responses_total").increment(1);
            tracing::debug!(generation = ticket.generation(), "dropping stale alert response");
            return RefreshOutcome::Superseded;
        }

        *state = BannerState {
            message: Some(text),
            dismissed: false,
        };
        RefreshOutcome::Applied
    }

    pub async fn dismiss(&self) {
        self.state.lock().await.dismissed = true;
    }

    /// Text to display, if any. Empty messages and dismissed banners show nothing.
    pub async fn visible(&self) -> Option<String> {
        let state = self.state.lock().await;
        if state.dismissed {
            return None;
        }
        state.message.clone().filter(|m| !m.trim().is_empty())
    }

    /// Drop any in-flight fetch and clear the banner, e.g. after logout.
    pub async fn reset(&self) {
        self.requests.invalidate();
        *self.state.lock().await = BannerState::default();
    }
}

/// Tip-of-the-day banner: fetched at most once per process, and once
/// dismissed it stays dismissed until the process exits.
#[derive(Default)]
pub struct TipBanner {
    tip: OnceCell<Option<Tip>>,
    dismissed: AtomicBool,
}

impl TipBanner {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn current(&self, source: &dyn AdvisorySource) -> Option<Tip> {
        if self.dismissed.load(Ordering::SeqCst) {
            return None;
        }

        self.tip
            .get_or_init(|| async {
                match source.tip_of_the_day().await {
                    Ok(tip) => Some(tip),
                    Err(e) => {
                        tracing::debug!(error = %e, "tip of the day unavailable");
                        None
                    }
                }
            })
            .await
            .clone()
    }

    pub fn dismiss(&self) {
        self.dismissed.store(true, Ordering::SeqCst);
    }
}

/// Every tip, or an empty list if the fetch fails for any reason.
pub async fn tips_or_empty(source: &dyn AdvisorySource) -> Vec<Tip> {
    match source.tips().await {
        Ok(tips) => tips,
        Err(e) => {
            tracing::warn!(error = %e, "tips unavailable");
            Vec::new()
        }
    }
}
