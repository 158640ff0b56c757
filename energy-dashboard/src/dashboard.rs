//! The application context every command runs against.
//!
//! Owns the session, the API client wired to it, the usage store and the
//! advisory banners. Each widget loads independently: a failure degrades that
//! widget to a placeholder and is reported as a short message, while the rest
//! of the view still renders.

use std::sync::Arc;

use energy_client::{
    api::{auth, bills, rewards, usage, Credentials},
    domain::{RewardSummary, Tip, UsageRecord},
    ApiClient, ApiError,
};

use crate::{
    advisory::{tips_or_empty, AlertBanner, TipBanner},
    config::{AppConfig, ProjectionConfig},
    request_guard::RequestGeneration,
    session::Session,
    storage::KeyValueStore,
    store::UsageStore,
    usage_metrics::Projection,
    validation::{self, ValidationError},
    views::{sorted_newest_first, DashboardView, HistoryView},
};

pub const SUBMITTED_MESSAGE: &str = "Units submitted successfully!";
pub const REGISTERED_MESSAGE: &str = "Registration successful. Please log in.";

#[derive(thiserror::Error, Debug)]
pub enum CommandError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("not logged in")]
    NotLoggedIn,
    /// The server rejected the credential while the command was running.
    #[error("session expired")]
    SessionExpired,
}

impl CommandError {
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(e) => e.to_string(),
            Self::Api(e) => e.user_message(),
            Self::NotLoggedIn => "Please log in first".to_string(),
            Self::SessionExpired => "Your session has expired, please log in again".to_string(),
        }
    }
}

/// Outcome of a history fetch that may have been superseded.
enum HistoryFetch {
    Applied,
    Failed(ApiError),
    Superseded,
}

pub struct Dashboard {
    session: Arc<Session>,
    client: ApiClient,
    usage: UsageStore,
    history_projection: Projection,
    history_requests: RequestGeneration,
    alert: AlertBanner,
    tip: TipBanner,
}

impl Dashboard {
    /// Rehydrate the session from `store` and build a client bound to it.
    pub fn new(config: &AppConfig, store: Arc<dyn KeyValueStore>) -> Result<Self, ApiError> {
        let session = Arc::new(Session::restore(store));
        let client = ApiClient::new(
            &config.api.client_config(),
            session.clone(),
            session.auth_invalid_handler(),
        )?;
        Ok(Self::from_parts(session, client, &config.projection))
    }

    pub fn from_parts(session: Arc<Session>, client: ApiClient, projection: &ProjectionConfig) -> Self {
        Self {
            session,
            client,
            usage: UsageStore::new(Projection::RecentTrend {
                rate_per_unit: projection.dashboard_rate_per_unit,
            }),
            history_projection: Projection::HistoricalAverage {
                rate_per_unit: projection.history_rate_per_unit,
            },
            history_requests: RequestGeneration::new(),
            alert: AlertBanner::new(),
            tip: TipBanner::new(),
        }
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub fn usage(&self) -> &UsageStore {
        &self.usage
    }

    pub fn alert(&self) -> &AlertBanner {
        &self.alert
    }

    pub fn tip(&self) -> &TipBanner {
        &self.tip
    }

    fn require_login(&self) -> Result<String, CommandError> {
        self.session
            .state()
            .identity()
            .map(str::to_string)
            .ok_or(CommandError::NotLoggedIn)
    }

    /// Register a new account. Does not log in.
    pub async fn register(&self, email: &str, password: &str) -> Result<&'static str, CommandError> {
        validation::validate_credentials(email, password)?;
        auth::register(&self.client, &Credentials::new(email, password)).await?;
        Ok(REGISTERED_MESSAGE)
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<(), CommandError> {
        validation::validate_credentials(email, password)?;
        let credentials = Credentials::new(email, password);
        let resp = auth::login(&self.client, &credentials).await?;
        self.session.login(&resp.token, &credentials.email);
        Ok(())
    }

    /// Explicit logout. Also drops in-flight fetches and cached data.
    pub async fn logout(&self) {
        self.session.logout();
        self.discard_cached().await;
    }

    async fn discard_cached(&self) {
        self.history_requests.invalidate();
        self.usage.clear();
        self.alert.reset().await;
    }

    /// Fails if a 401 emptied the session while the command was running.
    /// Anything fetched for the old session is dropped first.
    async fn ensure_still_authenticated(&self) -> Result<(), CommandError> {
        if self.session.state().is_authenticated() {
            return Ok(());
        }
        tracing::info!("session cleared mid-command, discarding fetched data");
        self.discard_cached().await;
        Err(CommandError::SessionExpired)
    }

    async fn fetch_history(&self) -> HistoryFetch {
        let ticket = self.history_requests.begin();
        let result = match ticket.run(usage::load_history(&self.client)).await {
            Some(result) => result,
            None => return HistoryFetch::Superseded,
        };

        let records = match result {
            Ok(records) => records,
            Err(ApiError::Forbidden) => Vec::new(),
            Err(e) => {
                if ticket.is_current() {
                    self.usage.clear();
                }
                return HistoryFetch::Failed(e);
            }
        };

        if !ticket.is_current() {
            tracing::debug!(generation = ticket.generation(), "dropping stale history response");
            return HistoryFetch::Superseded;
        }
        if !self.session.state().is_authenticated() {
            tracing::debug!("session ended during history fetch, dropping response");
            return HistoryFetch::Superseded;
        }
        self.usage.replace(records);
        HistoryFetch::Applied
    }

    async fn fetch_rewards(&self) -> Result<Option<RewardSummary>, ApiError> {
        match rewards::load_rewards(&self.client).await {
            Ok(r) => Ok(Some(r)),
            Err(ApiError::Forbidden) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Validate, submit, then refresh history and rewards.
    pub async fn submit_units(&self, input: &str) -> Result<DashboardView, CommandError> {
        self.require_login()?;
        let units = validation::parse_units(input)?;
        usage::submit_units(&self.client, units).await?;

        let mut view = self.load_overview().await?;
        view.notice = Some(SUBMITTED_MESSAGE.to_string());
        Ok(view)
    }

    /// History, rewards, tip of the day and the alert banner, loaded together.
    pub async fn load_overview(&self) -> Result<DashboardView, CommandError> {
        let identity = self.require_login()?;
        metrics::counter!("dashboard_refresh_total").increment(1);

        let (history, rewards, tip, _) = tokio::join!(
            self.fetch_history(),
            self.fetch_rewards(),
            self.tip.current(&self.client),
            self.alert.refresh(&self.client, Some(identity.as_str())),
        );

        self.ensure_still_authenticated().await?;

        let mut errors = Vec::new();
        match history {
            HistoryFetch::Failed(e) => errors.push(format!("History: {}", e.user_message())),
            HistoryFetch::Applied | HistoryFetch::Superseded => {}
        }
        let rewards = rewards.unwrap_or_else(|e| {
            errors.push(format!("Rewards: {}", e.user_message()));
            None
        });

        Ok(DashboardView {
            identity,
            snapshot: self.usage.snapshot(),
            rewards,
            tip,
            alert: self.alert.visible().await,
            notice: None,
            errors,
        })
    }

    /// History table (newest first) with the all-records projection.
    pub async fn load_history(&self) -> Result<HistoryView, CommandError> {
        self.require_login()?;

        let mut error = None;
        if let HistoryFetch::Failed(e) = self.fetch_history().await {
            error = Some(e.user_message());
        }
        self.ensure_still_authenticated().await?;

        let snapshot = self.usage.snapshot();
        Ok(HistoryView {
            predicted_bill: self.history_projection.project(&snapshot.records),
            rows: sorted_newest_first(&snapshot.records),
            error,
        })
    }

    pub async fn load_rewards(&self) -> Result<Option<RewardSummary>, CommandError> {
        self.require_login()?;
        Ok(self.fetch_rewards().await?)
    }

    pub async fn load_tips(&self) -> Vec<Tip> {
        tips_or_empty(&self.client).await
    }

    /// Raw history in fetch order, for export. A 403 is an empty history.
    pub async fn history_records(&self) -> Result<Vec<UsageRecord>, CommandError> {
        self.require_login()?;
        match usage::load_history(&self.client).await {
            Ok(records) => Ok(records),
            Err(ApiError::Forbidden) => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn download_bill(&self, record_id: &str) -> Result<Vec<u8>, CommandError> {
        self.require_login()?;
        Ok(bills::download_bill(&self.client, record_id).await?)
    }
}
