use serde::Deserialize;
use std::{fs, path::PathBuf, time::Duration};

use energy_client::ApiConfig;

use crate::usage_metrics::{DASHBOARD_RATE_PER_UNIT, HISTORY_RATE_PER_UNIT};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiSection {
    pub base_url: String,
    /// Unset means requests wait indefinitely.
    pub timeout_secs: Option<u64>,
}

impl Default for ApiSection {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            timeout_secs: None,
        }
    }
}

impl ApiSection {
    pub fn client_config(&self) -> ApiConfig {
        ApiConfig {
            base_url: self.base_url.clone(),
            timeout: self.timeout_secs.map(Duration::from_secs),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub store_path: PathBuf,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            store_path: PathBuf::from(".energy-session.json"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProjectionConfig {
    pub dashboard_rate_per_unit: f64,
    pub history_rate_per_unit: f64,
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            dashboard_rate_per_unit: DASHBOARD_RATE_PER_UNIT,
            history_rate_per_unit: HISTORY_RATE_PER_UNIT,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    pub interval_secs: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self { interval_secs: 60 }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    pub bind_addr: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub api: ApiSection,
    pub session: SessionConfig,
    pub projection: ProjectionConfig,
    pub watch: WatchConfig,
    pub metrics: Option<MetricsConfig>,
}

impl AppConfig {
    /// Load from `ENERGY_DASHBOARD_CONFIG` (default `energy-dashboard.toml`).
    /// A missing file means defaults; `ENERGY_API_BASE_URL` overrides the API
    /// base URL either way.
    pub fn load() -> anyhow::Result<Self> {
        use std::env;

        let path = env::var("ENERGY_DASHBOARD_CONFIG").unwrap_or_else(|_| "energy-dashboard.toml".to_string());
        let mut cfg = match fs::read_to_string(&path) {
            Ok(contents) => Self::from_toml(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path, "no config file, using defaults");
                AppConfig::default()
            }
            Err(e) => return Err(anyhow::anyhow!("failed to read config {path}: {e}")),
        };

        if let Ok(base_url) = env::var("ENERGY_API_BASE_URL") {
            if !base_url.trim().is_empty() {
                cfg.api.base_url = base_url;
            }
        }

        Ok(cfg)
    }

    pub fn from_toml(contents: &str) -> anyhow::Result<Self> {
        let cfg: AppConfig = toml::from_str(contents)?;
        Ok(cfg)
    }
}
