use serde::Deserialize;

use crate::aggregate::DomainOrder;
use crate::downsample::Reducer;
use crate::fetch::ChartRange;
use crate::models::SystemRef;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub instance: InstanceConfig,
    pub refresh: RefreshConfig,
    #[serde(default)]
    pub charts: ChartsConfig,
    pub pins: PinsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InstanceConfig {
    /// Scope key for pins.
    pub id: String,
    /// Base URL of the instance's record API.
    pub url: String,
    /// Name of the env var holding the auth token (read at startup, never stored in config).
    #[serde(default = "default_token_env")]
    pub token_env: String,
    /// Systems to chart. Empty = every system the instance lists.
    #[serde(default)]
    pub systems: Vec<SystemRef>,
}

fn default_token_env() -> String {
    "FLEETCHARTS_TOKEN".into()
}

#[derive(Debug, Clone, Deserialize)]
pub struct RefreshConfig {
    pub interval_secs: u64,
    pub request_timeout_ms: u64,
    #[serde(default)]
    pub chart_range: ChartRange,
    /// Max number of refresh notifications kept for /ws/updates (slow clients may lag).
    pub broadcast_capacity: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChartsConfig {
    #[serde(default)]
    pub reducer: Reducer,
    #[serde(default)]
    pub domain_order: DomainOrder,
    /// Point budget per host chart; longer series are downsampled to fit.
    #[serde(default = "default_max_points")]
    pub max_points: usize,
}

fn default_max_points() -> usize {
    300
}

impl Default for ChartsConfig {
    fn default() -> Self {
        Self {
            reducer: Reducer::default(),
            domain_order: DomainOrder::default(),
            max_points: default_max_points(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PinsConfig {
    pub path: String,
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".into());
        let s = std::fs::read_to_string(&path)?;
        Self::load_from_str(&s)
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.server.port > 0,
            "server.port must be between 1 and 65535, got {}",
            self.server.port
        );
        anyhow::ensure!(!self.instance.id.is_empty(), "instance.id must be non-empty");
        anyhow::ensure!(
            self.instance.url.starts_with("http://") || self.instance.url.starts_with("https://"),
            "instance.url must start with http:// or https://, got {:?}",
            self.instance.url
        );
        anyhow::ensure!(
            self.instance.systems.iter().all(|s| !s.id.is_empty()),
            "instance.systems entries must have a non-empty id"
        );
        anyhow::ensure!(
            self.refresh.interval_secs > 0,
            "refresh.interval_secs must be > 0, got {}",
            self.refresh.interval_secs
        );
        anyhow::ensure!(
            self.refresh.request_timeout_ms > 0,
            "refresh.request_timeout_ms must be > 0, got {}",
            self.refresh.request_timeout_ms
        );
        anyhow::ensure!(
            self.refresh.request_timeout_ms < self.refresh.interval_secs.saturating_mul(1000),
            "refresh.request_timeout_ms must be below refresh.interval_secs ({} ms), got {}",
            self.refresh.interval_secs.saturating_mul(1000),
            self.refresh.request_timeout_ms
        );
        anyhow::ensure!(
            self.refresh.broadcast_capacity > 0,
            "refresh.broadcast_capacity must be > 0, got {}",
            self.refresh.broadcast_capacity
        );
        anyhow::ensure!(
            self.charts.max_points > 1,
            "charts.max_points must be > 1, got {}",
            self.charts.max_points
        );
        anyhow::ensure!(!self.pins.path.is_empty(), "pins.path must be non-empty");
        Ok(())
    }

    /// Auth token from the configured env var, if set.
    pub fn token(&self) -> Option<String> {
        std::env::var(&self.instance.token_env)
            .ok()
            .filter(|t| !t.is_empty())
    }
}
