use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_BACKEND_URL: &str = "ws://127.0.0.1:3012";

/// Dashboard settings, read from TOML. Every section and field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardConfig {
    #[serde(default)]
    pub connection: ConnectionConfig,
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub timeline: TimelineConfig,
    #[serde(default)]
    pub view: ViewConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    pub url: String,
    pub reconnect: ReconnectConfig,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_BACKEND_URL.to_string(),
            reconnect: ReconnectConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectConfig {
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    /// Consecutive failed attempts tolerated before giving up.
    pub max_retries: u32,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_backoff_ms: 250,
            max_backoff_ms: 10_000,
            max_retries: 10,
        }
    }
}

impl ReconnectConfig {
    /// Delay before the next attempt after `failures` consecutive failures.
    pub fn delay_for(&self, failures: u32) -> Duration {
        let exponent = failures.saturating_sub(1).min(32);
        let delay = self
            .initial_backoff_ms
            .saturating_mul(1_u64 << exponent)
            .min(self.max_backoff_ms);
        Duration::from_millis(delay)
    }

    pub fn exhausted(&self, failures: u32) -> bool {
        failures > self.max_retries
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    pub invariant_interval_ms: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            invariant_interval_ms: 5_000,
        }
    }
}

impl PollingConfig {
    pub fn invariant_interval(&self) -> Duration {
        Duration::from_millis(self.invariant_interval_ms.max(1))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimelineConfig {
    pub viewport_width: f64,
    pub margin_left: f64,
    pub margin_right: f64,
    pub margin_top: f64,
    pub row_height: f64,
    pub min_zoom: f64,
    pub max_zoom: f64,
    pub dimmed_opacity: f64,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            viewport_width: 1200.0,
            margin_left: 10.0,
            margin_right: 30.0,
            margin_top: 10.0,
            row_height: 100.0,
            min_zoom: 1.0,
            max_zoom: 512.0,
            dimmed_opacity: 0.1,
        }
    }
}

impl TimelineConfig {
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.min_zoom > 0.0 && self.min_zoom <= self.max_zoom,
            "timeline zoom bounds must satisfy 0 < min_zoom <= max_zoom (got {} and {})",
            self.min_zoom,
            self.max_zoom
        );
        ensure!(
            self.viewport_width.is_finite() && self.viewport_width > 0.0,
            "timeline viewport_width must be positive (got {})",
            self.viewport_width
        );
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
    pub initial_epoch: u64,
    pub highlight: bool,
    pub show_waiting: bool,
    pub split_worker: bool,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            initial_epoch: 1,
            highlight: true,
            show_waiting: true,
            split_worker: false,
        }
    }
}

pub fn load_config(path: &Path) -> Result<DashboardConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: DashboardConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

    config
        .timeline
        .validate()
        .with_context(|| format!("Invalid config file: {}", path.display()))?;

    Ok(config)
}
