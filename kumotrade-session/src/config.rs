//! Serializable session configuration.
//!
//! Every session knob (period, idle delay, cutoff, capital fraction, buffer
//! percent, screening thresholds) lives here and is passed explicitly into
//! the scheduler at construction. No process-wide mutable state.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use kumotrade_core::trader::TraderConfig;
use kumotrade_core::window::MIN_WINDOW;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Complete configuration for one trading session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionConfig {
    pub session: SessionSection,
    #[serde(default)]
    pub strategy: StrategySection,
    pub universe: UniverseSection,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionSection {
    /// Root directory for session state and per-day artifacts.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Fraction of the account balance allotted to trading.
    #[serde(default = "default_feasible_pct")]
    pub feasible_pct: f64,

    /// Seconds between rounds. Zero runs rounds back to back.
    #[serde(default = "default_period_secs")]
    pub period_secs: u64,

    /// Idle phase before the session starts, in seconds.
    #[serde(default)]
    pub idle_delay_secs: u64,

    /// Daily time to stop trading, `HH:MM:SS`.
    #[serde(default = "default_cutoff")]
    pub cutoff: String,

    /// Developer override: no cutoff, no penny screening.
    #[serde(default)]
    pub dev_mode: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StrategySection {
    /// Price window capacity per instrument.
    #[serde(default = "default_window")]
    pub window: usize,

    /// Exit buffer as a fraction of the entry price.
    #[serde(default = "default_buffer_pct")]
    pub buffer_pct: f64,
}

impl Default for StrategySection {
    fn default() -> Self {
        Self {
            window: default_window(),
            buffer_pct: default_buffer_pct(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UniverseSection {
    /// Number of instruments to trade.
    #[serde(default = "default_focus")]
    pub focus: usize,

    /// Candidates quoting below this are screened out.
    #[serde(default = "default_penny_threshold")]
    pub penny_threshold: f64,

    /// Ordered candidate tickers.
    pub tickers: Vec<String>,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("database")
}

fn default_feasible_pct() -> f64 {
    0.2
}

fn default_period_secs() -> u64 {
    60
}

fn default_cutoff() -> String {
    "15:15:00".to_string()
}

fn default_window() -> usize {
    80
}

fn default_buffer_pct() -> f64 {
    0.06
}

fn default_focus() -> usize {
    5
}

fn default_penny_threshold() -> f64 {
    50.0
}

impl SessionConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.session.feasible_pct > 0.0 && self.session.feasible_pct <= 1.0) {
            return Err(ConfigError::Invalid {
                field: "session.feasible_pct",
                reason: format!("{} is not in (0, 1]", self.session.feasible_pct),
            });
        }
        if self.strategy.window < MIN_WINDOW {
            return Err(ConfigError::Invalid {
                field: "strategy.window",
                reason: format!("{} is below the minimum of {MIN_WINDOW}", self.strategy.window),
            });
        }
        if self.strategy.buffer_pct <= 0.0 {
            return Err(ConfigError::Invalid {
                field: "strategy.buffer_pct",
                reason: "must be positive".into(),
            });
        }
        if self.universe.focus == 0 {
            return Err(ConfigError::Invalid {
                field: "universe.focus",
                reason: "must be at least 1".into(),
            });
        }
        self.cutoff_time()?;
        Ok(())
    }

    /// The daily trading cutoff, parsed.
    pub fn cutoff_time(&self) -> Result<NaiveTime, ConfigError> {
        NaiveTime::parse_from_str(&self.session.cutoff, "%H:%M:%S").map_err(|e| {
            ConfigError::Invalid {
                field: "session.cutoff",
                reason: format!("'{}' is not HH:MM:SS ({e})", self.session.cutoff),
            }
        })
    }

    /// Location of the durable session state file.
    pub fn state_path(&self) -> PathBuf {
        self.session.data_dir.join("user_info.json")
    }

    /// Per-day artifact directory.
    pub fn session_dir(&self, date: NaiveDate) -> PathBuf {
        self.session.data_dir.join(date.format("%d-%m-%Y").to_string())
    }

    pub fn period(&self) -> Duration {
        Duration::from_secs(self.session.period_secs)
    }

    pub fn idle_delay(&self) -> Duration {
        Duration::from_secs(self.session.idle_delay_secs)
    }

    pub fn trader_config(&self) -> TraderConfig {
        TraderConfig {
            window: self.strategy.window,
            buffer_pct: self.strategy.buffer_pct,
        }
    }
}
