//! Pricewatch configuration system.
//!
//! One TOML file holds the bot credentials, runtime mode, and both tracker
//! lists. Tracker entries are immutable after load; runtime interval changes
//! live on the running tracker, never here.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::duration::parse_duration;
use crate::error::{PricewatchError, Result};

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    #[serde(default)]
    pub bot_token: String,
    /// Public base URL for webhook mode; unused in long-poll mode.
    #[serde(default)]
    pub webhook_url: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// `"local"` selects long polling; anything else selects webhook mode.
    #[serde(default = "default_environment")]
    pub environment: String,
    /// Consecutive-ish execution error count at which a tracker alerts its chat.
    #[serde(default = "default_error_notify_limit")]
    pub error_notify_limit: usize,
    #[serde(default)]
    pub api_trackers: Vec<TrackerConfig>,
    #[serde(default)]
    pub scraper_trackers: Vec<TrackerConfig>,
}

fn default_port() -> u16 {
    8080
}
fn default_environment() -> String {
    "local".into()
}
fn default_error_notify_limit() -> usize {
    3
}

/// One configured tracker: where to fetch, how to extract, when to notify.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Unique human-chosen identifier used in commands and as the registry key.
    pub code: String,
    /// URL the sample is fetched from.
    pub data_url: String,
    /// Optional human-facing URL included in notifications.
    #[serde(default)]
    pub view_url: Option<String>,
    /// Default run interval (duration string, e.g. `"30m"`).
    pub interval: String,
    /// JSON dot-path (API trackers) or CSS selector (scraper trackers).
    pub extraction_path: String,
    /// Ordered criteria; the first match wins.
    #[serde(default)]
    pub notify_criteria: Vec<NotifyCriterion>,
}

/// One (operator, threshold) pair evaluated against a sampled value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NotifyCriterion {
    pub operator: CompareOp,
    pub value: f64,
}

/// Comparison operator for notification criteria.
///
/// `Eq` is exact IEEE-754 equality — deliberately strict, not epsilon-tolerant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompareOp {
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = "=")]
    Eq,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = ">")]
    Gt,
}

impl CompareOp {
    /// Apply `value <op> threshold`.
    pub fn matches(self, value: f64, threshold: f64) -> bool {
        match self {
            CompareOp::Lt => value < threshold,
            CompareOp::Le => value <= threshold,
            CompareOp::Eq => value == threshold,
            CompareOp::Ge => value >= threshold,
            CompareOp::Gt => value > threshold,
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Eq => "=",
            CompareOp::Ge => ">=",
            CompareOp::Gt => ">",
        };
        f.write_str(s)
    }
}

/// Which fetch mechanism a tracker uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Api,
    Scrape,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::Api => f.write_str("api"),
            SourceKind::Scrape => f.write_str("scraper"),
        }
    }
}

impl WatchConfig {
    /// Load config from the default path (~/.pricewatch/config.toml).
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::default_path())
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| PricewatchError::Config(format!("failed to read config: {e}")))?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| PricewatchError::Config(format!("failed to parse config: {e}")))?;
        Ok(config)
    }

    /// Get the default config path.
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".pricewatch")
            .join("config.toml")
    }

    /// Validate the loaded configuration. Called once at startup; any
    /// failure here is fatal.
    pub fn validate(&self) -> Result<()> {
        if self.bot_token.is_empty() {
            return Err(PricewatchError::Config("bot_token is required".into()));
        }
        if self.api_trackers.is_empty() && self.scraper_trackers.is_empty() {
            return Err(PricewatchError::Config(
                "no trackers defined in the configuration".into(),
            ));
        }
        if self.environment.trim().to_lowercase() != "local" && self.webhook_url.is_empty() {
            return Err(PricewatchError::Config(
                "webhook_url is required outside the local environment".into(),
            ));
        }

        let mut seen = std::collections::HashSet::new();
        for tracker in self.api_trackers.iter().chain(&self.scraper_trackers) {
            let code = &tracker.code;
            if code.is_empty() {
                return Err(PricewatchError::Config("tracker code is empty".into()));
            }
            if code.contains(char::is_whitespace) || code.contains('/') || code.contains('_') {
                return Err(PricewatchError::Config(format!(
                    "tracker code '{code}' contains separators"
                )));
            }
            if !seen.insert(code.clone()) {
                return Err(PricewatchError::Config(format!(
                    "duplicate tracker code '{code}'"
                )));
            }
            if tracker.data_url.is_empty() {
                return Err(PricewatchError::Config(format!(
                    "tracker '{code}' has no data_url"
                )));
            }
            if tracker.extraction_path.is_empty() {
                return Err(PricewatchError::Config(format!(
                    "tracker '{code}' has no extraction_path"
                )));
            }
            parse_duration(&tracker.interval).map_err(|e| {
                PricewatchError::Config(format!("tracker '{code}' default interval: {e}"))
            })?;
        }

        Ok(())
    }

    /// Look up a tracker by code across both lists (API trackers first).
    pub fn tracker(&self, code: &str) -> Option<(&TrackerConfig, SourceKind)> {
        self.api_trackers
            .iter()
            .find(|t| t.code == code)
            .map(|t| (t, SourceKind::Api))
            .or_else(|| {
                self.scraper_trackers
                    .iter()
                    .find(|t| t.code == code)
                    .map(|t| (t, SourceKind::Scrape))
            })
    }

    /// Iterate all configured trackers with their source kind.
    pub fn all_trackers(&self) -> impl Iterator<Item = (&TrackerConfig, SourceKind)> {
        self.api_trackers
            .iter()
            .map(|t| (t, SourceKind::Api))
            .chain(self.scraper_trackers.iter().map(|t| (t, SourceKind::Scrape)))
    }
}
