//! Configuration management for the status watcher
//!
//! Configuration comes from a TOML file, from `ESOSTATUS_*` environment
//! variables, or from built-in defaults.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use crate::fetcher::{default_user_agent, DEFAULT_STATUS_URL};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Status page configuration
    pub source: SourceConfig,

    /// Poll loop configuration
    pub poll: PollConfig,

    /// Notification configuration
    pub notifications: NotificationConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Where and how to fetch the status page
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Status page URL
    pub url: String,

    /// User agent string
    pub user_agent: String,

    /// Request timeout in seconds
    pub request_timeout_secs: u64,
}

/// How servers the proximity fallback could not resolve enter a snapshot
///
/// Servers missing from a parsed table are always omitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndeterminatePolicy {
    /// Leave the server out of the snapshot
    #[default]
    Omit,
    /// Report the server as online
    AssumeOnline,
    /// Report the server as offline
    AssumeOffline,
}

impl IndeterminatePolicy {
    /// Verdict to record for an unresolved server, `None` to omit it
    pub fn resolve(&self) -> Option<bool> {
        match self {
            Self::Omit => None,
            Self::AssumeOnline => Some(true),
            Self::AssumeOffline => Some(false),
        }
    }
}

impl FromStr for IndeterminatePolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "omit" => Ok(Self::Omit),
            "assume_online" | "online" => Ok(Self::AssumeOnline),
            "assume_offline" | "offline" => Ok(Self::AssumeOffline),
            other => Err(format!("Unknown indeterminate policy: {other}")),
        }
    }
}

/// Poll loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollConfig {
    /// Seconds to wait after a check completes
    pub interval_secs: u64,

    /// Treatment of servers without a confident verdict
    pub indeterminate: IndeterminatePolicy,
}

/// Notification configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    /// Whether transitions are surfaced as notifications
    pub enabled: bool,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_STATUS_URL.to_string(),
            user_agent: default_user_agent(),
            request_timeout_secs: 15,
        }
    }
}

impl SourceConfig {
    /// Get request timeout as Duration
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_secs: 60,
            indeterminate: IndeterminatePolicy::Omit,
        }
    }
}

impl PollConfig {
    /// Get poll interval as Duration
    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: String::from("info"),
            format: String::from("text"),
        }
    }
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse::<T>().ok())
}

fn env_bool(key: &str) -> Option<bool> {
    let value = std::env::var(key).ok()?;
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl Config {
    /// Load configuration from environment variables over the defaults
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env();
        Ok(config)
    }

    /// Override fields with any `ESOSTATUS_*` variables that are set
    pub fn apply_env(&mut self) {
        if let Ok(url) = std::env::var("ESOSTATUS_URL") {
            self.source.url = url;
        }
        if let Ok(user_agent) = std::env::var("ESOSTATUS_USER_AGENT") {
            self.source.user_agent = user_agent;
        }
        if let Some(timeout) = env_parse::<u64>("ESOSTATUS_REQUEST_TIMEOUT") {
            self.source.request_timeout_secs = timeout;
        }
        if let Some(interval) = env_parse::<u64>("ESOSTATUS_POLL_INTERVAL") {
            self.poll.interval_secs = interval;
        }
        if let Some(policy) = env_parse::<IndeterminatePolicy>("ESOSTATUS_INDETERMINATE") {
            self.poll.indeterminate = policy;
        }
        if let Some(enabled) = env_bool("ESOSTATUS_NOTIFICATIONS") {
            self.notifications.enabled = enabled;
        }
        if let Ok(level) = std::env::var("ESOSTATUS_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("ESOSTATUS_LOG_FORMAT") {
            self.logging.format = format;
        }
    }

    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config file: {}", path.display()))?;

        Ok(config)
    }

    /// Load from `path` if given, otherwise defaults; environment wins either way
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env();
        config.validate().context("Invalid configuration")?;
        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        crate::utils::parse_http_url(&self.source.url).context("source.url is not usable")?;

        if self.source.user_agent.trim().is_empty() {
            anyhow::bail!("source.user_agent must not be empty");
        }

        if self.source.request_timeout_secs == 0 {
            anyhow::bail!("source.request_timeout_secs must be greater than 0");
        }

        if self.poll.interval_secs == 0 {
            anyhow::bail!("poll.interval_secs must be greater than 0");
        }

        if !matches!(self.logging.format.as_str(), "text" | "json") {
            anyhow::bail!("logging.format must be 'text' or 'json'");
        }

        Ok(())
    }
}
