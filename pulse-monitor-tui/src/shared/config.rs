/// Monitor configuration
///
/// Read once at startup from `PULSE_*` environment variables. Missing or
/// malformed values fall back to defaults, except the API URL which must parse.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use tracing::warn;
use url::Url;

use super::scheduler::DEFAULT_REFRESH_INTERVAL;
use super::sort::{SortDirection, SortKey, SortPreference};

pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8000";
pub const DEFAULT_WINDOW_SECONDS: u64 = 300;
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_LOG_FILE: &str = "pulse-monitor.log";

#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum ConfigError {
    #[error("invalid API URL {url:?}: {reason}")]
    InvalidApiUrl { url: String, reason: String },
}

/// Parse a window-size input, falling back to [`DEFAULT_WINDOW_SECONDS`]
///
/// Empty, non-numeric and zero inputs all fall back.
pub fn parse_window(input: &str) -> u64 {
    input
        .trim()
        .parse::<u64>()
        .ok()
        .filter(|seconds| *seconds > 0)
        .unwrap_or(DEFAULT_WINDOW_SECONDS)
}

/// Log file path from `PULSE_LOG_FILE`
///
/// Resolved on its own so logging can start before the rest of the
/// configuration is read.
pub fn log_file_from_env() -> PathBuf {
    log_file_from_lookup(&|name: &str| std::env::var(name).ok())
}

fn log_file_from_lookup(lookup: &impl Fn(&str) -> Option<String>) -> PathBuf {
    lookup("PULSE_LOG_FILE")
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_FILE))
}

/// Process-wide dashboard settings
///
/// Created from [`MonitorConfig`] at startup and changed only by the user's
/// apply action; background refreshes never reset it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DashboardSettings {
    pub window_seconds: u64,
    pub sort: SortPreference,
}

impl Default for DashboardSettings {
    fn default() -> Self {
        Self {
            window_seconds: DEFAULT_WINDOW_SECONDS,
            sort: SortPreference::default(),
        }
    }
}

/// Monitor configuration
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Aggregation backend base URL
    pub api_url: Url,
    /// Initial window and sort preference
    pub settings: DashboardSettings,
    /// Transport-level timeout for one fetch
    pub request_timeout: Duration,
    /// Period of the refresh timer
    pub refresh_interval: Duration,
    /// Log destination; the terminal belongs to the UI
    pub log_file: PathBuf,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            api_url: Url::parse(DEFAULT_API_URL).expect("default API URL is valid"),
            settings: DashboardSettings::default(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
            log_file: PathBuf::from(DEFAULT_LOG_FILE),
        }
    }
}

impl MonitorConfig {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through `lookup`, which maps a variable name to its value
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let mut config = Self::default();

        if let Some(url) = var("PULSE_API_URL") {
            config.api_url = Url::parse(&url).map_err(|e| ConfigError::InvalidApiUrl {
                url: url.clone(),
                reason: e.to_string(),
            })?;
        }

        if let Some(window) = var("PULSE_WINDOW_SEC") {
            match window.parse::<u64>() {
                Ok(seconds) if seconds > 0 => config.settings.window_seconds = seconds,
                _ => warn!(
                    "PULSE_WINDOW_SEC={:?} is not a positive integer, using {}",
                    window, DEFAULT_WINDOW_SECONDS
                ),
            }
        }

        if let Some(key) = var("PULSE_SORT_KEY") {
            config.settings.sort.key = SortKey::from(key.as_str());
            if config.settings.sort.key == SortKey::Unrecognized {
                warn!("PULSE_SORT_KEY={:?} is not a known sort key, rows keep server order", key);
            }
        }

        if let Some(direction) = var("PULSE_SORT_DIR") {
            config.settings.sort.direction = SortDirection::from(direction.as_str());
        }

        if let Some(timeout) = var("PULSE_REQUEST_TIMEOUT_SECS") {
            match timeout.parse::<u64>() {
                Ok(secs) if secs > 0 => config.request_timeout = Duration::from_secs(secs),
                _ => warn!(
                    "PULSE_REQUEST_TIMEOUT_SECS={:?} is invalid, using {:?}",
                    timeout, DEFAULT_REQUEST_TIMEOUT
                ),
            }
        }

        config.log_file = log_file_from_lookup(&lookup);

        Ok(config)
    }

    /// Set the backend base URL
    pub fn with_api_url(mut self, api_url: Url) -> Self {
        self.api_url = api_url;
        self
    }

    /// Set the initial window
    pub fn with_window_seconds(mut self, window_seconds: u64) -> Self {
        self.settings.window_seconds = window_seconds;
        self
    }

    /// Set the initial sort preference
    pub fn with_sort(mut self, sort: SortPreference) -> Self {
        self.settings.sort = sort;
        self
    }

    /// Set the refresh timer period
    pub fn with_refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = interval;
        self
    }
}
