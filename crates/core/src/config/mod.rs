//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (BAGE_*)
//! 2. TOML config file (if BAGE_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::trigger::{RootMargin, TriggerOptions};

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (BAGE_*)
/// 2. TOML config file (if BAGE_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Base URL of the REST backend.
    ///
    /// Set via BAGE_API_BASE_URL environment variable.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Bearer token sent with every request.
    ///
    /// Set via BAGE_API_TOKEN environment variable.
    #[serde(default)]
    pub api_token: Option<String>,

    /// User-Agent string for HTTP requests.
    ///
    /// Set via BAGE_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// HTTP request timeout in milliseconds.
    ///
    /// Set via BAGE_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Quiet period before typed search text is applied, in milliseconds.
    ///
    /// Set via BAGE_SEARCH_DEBOUNCE_MS environment variable.
    #[serde(default = "default_search_debounce_ms")]
    pub search_debounce_ms: u64,

    /// Fraction of the scroll sentinel that must be visible to load more.
    ///
    /// Set via BAGE_TRIGGER_THRESHOLD environment variable.
    #[serde(default = "default_trigger_threshold")]
    pub trigger_threshold: f64,

    /// Root margin applied to the viewport, CSS shorthand.
    ///
    /// Set via BAGE_TRIGGER_ROOT_MARGIN environment variable.
    #[serde(default = "default_trigger_root_margin")]
    pub trigger_root_margin: String,

    /// SQLite file for session storage; in-memory when unset.
    ///
    /// Set via BAGE_SESSION_DB_PATH environment variable.
    #[serde(default)]
    pub session_db_path: Option<PathBuf>,
}

fn default_api_base_url() -> String {
    "http://localhost:8000/api".into()
}

fn default_user_agent() -> String {
    "bage/0.1".into()
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_search_debounce_ms() -> u64 {
    500
}

fn default_trigger_threshold() -> f64 {
    0.5
}

fn default_trigger_root_margin() -> String {
    "0%".into()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            api_token: None,
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            search_debounce_ms: default_search_debounce_ms(),
            trigger_threshold: default_trigger_threshold(),
            trigger_root_margin: default_trigger_root_margin(),
            session_db_path: None,
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }

    /// Infinite-scroll trigger settings.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if the root margin does not parse or the
    /// threshold is outside `[0, 1]`.
    pub fn trigger_options(&self) -> Result<TriggerOptions, ConfigError> {
        let root_margin: RootMargin = self.trigger_root_margin.parse().map_err(|e: crate::Error| {
            ConfigError::Invalid { field: "trigger_root_margin".into(), reason: e.to_string() }
        })?;

        let options = TriggerOptions { threshold: self.trigger_threshold, root_margin, freeze_once_visible: false };
        options.validate().map_err(|e| ConfigError::Invalid {
            field: "trigger_threshold".into(),
            reason: e.to_string(),
        })?;

        Ok(options)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `BAGE_`
    /// 2. TOML file from `BAGE_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("BAGE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("BAGE_")
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trigger::Length;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.api_base_url, "http://localhost:8000/api");
        assert_eq!(config.user_agent, "bage/0.1");
        assert_eq!(config.timeout_ms, 20_000);
        assert_eq!(config.search_debounce_ms, 500);
        assert_eq!(config.trigger_threshold, 0.5);
        assert!(config.api_token.is_none());
        assert!(config.session_db_path.is_none());
    }

    #[test]
    fn test_durations() {
        let config = AppConfig::default();
        assert_eq!(config.timeout(), Duration::from_millis(20_000));
        assert_eq!(config.search_debounce(), Duration::from_millis(500));
    }

    #[test]
    fn test_trigger_options() {
        let config = AppConfig { trigger_root_margin: "0px 0px 200px".into(), ..Default::default() };
        let options = config.trigger_options().unwrap();
        assert_eq!(options.threshold, 0.5);
        assert_eq!(options.root_margin.bottom, Length::Px(200.0));
    }

    #[test]
    fn test_trigger_options_reject_out_of_range_threshold() {
        let config = AppConfig { trigger_threshold: 1.5, ..Default::default() };
        let result = config.trigger_options();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "trigger_threshold"));
    }
}
