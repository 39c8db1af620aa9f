//! Configuration for the watchdog.

use super::types::WatchdogError;
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Watchdog thresholds loaded from env/files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchdogConfig {
    /// Global toggle
    #[serde(rename = "watchdog_enabled")]
    pub enabled: bool,

    /// Occurrences of one key that kill the run
    #[serde(rename = "watchdog_repeat_kill_threshold")]
    pub repeat_kill_threshold: usize,
    /// Occurrences of one key that raise a warning
    #[serde(rename = "watchdog_repeat_warning_threshold")]
    pub repeat_warning_threshold: usize,

    /// Alternations that kill the run
    #[serde(rename = "watchdog_ping_pong_kill_threshold")]
    pub ping_pong_kill_threshold: usize,
    /// Alternations that raise a warning
    #[serde(rename = "watchdog_ping_pong_warning_threshold")]
    pub ping_pong_warning_threshold: usize,
    /// Minimum window length before ping-pong is checked
    #[serde(rename = "watchdog_ping_pong_min_window")]
    pub ping_pong_min_window: usize,

    /// Identical failures before a (tool, target) pair is non-retryable
    #[serde(rename = "watchdog_non_retryable_threshold")]
    pub non_retryable_threshold: usize,
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            repeat_kill_threshold: 5,
            repeat_warning_threshold: 3,
            ping_pong_kill_threshold: 4,
            ping_pong_warning_threshold: 3,
            ping_pong_min_window: 6,
            non_retryable_threshold: 2,
        }
    }
}

impl WatchdogConfig {
    /// Load watchdog settings from config files and environment variables.
    ///
    /// Priority: env vars → config files → defaults. Invalid settings fall
    /// back to defaults with a warning.
    #[must_use]
    pub fn from_env() -> Self {
        match Self::load() {
            Ok(settings) => match settings.validate() {
                Ok(()) => settings,
                Err(err) => Self::warn_and_default(&err),
            },
            Err(err) => Self::warn_and_default(&err),
        }
    }

    /// Load settings without falling back to defaults.
    ///
    /// # Errors
    ///
    /// Returns `WatchdogError::Config` if a source cannot be read or deserialized.
    pub fn load() -> Result<Self, WatchdogError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());
        let settings: Self = Self::builder(&run_mode)?.build()?.try_deserialize()?;
        Ok(settings)
    }

    fn builder(
        run_mode: &str,
    ) -> Result<config::builder::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        let defaults = Self::default();
        let builder = Config::builder()
            .set_default("watchdog_enabled", defaults.enabled)?
            .set_default(
                "watchdog_repeat_kill_threshold",
                defaults.repeat_kill_threshold as u64,
            )?
            .set_default(
                "watchdog_repeat_warning_threshold",
                defaults.repeat_warning_threshold as u64,
            )?
            .set_default(
                "watchdog_ping_pong_kill_threshold",
                defaults.ping_pong_kill_threshold as u64,
            )?
            .set_default(
                "watchdog_ping_pong_warning_threshold",
                defaults.ping_pong_warning_threshold as u64,
            )?
            .set_default(
                "watchdog_ping_pong_min_window",
                defaults.ping_pong_min_window as u64,
            )?
            .set_default(
                "watchdog_non_retryable_threshold",
                defaults.non_retryable_threshold as u64,
            )?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(Environment::default().ignore_empty(true));
        Ok(builder)
    }

    /// Check threshold ordering and ranges.
    ///
    /// # Errors
    ///
    /// Returns `WatchdogError::InvalidConfig` describing the first violated constraint.
    pub fn validate(&self) -> Result<(), WatchdogError> {
        if self.repeat_warning_threshold == 0 || self.ping_pong_warning_threshold == 0 {
            return Err(WatchdogError::InvalidConfig(
                "warning thresholds must be at least 1".to_string(),
            ));
        }
        if self.repeat_kill_threshold <= self.repeat_warning_threshold {
            return Err(WatchdogError::InvalidConfig(format!(
                "repeat kill threshold ({}) must exceed warning threshold ({})",
                self.repeat_kill_threshold, self.repeat_warning_threshold
            )));
        }
        if self.ping_pong_kill_threshold <= self.ping_pong_warning_threshold {
            return Err(WatchdogError::InvalidConfig(format!(
                "ping-pong kill threshold ({}) must exceed warning threshold ({})",
                self.ping_pong_kill_threshold, self.ping_pong_warning_threshold
            )));
        }
        if self.ping_pong_min_window < 2 {
            return Err(WatchdogError::InvalidConfig(format!(
                "ping-pong minimum window ({}) must be at least 2",
                self.ping_pong_min_window
            )));
        }
        if self.non_retryable_threshold < 2 {
            return Err(WatchdogError::InvalidConfig(format!(
                "non-retryable threshold ({}) must be at least 2",
                self.non_retryable_threshold
            )));
        }
        Ok(())
    }

    fn warn_and_default(err: &WatchdogError) -> Self {
        warn!(error = %err, "Failed to load watchdog config, using defaults");
        Self::default()
    }
}
