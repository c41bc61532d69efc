//! Application configuration

use std::env;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use thiserror::Error;

use crate::domain::value_objects::CoordinatorSettings;

/// Configuration values that cannot drive a running coordinator
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("WORLDLOCK_MAX_EVENT_HISTORY must be greater than zero")]
    EmptyEventHistory,
    #[error("WORLDLOCK_TICK_INTERVAL_MS must be greater than zero")]
    ZeroTickInterval,
    #[error("WORLDLOCK_STATS_INTERVAL_SECS must be greater than zero")]
    ZeroStatsInterval,
}

/// Application configuration loaded from environment
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Lock manager and event bus tunables
    pub settings: CoordinatorSettings,
    /// Period of the world tick worker
    pub tick_interval_ms: u64,
    /// Period of the statistics logger
    pub stats_interval_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            settings: CoordinatorSettings::default(),
            tick_interval_ms: 100,
            stats_interval_secs: 60,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        let config = Self {
            settings: settings_from_env()?,
            tick_interval_ms: parse_var("WORLDLOCK_TICK_INTERVAL_MS", defaults.tick_interval_ms)?,
            stats_interval_secs: parse_var(
                "WORLDLOCK_STATS_INTERVAL_SECS",
                defaults.stats_interval_secs,
            )?,
        };
        config.validate().context("Invalid worldlock configuration")?;
        Ok(config)
    }

    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.settings.max_event_history == 0 {
            return Err(ConfigError::EmptyEventHistory);
        }
        if self.tick_interval_ms == 0 {
            return Err(ConfigError::ZeroTickInterval);
        }
        if self.stats_interval_secs == 0 {
            return Err(ConfigError::ZeroStatsInterval);
        }
        Ok(())
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn stats_interval(&self) -> Duration {
        Duration::from_secs(self.stats_interval_secs)
    }
}

/// Coordinator settings from `WORLDLOCK_*` variables, defaults for unset ones
fn settings_from_env() -> Result<CoordinatorSettings> {
    let defaults = CoordinatorSettings::default();
    Ok(CoordinatorSettings {
        max_event_history: parse_var("WORLDLOCK_MAX_EVENT_HISTORY", defaults.max_event_history)?,
        log_events: parse_var("WORLDLOCK_LOG_EVENTS", defaults.log_events)?,
        log_event_processing: parse_var(
            "WORLDLOCK_LOG_EVENT_PROCESSING",
            defaults.log_event_processing,
        )?,
        log_lock_operations: parse_var("WORLDLOCK_LOG_LOCKS", defaults.log_lock_operations)?,
        default_lock_hold_secs: parse_var(
            "WORLDLOCK_DEFAULT_LOCK_HOLD_SECS",
            defaults.default_lock_hold_secs,
        )?,
        save_lock_hold_secs: parse_var(
            "WORLDLOCK_SAVE_LOCK_HOLD_SECS",
            defaults.save_lock_hold_secs,
        )?,
        load_lock_hold_secs: parse_var(
            "WORLDLOCK_LOAD_LOCK_HOLD_SECS",
            defaults.load_lock_hold_secs,
        )?,
    })
}

/// Parse `key` if it is set, failing on malformed values
fn parse_var<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} has an invalid value: {raw:?}")),
        Err(_) => Ok(default),
    }
}
