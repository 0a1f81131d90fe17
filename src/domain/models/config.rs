//! Orchestrator configuration tree (see the configuration contract).

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// All recognized configuration options, merged from defaults, project and
/// local YAML files, and `ORCH_`-prefixed environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_key: String,
    pub daily_budget_cents: u64,
    pub budget_warning_threshold: f64,
    pub local_slots: usize,
    pub premium_slots: usize,
    pub task_timeout_ms: u64,
    pub sweeper_interval_ms: u64,
    pub rate_limit_window_ms: u64,
    pub rate_limit_max: u32,
    pub cors_origins: Vec<String>,
    pub default_max_iterations: u32,
    pub review_min_complexity: f64,
    pub enable_reviews: bool,
    pub enable_judge_assessor: bool,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: String,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: ".orchestrator/orchestrator.db".to_string(),
            max_connections: 5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Pretty,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
    pub log_dir: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
            log_dir: None,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            daily_budget_cents: 1_000,
            budget_warning_threshold: 0.8,
            local_slots: 1,
            premium_slots: 2,
            task_timeout_ms: 600_000,
            sweeper_interval_ms: 60_000,
            rate_limit_window_ms: 60_000,
            rate_limit_max: 100,
            cors_origins: Vec::new(),
            default_max_iterations: 3,
            review_min_complexity: 3.0,
            enable_reviews: true,
            enable_judge_assessor: false,
            database: DatabaseConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("budget_warning_threshold must be in (0, 1], got {0}")]
    InvalidWarningThreshold(String),
    #[error("local_slots and premium_slots must be > 0")]
    InvalidSlots,
    #[error("task_timeout_ms must be > 0")]
    InvalidTaskTimeout,
    #[error("sweeper_interval_ms must be > 0")]
    InvalidSweeperInterval,
    #[error("database path must not be empty")]
    EmptyDatabasePath,
    #[error("database.max_connections must be > 0")]
    InvalidMaxConnections,
    #[error("invalid log level: {0}")]
    InvalidLogLevel(String),
}

impl Config {
    /// Validate cross-field invariants not expressible in the type alone.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.budget_warning_threshold > 0.0 && self.budget_warning_threshold <= 1.0) {
            return Err(ConfigError::InvalidWarningThreshold(
                self.budget_warning_threshold.to_string(),
            ));
        }
        if self.local_slots == 0 || self.premium_slots == 0 {
            return Err(ConfigError::InvalidSlots);
        }
        if self.task_timeout_ms == 0 {
            return Err(ConfigError::InvalidTaskTimeout);
        }
        if self.sweeper_interval_ms == 0 {
            return Err(ConfigError::InvalidSweeperInterval);
        }
        if self.database.path.trim().is_empty() {
            return Err(ConfigError::EmptyDatabasePath);
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::InvalidMaxConnections);
        }
        if !matches!(
            self.logging.level.to_lowercase().as_str(),
            "trace" | "debug" | "info" | "warn" | "error"
        ) {
            return Err(ConfigError::InvalidLogLevel(self.logging.level.clone()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn zero_slots_rejected() {
        let c = Config { local_slots: 0, ..Config::default() };
        assert_eq!(c.validate(), Err(ConfigError::InvalidSlots));
    }

    #[test]
    fn bad_warning_threshold_rejected() {
        let c = Config { budget_warning_threshold: 1.5, ..Config::default() };
        assert!(c.validate().is_err());
    }
}
