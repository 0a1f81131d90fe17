use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;

use crate::domain::models::config::{Config, ConfigError};

/// Configuration loader with hierarchical merging.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging.
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults
    /// 2. `.orchestrator/config.yaml` (project config)
    /// 3. `.orchestrator/local.yaml` (project local overrides, optional)
    /// 4. `ORCH_`-prefixed environment variables (highest priority)
    pub fn load() -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(".orchestrator/config.yaml"))
            .merge(Yaml::file(".orchestrator/local.yaml"))
            .merge(Env::prefixed("ORCH_").split("__"))
            .extract()
            .context("failed to extract configuration from figment")?;

        config.validate().map_err(anyhow::Error::from)?;
        Ok(config)
    }

    /// Load configuration from a specific file, skipping the project/local
    /// YAML layers and environment overrides.
    pub fn load_from_file(path: impl AsRef<std::path::Path>) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .extract()
            .with_context(|| format!("failed to load config from {}", path.as_ref().display()))?;

        config.validate().map_err(anyhow::Error::from)?;
        Ok(config)
    }

    /// Validate a configuration that was constructed or loaded elsewhere.
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        config.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_loads_and_validates() {
        let config = Config::default();
        assert_eq!(config.local_slots, 1);
        assert_eq!(config.database.path, ".orchestrator/orchestrator.db");
        assert_eq!(config.logging.level, "info");
        ConfigLoader::validate(&config).expect("default config should be valid");
    }

    #[test]
    fn yaml_parsing_overrides_defaults() {
        let yaml = r"
daily_budget_cents: 5000
local_slots: 3
premium_slots: 1
database:
  path: /tmp/custom.db
  max_connections: 8
logging:
  level: debug
  format: pretty
";
        let config: Config = serde_yaml::from_str(yaml).expect("yaml should parse");

        assert_eq!(config.daily_budget_cents, 5000);
        assert_eq!(config.local_slots, 3);
        assert_eq!(config.database.path, "/tmp/custom.db");
        assert_eq!(config.database.max_connections, 8);
        assert_eq!(config.logging.level, "debug");

        ConfigLoader::validate(&config).expect("parsed config should be valid");
    }

    #[test]
    fn invalid_config_fails_validation() {
        let config = Config { local_slots: 0, ..Config::default() };
        assert!(ConfigLoader::validate(&config).is_err());
    }

    #[test]
    fn hierarchical_merging_lets_later_layers_win() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let mut base_file = NamedTempFile::new().unwrap();
        writeln!(base_file, "local_slots: 2\nlogging:\n  level: info").unwrap();
        base_file.flush().unwrap();

        let mut override_file = NamedTempFile::new().unwrap();
        writeln!(override_file, "local_slots: 4").unwrap();
        override_file.flush().unwrap();

        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(base_file.path()))
            .merge(Yaml::file(override_file.path()))
            .extract()
            .unwrap();

        assert_eq!(config.local_slots, 4, "override layer should win");
        assert_eq!(config.logging.level, "info", "base value should persist when not overridden");
    }

    #[test]
    fn env_provider_reads_prefixed_vars() {
        temp_env::with_var("ORCH_LOCAL_SLOTS", Some("9"), || {
            let config: Config = Figment::new()
                .merge(Serialized::defaults(Config::default()))
                .merge(Env::prefixed("ORCH_").split("__"))
                .extract()
                .unwrap();
            assert_eq!(config.local_slots, 9);
        });
    }
}
