//! Configuration types for Mirage.

mod log;
mod persistence;
mod store;

use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

pub use log::{EventLogConfig, LogFormat};
pub use persistence::PersistenceConfig;
pub use store::{MatchingConfig, StoreConfig};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub log: EventLogConfig,
    #[serde(default)]
    pub persistence: PersistenceConfig,
    #[serde(default)]
    pub matching: MatchingConfig,
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, anyhow::Error> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_yaml(&contents)
    }

    pub fn from_yaml(contents: &str) -> Result<Self, anyhow::Error> {
        let config: Config = serde_yaml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.store.max_expectations == 0 {
            anyhow::bail!("store.maxExpectations must be greater than 0");
        }
        if self.store.expiry_sweep_interval_ms == 0 {
            anyhow::bail!("store.expirySweepIntervalMs must be greater than 0");
        }
        if self.log.max_log_entries == 0 {
            anyhow::bail!("log.maxLogEntries must be greater than 0");
        }
        if self.persistence.persist_expectations
            && self.persistence.persisted_expectations_path.as_os_str().is_empty()
        {
            anyhow::bail!(
                "persistence.persistedExpectationsPath is required when persistExpectations is enabled"
            );
        }
        Ok(())
    }

    pub fn expiry_sweep_interval(&self) -> Duration {
        Duration::from_millis(self.store.expiry_sweep_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::from_yaml("{}").unwrap();
        assert_eq!(config.store.max_expectations, 5000);
        assert_eq!(config.store.expiry_sweep_interval_ms, 1000);
        assert_eq!(config.log.max_log_entries, 60_000);
        assert_eq!(config.log.level, "info");
        assert_eq!(config.log.format, LogFormat::Text);
        assert!(!config.persistence.persist_expectations);
        assert_eq!(
            config.persistence.persisted_expectations_path,
            Path::new("persistedExpectations.json")
        );
        assert!(config.persistence.initialization_json_path.is_none());
        assert!(config.matching.detailed_match_failures);
    }

    #[test]
    fn test_parse_config() {
        let yaml = r#"
store:
  maxExpectations: 10
  expirySweepIntervalMs: 250
log:
  maxLogEntries: 100
  level: debug
  format: json
persistence:
  persistExpectations: true
  persistedExpectationsPath: /tmp/expectations.json
  initializationJsonPath: init.json
matching:
  detailedMatchFailures: false
"#;
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.store.max_expectations, 10);
        assert_eq!(config.expiry_sweep_interval(), Duration::from_millis(250));
        assert_eq!(config.log.max_log_entries, 100);
        assert_eq!(config.log.level, "debug");
        assert_eq!(config.log.format, LogFormat::Json);
        assert!(config.persistence.persist_expectations);
        assert_eq!(
            config.persistence.initialization_json_path.as_deref(),
            Some(Path::new("init.json"))
        );
        assert!(!config.matching.detailed_match_failures);
    }

    #[test]
    fn test_zero_limits_are_rejected() {
        let err = Config::from_yaml("store:\n  maxExpectations: 0\n").unwrap_err();
        assert!(err.to_string().contains("maxExpectations"));

        let err = Config::from_yaml("store:\n  expirySweepIntervalMs: 0\n").unwrap_err();
        assert!(err.to_string().contains("expirySweepIntervalMs"));

        let err = Config::from_yaml("log:\n  maxLogEntries: 0\n").unwrap_err();
        assert!(err.to_string().contains("maxLogEntries"));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "log:\n  level: warn").unwrap();
        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.log.level, "warn");
    }

    #[test]
    fn test_missing_file_reports_path() {
        let err = Config::from_file("/nonexistent/mirage.yaml").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/mirage.yaml"));
    }
}
