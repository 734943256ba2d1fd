//! Event log and diagnostic logging configuration.

use crate::log::DEFAULT_MAX_LOG_ENTRIES;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventLogConfig {
    /// Oldest entries are dropped beyond this count
    #[serde(default = "default_max_log_entries")]
    pub max_log_entries: usize,

    /// Default `tracing` filter; `RUST_LOG` takes precedence
    #[serde(default = "default_level")]
    pub level: String,

    #[serde(default)]
    pub format: LogFormat,
}

/// Output format of diagnostic logs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl Default for EventLogConfig {
    fn default() -> Self {
        Self {
            max_log_entries: default_max_log_entries(),
            level: default_level(),
            format: LogFormat::default(),
        }
    }
}

fn default_max_log_entries() -> usize {
    DEFAULT_MAX_LOG_ENTRIES
}

fn default_level() -> String {
    "info".to_string()
}
