//! Expectation persistence and initialization files.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistenceConfig {
    /// Rewrite `persisted_expectations_path` after every store mutation
    #[serde(default)]
    pub persist_expectations: bool,

    #[serde(default = "default_persisted_expectations_path")]
    pub persisted_expectations_path: PathBuf,

    /// JSON file of expectations loaded at start
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initialization_json_path: Option<PathBuf>,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            persist_expectations: false,
            persisted_expectations_path: default_persisted_expectations_path(),
            initialization_json_path: None,
        }
    }
}

fn default_persisted_expectations_path() -> PathBuf {
    PathBuf::from("persistedExpectations.json")
}
