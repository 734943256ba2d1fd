//! Expectation store and matching configuration.

use crate::expectation::DEFAULT_MAX_EXPECTATIONS;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreConfig {
    /// Oldest-inserted expectations are evicted beyond this count
    #[serde(default = "default_max_expectations")]
    pub max_expectations: usize,

    /// How often expired expectations are swept, in milliseconds
    #[serde(default = "default_expiry_sweep_interval_ms")]
    pub expiry_sweep_interval_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_expectations: default_max_expectations(),
            expiry_sweep_interval_ms: default_expiry_sweep_interval_ms(),
        }
    }
}

fn default_max_expectations() -> usize {
    DEFAULT_MAX_EXPECTATIONS
}

fn default_expiry_sweep_interval_ms() -> u64 {
    1000
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchingConfig {
    /// Build a field-by-field difference report for unmatched requests
    #[serde(default = "default_true")]
    pub detailed_match_failures: bool,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            detailed_match_failures: true,
        }
    }
}

fn default_true() -> bool {
    true
}
