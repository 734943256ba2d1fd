//! Errors and management enums for expectations.

use crate::model::ActionKind;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExpectationError {
    #[error("It is not possible to set {} once {} has been set", .new.with_article(), .existing.with_article())]
    ActionAlreadySet {
        new: ActionKind,
        existing: ActionKind,
    },
    #[error("No expectation found with id {0}")]
    NotFound(String),
}

/// A management parameter carried a value outside its allowed set.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("\"{value}\" is not a valid value for \"{parameter}\" parameter, only the following values are supported [{}]", .allowed.join(", "))]
pub struct InvalidParameter {
    pub parameter: &'static str,
    pub value: String,
    pub allowed: Vec<&'static str>,
}

fn parse_named<T: Copy>(
    parameter: &'static str,
    value: &str,
    variants: &[(&'static str, T)],
) -> Result<T, InvalidParameter> {
    variants
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(value))
        .map(|(_, v)| *v)
        .ok_or_else(|| InvalidParameter {
            parameter,
            value: value.to_string(),
            allowed: variants.iter().map(|(name, _)| *name).collect(),
        })
}

fn name_of<T: Copy + PartialEq>(value: T, variants: &[(&'static str, T)]) -> &'static str {
    variants
        .iter()
        .find(|(_, v)| *v == value)
        .map(|(name, _)| *name)
        .unwrap_or_default()
}

// ============================================================================
// Clear / retrieve parameters
// ============================================================================

/// What a clear request removes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClearType {
    Log,
    Expectations,
    #[default]
    All,
}

impl ClearType {
    const VARIANTS: [(&'static str, ClearType); 3] = [
        ("log", ClearType::Log),
        ("expectations", ClearType::Expectations),
        ("all", ClearType::All),
    ];
}

impl ClearType {
    pub fn as_str(self) -> &'static str {
        name_of(self, &Self::VARIANTS)
    }
}

impl FromStr for ClearType {
    type Err = InvalidParameter;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_named("type", s, &Self::VARIANTS)
    }
}

/// What a retrieve request returns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetrieveType {
    Logs,
    #[default]
    Requests,
    RequestResponses,
    RecordedExpectations,
    ActiveExpectations,
}

impl RetrieveType {
    const VARIANTS: [(&'static str, RetrieveType); 5] = [
        ("logs", RetrieveType::Logs),
        ("requests", RetrieveType::Requests),
        ("request_responses", RetrieveType::RequestResponses),
        ("recorded_expectations", RetrieveType::RecordedExpectations),
        ("active_expectations", RetrieveType::ActiveExpectations),
    ];
}

impl RetrieveType {
    pub fn as_str(self) -> &'static str {
        name_of(self, &Self::VARIANTS)
    }
}

impl FromStr for RetrieveType {
    type Err = InvalidParameter;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_named("type", s, &Self::VARIANTS)
    }
}

/// Output format of a retrieve request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Format {
    #[default]
    Json,
    LogEntries,
}

impl Format {
    const VARIANTS: [(&'static str, Format); 2] =
        [("json", Format::Json), ("log_entries", Format::LogEntries)];
}

impl Format {
    pub fn as_str(self) -> &'static str {
        name_of(self, &Self::VARIANTS)
    }
}

impl FromStr for Format {
    type Err = InvalidParameter;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_named("format", s, &Self::VARIANTS)
    }
}

/// Why the store changed, passed to listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MutationCause {
    Api,
    Initializer,
    Expiry,
    Reset,
}

impl fmt::Display for MutationCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MutationCause::Api => "api",
            MutationCause::Initializer => "initializer",
            MutationCause::Expiry => "expiry",
            MutationCause::Reset => "reset",
        };
        f.write_str(name)
    }
}
