use crate::model::{HttpRequest, HttpResponse};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogEntryType {
    ReceivedRequest,
    ExpectationMatched,
    ExpectationResponse,
    NoMatchResponse,
    ForwardedRequest,
    CreatedExpectation,
    Cleared,
    Retrieved,
    Verification,
    VerificationFailed,
    Exception,
    Trace,
}

impl LogEntryType {
    /// Entry types that pair a request with the response sent for it.
    pub fn has_response(self) -> bool {
        matches!(
            self,
            LogEntryType::ExpectationResponse
                | LogEntryType::NoMatchResponse
                | LogEntryType::ForwardedRequest
        )
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LogLevel::Trace => "TRACE",
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        };
        f.write_str(name)
    }
}

/// One event in the log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub entry_type: LogEntryType,
    pub level: LogLevel,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub http_requests: Vec<HttpRequest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_response: Option<HttpResponse>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expectation_id: Option<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
}

impl LogEntry {
    pub fn new(entry_type: LogEntryType) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            entry_type,
            level: LogLevel::Info,
            http_requests: Vec::new(),
            http_response: None,
            expectation_id: None,
            message: String::new(),
        }
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    pub fn with_request(mut self, request: HttpRequest) -> Self {
        self.http_requests.push(request);
        self
    }

    pub fn with_requests(mut self, requests: impl IntoIterator<Item = HttpRequest>) -> Self {
        self.http_requests.extend(requests);
        self
    }

    pub fn with_response(mut self, response: HttpResponse) -> Self {
        self.http_response = Some(response);
        self
    }

    pub fn with_expectation_id(mut self, id: impl Into<String>) -> Self {
        self.expectation_id = Some(id.into());
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn first_request(&self) -> Option<&HttpRequest> {
        self.http_requests.first()
    }

    /// `"<timestamp> - <message>"`, as shown in plain-text log retrieval.
    pub fn describe(&self) -> String {
        format!(
            "{} - {}",
            self.timestamp.format("%Y-%m-%d %H:%M:%S%.3f"),
            self.message
        )
    }
}
