//! Verification queries against the request log.

use super::request::HttpRequest;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Cardinality a verification expects. `at_most` of `None` means unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationTimes {
    pub at_least: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub at_most: Option<u32>,
}

impl VerificationTimes {
    pub fn never() -> Self {
        Self::exactly(0)
    }

    pub fn once() -> Self {
        Self::exactly(1)
    }

    pub fn exactly(count: u32) -> Self {
        Self {
            at_least: count,
            at_most: Some(count),
        }
    }

    pub fn at_least(count: u32) -> Self {
        Self {
            at_least: count,
            at_most: None,
        }
    }

    pub fn at_most(count: u32) -> Self {
        Self {
            at_least: 0,
            at_most: Some(count),
        }
    }

    pub fn between(at_least: u32, at_most: u32) -> Self {
        Self {
            at_least,
            at_most: Some(at_most),
        }
    }

    pub fn matches(&self, count: usize) -> bool {
        let count = u32::try_from(count).unwrap_or(u32::MAX);
        count >= self.at_least && self.at_most.map_or(true, |max| count <= max)
    }
}

impl Default for VerificationTimes {
    fn default() -> Self {
        Self::at_least(1)
    }
}

fn count_phrase(count: u32) -> String {
    if count == 1 {
        "once".to_string()
    } else {
        format!("{} times", count)
    }
}

impl fmt::Display for VerificationTimes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.at_most {
            Some(max) if max == self.at_least => write!(f, "exactly {}", count_phrase(max)),
            None => write!(f, "at least {}", count_phrase(self.at_least)),
            Some(max) if self.at_least == 0 => write!(f, "at most {}", count_phrase(max)),
            Some(max) => write!(f, "between {} and {} times", self.at_least, max),
        }
    }
}

/// "Was this request seen N times?"
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Verification {
    #[serde(default)]
    pub http_request: HttpRequest,
    #[serde(default)]
    pub times: VerificationTimes,
}

impl Verification {
    pub fn verification(http_request: HttpRequest, times: VerificationTimes) -> Self {
        Self {
            http_request,
            times,
        }
    }
}

/// "Were these requests seen in this order?"
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationSequence {
    #[serde(default)]
    pub http_requests: Vec<HttpRequest>,
}

impl VerificationSequence {
    pub fn sequence(http_requests: Vec<HttpRequest>) -> Self {
        Self { http_requests }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptions() {
        assert_eq!(VerificationTimes::once().to_string(), "exactly once");
        assert_eq!(VerificationTimes::exactly(2).to_string(), "exactly 2 times");
        assert_eq!(VerificationTimes::never().to_string(), "exactly 0 times");
        assert_eq!(VerificationTimes::at_least(1).to_string(), "at least once");
        assert_eq!(VerificationTimes::at_least(2).to_string(), "at least 2 times");
        assert_eq!(VerificationTimes::at_most(1).to_string(), "at most once");
        assert_eq!(VerificationTimes::at_most(3).to_string(), "at most 3 times");
        assert_eq!(VerificationTimes::between(1, 3).to_string(), "between 1 and 3 times");
    }

    #[test]
    fn test_cardinality() {
        assert!(VerificationTimes::exactly(2).matches(2));
        assert!(!VerificationTimes::exactly(2).matches(3));
        assert!(VerificationTimes::at_least(2).matches(5));
        assert!(!VerificationTimes::at_least(2).matches(1));
        assert!(VerificationTimes::at_most(2).matches(0));
        assert!(VerificationTimes::between(1, 2).matches(2));
        assert!(!VerificationTimes::between(1, 2).matches(0));
    }
}
