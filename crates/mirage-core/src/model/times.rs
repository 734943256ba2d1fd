//! Match budgets and time-to-live.

use super::action::TimeUnit;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::sync::atomic::{AtomicU32, Ordering};

/// Remaining number of matches for an expectation.
///
/// The remaining count is atomic so that concurrent matches decrement it
/// without holding any store-level lock.
#[derive(Debug)]
pub struct Times {
    remaining: AtomicU32,
    unlimited: bool,
}

impl Times {
    pub fn unlimited() -> Self {
        Self {
            remaining: AtomicU32::new(0),
            unlimited: true,
        }
    }

    pub fn once() -> Self {
        Self::exactly(1)
    }

    pub fn exactly(count: u32) -> Self {
        Self {
            remaining: AtomicU32::new(count),
            unlimited: false,
        }
    }

    pub fn is_unlimited(&self) -> bool {
        self.unlimited
    }

    pub fn remaining(&self) -> u32 {
        self.remaining.load(Ordering::SeqCst)
    }

    pub fn has_remaining(&self) -> bool {
        self.unlimited || self.remaining() > 0
    }

    /// Consume one match. Returns false when the budget is already exhausted.
    pub fn try_decrement(&self) -> bool {
        if self.unlimited {
            return true;
        }
        self.remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| current.checked_sub(1))
            .is_ok()
    }
}

impl Default for Times {
    fn default() -> Self {
        Self::unlimited()
    }
}

impl Clone for Times {
    fn clone(&self) -> Self {
        Self {
            remaining: AtomicU32::new(self.remaining()),
            unlimited: self.unlimited,
        }
    }
}

impl PartialEq for Times {
    fn eq(&self, other: &Self) -> bool {
        self.unlimited == other.unlimited && (self.unlimited || self.remaining() == other.remaining())
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TimesRepr {
    #[serde(default)]
    remaining_times: u32,
    #[serde(default)]
    unlimited: bool,
}

impl Serialize for Times {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        TimesRepr {
            remaining_times: self.remaining(),
            unlimited: self.unlimited,
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Times {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let repr = TimesRepr::deserialize(deserializer)?;
        Ok(if repr.unlimited {
            Times::unlimited()
        } else {
            Times::exactly(repr.remaining_times)
        })
    }
}

/// How long an expectation stays eligible for matching.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeToLive {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_unit: Option<TimeUnit>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_to_live: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub unlimited: bool,
}

impl TimeToLive {
    pub fn unlimited() -> Self {
        Self {
            time_unit: None,
            time_to_live: None,
            end_date: None,
            unlimited: true,
        }
    }

    /// A TTL whose end date is fixed later, relative to the creation instant.
    pub fn exactly(time_unit: TimeUnit, time_to_live: u64) -> Self {
        Self {
            time_unit: Some(time_unit),
            time_to_live: Some(time_to_live),
            end_date: None,
            unlimited: false,
        }
    }

    /// Fix the end date relative to `created`. An absolute end date without a
    /// relative duration is kept as is.
    pub fn started_at(mut self, created: DateTime<Utc>) -> Self {
        if self.unlimited {
            return self;
        }
        if let (Some(unit), Some(amount)) = (self.time_unit, self.time_to_live) {
            let ttl = Duration::from_std(unit.to_duration(amount)).unwrap_or_else(|_| Duration::days(365_000));
            self.end_date = Some(created.checked_add_signed(ttl).unwrap_or(DateTime::<Utc>::MAX_UTC));
        }
        self
    }

    pub fn still_alive(&self, now: DateTime<Utc>) -> bool {
        if self.unlimited {
            return true;
        }
        match self.end_date {
            Some(end) => now < end,
            None => true,
        }
    }
}

impl Default for TimeToLive {
    fn default() -> Self {
        Self::unlimited()
    }
}
