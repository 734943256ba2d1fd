//! Strings that can be logically negated.
//!
//! A `NottableString` is the atomic unit every matcher compares. Its textual
//! form uses a leading `!` for negation, so `"!text/html"` matches anything
//! except `text/html`.

use crate::predicate::schema::{JsonSchema, SchemaError};
use once_cell::sync::OnceCell;
use regex::{Regex, RegexBuilder};
use serde::de::{self, Deserializer};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use tracing::warn;

const NOT_CHAR: char = '!';

/// What the value of a [`NottableString`] holds.
#[derive(Debug, Clone)]
pub enum StringKind {
    Plain,
    /// The value is a JSON schema document; candidates are validated against it.
    Schema(Arc<JsonSchema>),
}

/// Lazily compiled patterns, one per case mode. `None` marks a malformed pattern.
#[derive(Debug, Default)]
struct RegexCache {
    sensitive: OnceCell<Option<Regex>>,
    insensitive: OnceCell<Option<Regex>>,
}

#[derive(Debug, Clone)]
pub struct NottableString {
    value: String,
    not: bool,
    kind: StringKind,
    regex: Arc<RegexCache>,
}

impl NottableString {
    /// Parse a string, treating a leading `!` as negation.
    pub fn parse(value: impl Into<String>) -> Self {
        let value = value.into();
        match value.strip_prefix(NOT_CHAR) {
            Some(rest) => Self::with_not(rest, true),
            None => Self::with_not(value, false),
        }
    }

    /// A plain string taken literally, without `!` interpretation.
    pub fn string(value: impl Into<String>) -> Self {
        Self::with_not(value, false)
    }

    /// A negated string.
    pub fn not(value: impl Into<String>) -> Self {
        Self::with_not(value, true)
    }

    pub fn with_not(value: impl Into<String>, not: bool) -> Self {
        Self {
            value: value.into(),
            not,
            kind: StringKind::Plain,
            regex: Arc::new(RegexCache::default()),
        }
    }

    /// A string whose value is a JSON schema.
    pub fn schema(schema: Value) -> Result<Self, SchemaError> {
        Self::schema_with_not(schema, false)
    }

    pub fn schema_with_not(schema: Value, not: bool) -> Result<Self, SchemaError> {
        let compiled = JsonSchema::compile(schema)?;
        Ok(Self {
            value: compiled.source().to_string(),
            not,
            kind: StringKind::Schema(Arc::new(compiled)),
            regex: Arc::new(RegexCache::default()),
        })
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn is_not(&self) -> bool {
        self.not
    }

    pub fn kind(&self) -> &StringKind {
        &self.kind
    }

    pub fn is_schema(&self) -> bool {
        matches!(self.kind, StringKind::Schema(_))
    }

    pub fn is_blank(&self) -> bool {
        self.value.trim().is_empty()
    }

    /// Same value with the negation flag flipped.
    pub fn negate(&self) -> Self {
        Self {
            value: self.value.clone(),
            not: !self.not,
            kind: self.kind.clone(),
            regex: Arc::clone(&self.regex),
        }
    }

    /// Literal comparison: `not XOR (value == candidate)`.
    ///
    /// Schema strings validate the candidate instead.
    pub fn matches(&self, candidate: &str) -> bool {
        self.not ^ self.value_equals(candidate, false)
    }

    /// Case-insensitive literal comparison.
    pub fn matches_ignore_case(&self, candidate: &str) -> bool {
        self.not ^ self.value_equals(candidate, true)
    }

    /// Full-match regex comparison: `not XOR pattern.matches(candidate)`.
    ///
    /// A malformed pattern never matches, so the result is just the negation flag.
    pub fn matches_regex(&self, candidate: &str) -> bool {
        self.not ^ self.regex_matches(candidate, false)
    }

    /// Compare the value (ignoring negation) against a candidate.
    pub(crate) fn value_equals(&self, candidate: &str, ignore_case: bool) -> bool {
        match &self.kind {
            StringKind::Schema(schema) => schema.matches_text(candidate),
            StringKind::Plain if ignore_case => {
                self.value == candidate || self.value.to_lowercase() == candidate.to_lowercase()
            }
            StringKind::Plain => self.value == candidate,
        }
    }

    /// Regex comparison of the value (ignoring negation) against a candidate.
    pub(crate) fn regex_matches(&self, candidate: &str, ignore_case: bool) -> bool {
        self.compiled(ignore_case)
            .map(|re| re.is_match(candidate))
            .unwrap_or(false)
    }

    /// Compiled full-match pattern for the given case mode, if the value is a valid regex.
    pub fn compiled(&self, ignore_case: bool) -> Option<&Regex> {
        let cell = if ignore_case {
            &self.regex.insensitive
        } else {
            &self.regex.sensitive
        };
        cell.get_or_init(|| {
            let anchored = format!("^(?:{})$", self.value);
            match RegexBuilder::new(&anchored)
                .case_insensitive(ignore_case)
                .build()
            {
                Ok(re) => Some(re),
                Err(e) => {
                    warn!(
                        "Error while matching regex [{}] ({}), treating as no match",
                        self.value, e
                    );
                    None
                }
            }
        })
        .as_ref()
    }
}

impl Default for NottableString {
    fn default() -> Self {
        Self::string("")
    }
}

impl PartialEq for NottableString {
    fn eq(&self, other: &Self) -> bool {
        self.not == other.not
            && self.value == other.value
            && self.is_schema() == other.is_schema()
    }
}

impl Eq for NottableString {}

impl Hash for NottableString {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.value.hash(state);
        self.not.hash(state);
    }
}

impl PartialOrd for NottableString {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for NottableString {
    // Reverse lexicographic, used for stable serialization order only.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .value
            .cmp(&self.value)
            .then_with(|| other.not.cmp(&self.not))
    }
}

impl fmt::Display for NottableString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.not {
            write!(f, "{}{}", NOT_CHAR, self.value)
        } else {
            f.write_str(&self.value)
        }
    }
}

impl From<&str> for NottableString {
    fn from(value: &str) -> Self {
        Self::parse(value)
    }
}

impl From<String> for NottableString {
    fn from(value: String) -> Self {
        Self::parse(value)
    }
}

impl From<&String> for NottableString {
    fn from(value: &String) -> Self {
        Self::parse(value.as_str())
    }
}

impl Serialize for NottableString {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match &self.kind {
            StringKind::Plain => serializer.collect_str(self),
            StringKind::Schema(schema) => {
                let len = if self.not { 2 } else { 1 };
                let mut map = serializer.serialize_map(Some(len))?;
                if self.not {
                    map.serialize_entry("not", &true)?;
                }
                map.serialize_entry("schema", schema.document())?;
                map.end()
            }
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NottableStringRepr {
    Text(String),
    Schema {
        #[serde(default)]
        not: bool,
        schema: Value,
    },
    Value {
        #[serde(default)]
        not: bool,
        value: String,
    },
}

impl<'de> Deserialize<'de> for NottableString {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match NottableStringRepr::deserialize(deserializer)? {
            NottableStringRepr::Text(text) => Ok(Self::parse(text)),
            NottableStringRepr::Schema { not, schema } => {
                Self::schema_with_not(schema, not).map_err(de::Error::custom)
            }
            NottableStringRepr::Value { not, value } => Ok(Self::with_not(value, not)),
        }
    }
}
