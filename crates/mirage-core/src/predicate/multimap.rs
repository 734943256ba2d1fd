//! Contains-all matching for headers, cookies, query and form parameters.
//!
//! `contains_all(subject, matcher)` is deliberately one-directional: regex and
//! negated matcher entries widen what they accept, so swapping the arguments
//! generally changes the result.

use super::string::{self, MatchOptions};
use crate::model::{KeyMatchStyle, KeyValuePair, MultiValueMap, NottableString};

/// Whether `subject` contains every entry of `matcher`.
pub fn contains_all(subject: &MultiValueMap, matcher: &MultiValueMap, options: MatchOptions) -> bool {
    first_mismatch(subject, matcher, options).is_none()
}

/// Same as [`contains_all`], describing the first matcher entry that failed.
pub fn first_mismatch(
    subject: &MultiValueMap,
    matcher: &MultiValueMap,
    options: MatchOptions,
) -> Option<String> {
    let style = matcher.key_match_style();
    matcher
        .entries()
        .iter()
        .find_map(|entry| entry_mismatch(subject, entry, style, options))
}

fn entry_mismatch(
    subject: &MultiValueMap,
    entry: &KeyValuePair,
    style: KeyMatchStyle,
    options: MatchOptions,
) -> Option<String> {
    let key = &entry.name;
    let mut key_found = false;
    let mut collected: Vec<&NottableString> = Vec::new();
    for candidate in subject.entries() {
        if string::matches(key, &candidate.name, options) {
            key_found = true;
            collected.extend(candidate.values.iter());
        }
    }

    if !key_found {
        return Some(format!("key '{}' not found", key));
    }

    for value in &entry.values {
        let satisfied = if value.is_not() {
            collected.iter().all(|s| string::matches(value, s, options))
        } else {
            collected.iter().any(|s| string::matches(value, s, options))
        };
        if !satisfied {
            return Some(format!(
                "key '{}' value '{}' not matched by [{}]",
                key,
                value,
                join(&collected)
            ));
        }
    }

    // Exact key set: nothing under the key may fall outside the allowed values.
    if style == KeyMatchStyle::MatchingKey && !key.is_not() && !entry.values.is_empty() {
        if let Some(extra) = collected
            .iter()
            .find(|s| !entry.values.iter().any(|v| string::matches(v, s, options)))
        {
            return Some(format!(
                "key '{}' value '{}' not allowed by [{}]",
                key,
                extra,
                join(&entry.values.iter().collect::<Vec<_>>())
            ));
        }
    }

    None
}

fn join(values: &[&NottableString]) -> String {
    values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
