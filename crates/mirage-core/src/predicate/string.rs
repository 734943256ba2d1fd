//! Comparison of a matcher [`NottableString`] against a matched value.

use crate::model::NottableString;

/// Comparison options shared by every string-based matcher.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MatchOptions {
    /// Compare literals and patterns case-insensitively.
    pub ignore_case: bool,
    /// Literal comparison only; regex interpretation is disabled.
    pub control_plane: bool,
}

impl MatchOptions {
    pub const fn case_sensitive() -> Self {
        Self {
            ignore_case: false,
            control_plane: false,
        }
    }

    pub const fn case_insensitive() -> Self {
        Self {
            ignore_case: true,
            control_plane: false,
        }
    }

    pub const fn with_control_plane(mut self, control_plane: bool) -> Self {
        self.control_plane = control_plane;
        self
    }

    pub const fn with_ignore_case(mut self, ignore_case: bool) -> Self {
        self.ignore_case = ignore_case;
        self
    }
}

/// Match a matcher against another nottable value.
///
/// The result is `(matcher.not XOR matched.not) XOR value_match`, where
/// `value_match` is literal equality, then regex (full match) unless in
/// control plane mode. A blank matcher matches anything.
pub fn matches(matcher: &NottableString, matched: &NottableString, options: MatchOptions) -> bool {
    if matcher.is_blank() && !matcher.is_schema() {
        return !matcher.is_not();
    }
    (matcher.is_not() ^ matched.is_not()) ^ value_matches(matcher, matched.value(), options)
}

/// Match a matcher against a plain (never negated) value.
pub fn matches_str(matcher: &NottableString, matched: &str, options: MatchOptions) -> bool {
    if matcher.is_blank() && !matcher.is_schema() {
        return !matcher.is_not();
    }
    matcher.is_not() ^ value_matches(matcher, matched, options)
}

fn value_matches(matcher: &NottableString, candidate: &str, options: MatchOptions) -> bool {
    if matcher.value_equals(candidate, options.ignore_case) {
        return true;
    }
    if matcher.is_schema() || options.control_plane {
        return false;
    }
    matcher.regex_matches(candidate, options.ignore_case)
}
