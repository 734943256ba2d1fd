//! Request matching: every field sub-matcher combined into one predicate.

use super::body::BodyMatcher;
use super::multimap;
use super::string::{self, MatchOptions};
use crate::model::{HttpRequest, MultiValueMap, NottableString};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// A field of the request that a matcher inspects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum MatchField {
    Method,
    Url,
    Path,
    QueryParameters,
    Headers,
    Cookies,
    Body,
    KeepAlive,
    Secure,
}

const CONTENT_FIELDS: [MatchField; 7] = [
    MatchField::Method,
    MatchField::Url,
    MatchField::Path,
    MatchField::QueryParameters,
    MatchField::Body,
    MatchField::Headers,
    MatchField::Cookies,
];

const CONNECTION_FIELDS: [MatchField; 2] = [MatchField::KeepAlive, MatchField::Secure];

impl fmt::Display for MatchField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MatchField::Method => "method",
            MatchField::Url => "url",
            MatchField::Path => "path",
            MatchField::QueryParameters => "queryParameters",
            MatchField::Headers => "headers",
            MatchField::Cookies => "cookies",
            MatchField::Body => "body",
            MatchField::KeepAlive => "keepAlive",
            MatchField::Secure => "secure",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldResult {
    pub matched: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub differences: Vec<String>,
}

/// Field-by-field outcome of matching one request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MatchDifference {
    pub matched: bool,
    pub fields: BTreeMap<MatchField, FieldResult>,
}

impl MatchDifference {
    fn record(&mut self, field: MatchField, matched: bool, differences: Vec<String>) {
        self.fields.insert(field, FieldResult { matched, differences });
    }

    pub fn field(&self, field: MatchField) -> Option<&FieldResult> {
        self.fields.get(&field)
    }

    /// Fields that did not match, in declaration order.
    pub fn failed_fields(&self) -> Vec<MatchField> {
        self.fields
            .iter()
            .filter(|(_, result)| !result.matched)
            .map(|(field, _)| *field)
            .collect()
    }
}

impl fmt::Display for MatchDifference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.matched {
            return f.write_str("matched");
        }
        let mut first = true;
        for (field, result) in self.fields.iter().filter(|(_, r)| !r.matched) {
            if !first {
                f.write_str("\n")?;
            }
            first = false;
            write!(f, "{} didn't match", field)?;
            for difference in &result.differences {
                write!(f, "\n  {}", difference)?;
            }
        }
        Ok(())
    }
}

fn active(value: &NottableString) -> Option<NottableString> {
    if value.is_blank() && !value.is_not() {
        None
    } else {
        Some(value.clone())
    }
}

fn active_map(map: &MultiValueMap) -> Option<MultiValueMap> {
    if map.is_empty() {
        None
    } else {
        Some(map.clone())
    }
}

/// Compiled matcher built from an [`HttpRequest`] template.
///
/// Unset fields are wildcards. Content fields are AND-ed and then inverted
/// by the template's `not` flag; keep-alive and secure constraints are
/// applied after negation.
#[derive(Debug, Clone)]
pub struct HttpRequestMatcher {
    request: Option<HttpRequest>,
    method: Option<NottableString>,
    url: Option<NottableString>,
    path: Option<NottableString>,
    query_string_parameters: Option<MultiValueMap>,
    headers: Option<MultiValueMap>,
    cookies: Option<MultiValueMap>,
    body: Option<BodyMatcher>,
    keep_alive: Option<bool>,
    secure: Option<bool>,
    not: bool,
    control_plane: bool,
}

impl HttpRequestMatcher {
    /// Matcher for proxied or mocked traffic.
    pub fn new(request: Option<&HttpRequest>) -> Self {
        Self::build(request, false)
    }

    /// Matcher for management requests: literal comparison, no regex.
    pub fn control_plane(request: Option<&HttpRequest>) -> Self {
        Self::build(request, true)
    }

    fn build(request: Option<&HttpRequest>, control_plane: bool) -> Self {
        let template = request.cloned();
        let source = template.clone().unwrap_or_default();
        Self {
            method: active(&source.method),
            url: active(&source.url),
            path: active(&source.path),
            query_string_parameters: active_map(&source.query_string_parameters),
            headers: active_map(&source.headers),
            cookies: active_map(&source.cookies),
            body: source.body.as_ref().map(BodyMatcher::compile),
            keep_alive: source.keep_alive,
            secure: source.secure,
            not: source.not,
            control_plane,
            request: template,
        }
    }

    /// The template this matcher was built from (`None` matches everything).
    pub fn request(&self) -> Option<&HttpRequest> {
        self.request.as_ref()
    }

    pub fn is_control_plane(&self) -> bool {
        self.control_plane
    }

    /// Whether the request matches. An absent request is treated as an empty one.
    pub fn matches(&self, request: Option<&HttpRequest>) -> bool {
        if self.request.is_none() {
            return true;
        }
        match request {
            Some(actual) => self.evaluate(actual, None),
            None => self.evaluate(&HttpRequest::default(), None),
        }
    }

    /// Match and record every sub-matcher's outcome.
    pub fn explain(&self, request: Option<&HttpRequest>) -> MatchDifference {
        let mut report = MatchDifference::default();
        let matched = match (&self.request, request) {
            (None, _) => true,
            (Some(_), Some(actual)) => self.evaluate(actual, Some(&mut report)),
            (Some(_), None) => self.evaluate(&HttpRequest::default(), Some(&mut report)),
        };
        report.matched = matched;
        report
    }

    fn evaluate(&self, actual: &HttpRequest, mut report: Option<&mut MatchDifference>) -> bool {
        let detailed = report.is_some();

        let mut content = true;
        for field in CONTENT_FIELDS {
            if !content && !detailed {
                break;
            }
            let mut differences = Vec::new();
            let matched = self.match_field(field, actual, &mut differences);
            if let Some(report) = report.as_deref_mut() {
                report.record(field, matched, differences);
            }
            content &= matched;
        }

        let mut negated = self.not;
        if self.control_plane {
            negated ^= actual.not;
        }
        let mut result = content ^ negated;

        for field in CONNECTION_FIELDS {
            if !result && !detailed {
                break;
            }
            let mut differences = Vec::new();
            let matched = self.match_field(field, actual, &mut differences);
            if let Some(report) = report.as_deref_mut() {
                report.record(field, matched, differences);
            }
            result &= matched;
        }
        result
    }

    fn match_field(&self, field: MatchField, actual: &HttpRequest, differences: &mut Vec<String>) -> bool {
        let exact = MatchOptions::case_sensitive().with_control_plane(self.control_plane);
        let relaxed = MatchOptions::case_insensitive().with_control_plane(self.control_plane);
        match field {
            MatchField::Method => match_string(&self.method, &actual.method, relaxed, differences),
            MatchField::Url => match_string(&self.url, &actual.url, exact, differences),
            MatchField::Path => match_string(&self.path, &actual.path, exact, differences),
            MatchField::QueryParameters => match_map(
                &self.query_string_parameters,
                &actual.query_string_parameters,
                relaxed,
                differences,
            ),
            MatchField::Headers => match_map(&self.headers, &actual.headers, relaxed, differences),
            MatchField::Cookies => match_map(&self.cookies, &actual.cookies, relaxed, differences),
            MatchField::Body => match &self.body {
                None => true,
                Some(_) if self.control_plane => {
                    let expected = self.request.as_ref().and_then(|r| r.body.as_ref());
                    let matched = expected == actual.body.as_ref();
                    if !matched {
                        differences.push("body didn't match stored body".to_string());
                    }
                    matched
                }
                Some(body) => {
                    body.matches(actual.body.as_ref(), actual.content_type(), relaxed, differences)
                }
            },
            MatchField::KeepAlive => match_flag(self.keep_alive, actual.keep_alive, differences),
            MatchField::Secure => match_flag(self.secure, actual.secure, differences),
        }
    }
}

fn match_string(
    expected: &Option<NottableString>,
    actual: &NottableString,
    options: MatchOptions,
    differences: &mut Vec<String>,
) -> bool {
    let Some(expected) = expected else {
        return true;
    };
    let matched = string::matches(expected, actual, options);
    if !matched {
        differences.push(format!("expected: {} found: {}", expected, actual));
    }
    matched
}

fn match_map(
    expected: &Option<MultiValueMap>,
    actual: &MultiValueMap,
    options: MatchOptions,
    differences: &mut Vec<String>,
) -> bool {
    let Some(expected) = expected else {
        return true;
    };
    match multimap::first_mismatch(actual, expected, options) {
        None => true,
        Some(reason) => {
            differences.push(reason);
            false
        }
    }
}

fn match_flag(expected: Option<bool>, actual: Option<bool>, differences: &mut Vec<String>) -> bool {
    let Some(expected) = expected else {
        return true;
    };
    let actual = actual.unwrap_or(false);
    if expected != actual {
        differences.push(format!("expected: {} found: {}", expected, actual));
    }
    expected == actual
}

#[cfg(test)]
mod tests;
