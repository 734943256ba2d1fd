//! Body matching, dispatched on the expected body's variant.

use super::form::{form_to_json, parse_form};
use super::multimap;
use super::schema::JsonSchema;
use super::string::MatchOptions;
use super::{json, xpath};
use crate::model::body::FORM_URLENCODED;
use crate::model::{Body, JsonMatchType, MultiValueMap, NottableString};
use serde_json::Value;
use std::borrow::Cow;
use std::sync::Arc;
use tracing::{debug, warn};

/// Compiled form of an expected [`Body`].
#[derive(Debug, Clone)]
pub enum BodyMatcher {
    Exact(String),
    Regex(NottableString),
    Json {
        expected: Value,
        match_type: JsonMatchType,
    },
    /// `Err` holds the reason the schema could not be compiled; it never matches.
    JsonSchema(Result<Arc<JsonSchema>, String>),
    XPath(String),
    Parameters(MultiValueMap),
    Binary(Vec<u8>),
}

impl BodyMatcher {
    pub fn compile(body: &Body) -> Self {
        match body {
            Body::Exact { string, .. } => BodyMatcher::Exact(string.clone()),
            Body::Regex { regex } => BodyMatcher::Regex(NottableString::string(regex.clone())),
            Body::Json {
                json, match_type, ..
            } => BodyMatcher::Json {
                expected: json.clone(),
                match_type: *match_type,
            },
            Body::JsonSchema { json_schema } => BodyMatcher::JsonSchema(
                JsonSchema::compile(json_schema.clone())
                    .map(Arc::new)
                    .map_err(|e| {
                        warn!("Invalid JSON schema in body matcher, it will never match: {}", e);
                        e.to_string()
                    }),
            ),
            Body::XPath { xpath } => BodyMatcher::XPath(xpath.clone()),
            Body::Parameters { parameters } => BodyMatcher::Parameters(parameters.clone()),
            Body::Binary { base64_bytes, .. } => BodyMatcher::Binary(base64_bytes.clone()),
        }
    }

    /// Match the actual body, appending a reason for every mismatch.
    ///
    /// `content_type` is the actual request's content type, used to pick a
    /// JSON or form conversion for XPath matching. An absent body is empty.
    pub fn matches(
        &self,
        actual: Option<&Body>,
        content_type: Option<&str>,
        options: MatchOptions,
        differences: &mut Vec<String>,
    ) -> bool {
        let structured = matches!(
            self,
            BodyMatcher::Json { .. } | BodyMatcher::JsonSchema(_) | BodyMatcher::XPath(_)
        );
        if structured && actual.is_none() {
            differences.push("no body found".to_string());
            return false;
        }
        let text = || body_text(actual);
        match self {
            BodyMatcher::Exact(expected) => {
                let actual = text();
                let matched = expected.as_str() == actual.as_ref();
                if !matched {
                    differences.push(format!(
                        "string body didn't match, expected: {} found: {}",
                        expected, actual
                    ));
                }
                matched
            }
            BodyMatcher::Regex(pattern) => {
                let actual = text();
                let matched =
                    pattern.value() == actual.as_ref() || pattern.regex_matches(&actual, false);
                if !matched {
                    differences.push(format!(
                        "regex body didn't match, expected: {} found: {}",
                        pattern.value(),
                        actual
                    ));
                }
                matched
            }
            BodyMatcher::Json {
                expected,
                match_type,
            } => match parse_json(actual) {
                Ok(actual) => {
                    let found = json::compare(expected, &actual, *match_type);
                    let matched = found.is_empty();
                    differences.extend(found);
                    matched
                }
                Err(e) => {
                    debug!("Failed to parse JSON body for matching: {}", e);
                    differences.push(format!("failed to parse JSON body: {}", e));
                    false
                }
            },
            BodyMatcher::JsonSchema(schema) => match (schema, parse_json(actual)) {
                (Ok(schema), Ok(actual)) => {
                    let found = schema.validate(&actual);
                    let matched = found.is_empty();
                    differences.extend(found);
                    matched
                }
                (Err(e), _) => {
                    differences.push(format!("invalid JSON schema: {}", e));
                    false
                }
                (_, Err(e)) => {
                    debug!("Failed to parse JSON body for schema validation: {}", e);
                    differences.push(format!("failed to parse JSON body: {}", e));
                    false
                }
            },
            BodyMatcher::XPath(expression) => {
                let xml = match xml_view(actual, content_type) {
                    Ok(xml) => xml,
                    Err(e) => {
                        debug!("Failed to convert body for xpath matching: {}", e);
                        differences.push(format!("failed to convert body to XML: {}", e));
                        return false;
                    }
                };
                match xpath::evaluate(&xml, expression) {
                    Ok(true) => true,
                    Ok(false) => {
                        differences.push(format!(
                            "xpath body didn't match, expression: {} found: {}",
                            expression, xml
                        ));
                        false
                    }
                    Err(e) => {
                        debug!("XPath body matching failed: {}", e);
                        differences.push(e.to_string());
                        false
                    }
                }
            }
            BodyMatcher::Parameters(expected) => {
                let decoded = match actual {
                    Some(Body::Parameters { parameters }) => Cow::Borrowed(parameters),
                    _ => Cow::Owned(parse_form(&text())),
                };
                match multimap::first_mismatch(&decoded, expected, options) {
                    None => true,
                    Some(reason) => {
                        differences.push(format!("parameters body didn't match, {}", reason));
                        false
                    }
                }
            }
            BodyMatcher::Binary(expected) => {
                let actual = actual.map(Body::to_bytes).unwrap_or(Cow::Borrowed(&[]));
                let matched = expected.as_slice() == actual.as_ref();
                if !matched {
                    differences.push(format!(
                        "binary body didn't match, expected {} bytes found {} bytes",
                        expected.len(),
                        actual.len()
                    ));
                }
                matched
            }
        }
    }
}

/// Whether a recorded body difference is a parse or evaluation failure
/// rather than a plain mismatch.
pub fn is_failure(difference: &str) -> bool {
    difference.starts_with("failed to ")
}

fn body_text(actual: Option<&Body>) -> Cow<'_, str> {
    actual.map(Body::to_text).unwrap_or(Cow::Borrowed(""))
}

fn parse_json(actual: Option<&Body>) -> Result<Value, serde_json::Error> {
    match actual {
        Some(Body::Json { json, .. }) => Ok(json.clone()),
        Some(body) => serde_json::from_str(&body.to_text()),
        None => Ok(Value::Null),
    }
}

fn xml_view(actual: Option<&Body>, content_type: Option<&str>) -> Result<String, serde_json::Error> {
    let content_type = content_type.unwrap_or("").to_ascii_lowercase();
    match actual {
        None => Ok(String::new()),
        Some(Body::Json { json, .. }) => Ok(xpath::json_to_xml(json)),
        Some(Body::Parameters { parameters }) => Ok(xpath::json_to_xml(&form_to_json(parameters))),
        Some(body) if content_type.contains("json") => {
            let value: Value = serde_json::from_str(&body.to_text())?;
            Ok(xpath::json_to_xml(&value))
        }
        Some(body) if content_type.contains(FORM_URLENCODED) => {
            Ok(xpath::json_to_xml(&form_to_json(&parse_form(&body.to_text()))))
        }
        Some(body) => Ok(body.to_text().into_owned()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const DATA: MatchOptions = MatchOptions::case_insensitive();

    fn check(expected: Body, actual: Option<Body>, content_type: Option<&str>) -> (bool, Vec<String>) {
        let mut differences = Vec::new();
        let matched =
            BodyMatcher::compile(&expected).matches(actual.as_ref(), content_type, DATA, &mut differences);
        (matched, differences)
    }

    #[test]
    fn test_exact_is_case_sensitive() {
        assert!(check(Body::exact("hello"), Some(Body::exact("hello")), None).0);
        assert!(!check(Body::exact("hello"), Some(Body::exact("HELLO")), None).0);
        assert!(check(Body::exact(""), None, None).0);
    }

    #[test]
    fn test_regex_body() {
        assert!(check(Body::regex(r"id=\d+"), Some(Body::exact("id=42")), None).0);
        assert!(!check(Body::regex(r"id=\d+"), Some(Body::exact("id=x")), None).0);
        assert!(!check(Body::regex("[bad"), Some(Body::exact("anything")), None).0);
    }

    #[test]
    fn test_json_body_reports_paths() {
        let (matched, differences) = check(
            Body::json(json!({"id": 1})),
            Some(Body::exact(r#"{"id": 2, "name": "x"}"#)),
            None,
        );
        assert!(!matched);
        assert_eq!(differences, vec!["Path '/id' expected <1> but was <2>"]);
    }

    #[test]
    fn test_json_body_parse_failure_is_no_match() {
        let (matched, differences) = check(Body::json(json!({})), Some(Body::exact("{oops")), None);
        assert!(!matched);
        assert!(differences[0].starts_with("failed to parse JSON body"));
    }

    #[test]
    fn test_json_schema_body() {
        let schema = Body::json_schema(json!({"type": "object", "required": ["id"]}));
        assert!(check(schema.clone(), Some(Body::exact(r#"{"id": 1}"#)), None).0);
        assert!(!check(schema, Some(Body::exact("{}")), None).0);
        assert!(!check(Body::json_schema(json!({"type": "nope"})), Some(Body::exact("{}")), None).0);
    }

    #[test]
    fn test_json_schema_body_with_unsupported_keyword_never_matches() {
        let schema = Body::json_schema(json!({"type": "object", "unevaluatedProperties": false}));
        let (matched, differences) = check(schema, Some(Body::exact("{}")), None);
        assert!(!matched);
        assert!(differences[0].contains("unsupported schema keyword \"unevaluatedProperties\""));
    }

    #[test]
    fn test_xpath_body() {
        let body = Some(Body::exact("<a><b>1</b></a>"));
        assert!(check(Body::xpath("/a/b"), body.clone(), None).0);
        assert!(!check(Body::xpath("/a/c"), body, None).0);
    }

    #[test]
    fn test_xpath_over_json_and_form() {
        assert!(check(
            Body::xpath("/root/user[name='jane']"),
            Some(Body::exact(r#"{"user": {"name": "jane"}}"#)),
            Some("application/json; charset=utf-8"),
        )
        .0);
        assert!(check(
            Body::xpath("/root[name='jane']"),
            Some(Body::exact("name=jane&age=3")),
            Some(FORM_URLENCODED),
        )
        .0);
    }

    #[test]
    fn test_xpath_unparseable_xml_is_no_match() {
        let (matched, differences) = check(Body::xpath("/a"), Some(Body::exact("not xml")), None);
        assert!(!matched);
        assert!(!differences.is_empty());
    }

    #[test]
    fn test_parameters_body() {
        let expected = Body::parameters(
            MultiValueMap::builder()
                .entry("name", ["jane"])
                .entry("age", ["[0-9]+"])
                .build(),
        );
        assert!(check(expected.clone(), Some(Body::exact("name=jane&age=33&x=y")), None).0);
        assert!(!check(expected, Some(Body::exact("name=john&age=33")), None).0);
    }

    #[test]
    fn test_binary_body() {
        assert!(check(Body::binary(vec![1, 2, 3]), Some(Body::binary(vec![1, 2, 3])), None).0);
        assert!(!check(Body::binary(vec![1, 2, 3]), Some(Body::binary(vec![1, 2])), None).0);
    }
}
