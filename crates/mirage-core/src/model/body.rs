//! Request and response bodies.

use super::key_value::MultiValueMap;
use base64::Engine;
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use std::borrow::Cow;

pub const APPLICATION_JSON: &str = "application/json";
pub const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";

#[derive(Debug, thiserror::Error)]
pub enum BodyError {
    #[error("invalid JSON body: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

/// How a JSON body is compared against the actual body.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JsonMatchType {
    /// Deep equality, extra fields in the actual body fail the match.
    Strict,
    /// Every expected field must be present; extra fields are ignored.
    #[default]
    OnlyMatchingFields,
}

/// A body, tagged by how it is interpreted when used as a matcher.
///
/// Besides the tagged object form, a bare string deserializes as an exact
/// body and an untagged JSON value as a JSON body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    remote = "Self",
    tag = "type",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum Body {
    #[serde(rename = "STRING")]
    Exact {
        string: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        content_type: Option<String>,
    },
    Regex {
        regex: String,
    },
    Json {
        json: Value,
        #[serde(default)]
        match_type: JsonMatchType,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        content_type: Option<String>,
    },
    JsonSchema {
        json_schema: Value,
    },
    #[serde(rename = "XPATH")]
    XPath {
        xpath: String,
    },
    Parameters {
        parameters: MultiValueMap,
    },
    Binary {
        #[serde(with = "base64_bytes")]
        base64_bytes: Vec<u8>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        content_type: Option<String>,
    },
}

impl Body {
    pub fn exact(value: impl Into<String>) -> Self {
        Body::Exact {
            string: value.into(),
            content_type: None,
        }
    }

    pub fn exact_with_content_type(value: impl Into<String>, content_type: impl Into<String>) -> Self {
        Body::Exact {
            string: value.into(),
            content_type: Some(content_type.into()),
        }
    }

    pub fn regex(pattern: impl Into<String>) -> Self {
        Body::Regex {
            regex: pattern.into(),
        }
    }

    pub fn json(json: Value) -> Self {
        Self::json_with_match_type(json, JsonMatchType::default())
    }

    pub fn json_with_match_type(json: Value, match_type: JsonMatchType) -> Self {
        Body::Json {
            json,
            match_type,
            content_type: None,
        }
    }

    /// Parse a JSON document from text.
    pub fn json_str(text: &str, match_type: JsonMatchType) -> Result<Self, BodyError> {
        Ok(Self::json_with_match_type(serde_json::from_str(text)?, match_type))
    }

    pub fn json_schema(schema: Value) -> Self {
        Body::JsonSchema {
            json_schema: schema,
        }
    }

    pub fn xpath(expression: impl Into<String>) -> Self {
        Body::XPath {
            xpath: expression.into(),
        }
    }

    pub fn parameters(parameters: MultiValueMap) -> Self {
        Body::Parameters { parameters }
    }

    pub fn binary(bytes: impl Into<Vec<u8>>) -> Self {
        Body::Binary {
            base64_bytes: bytes.into(),
            content_type: None,
        }
    }

    /// Short name of the variant, as used in the `type` field.
    pub fn kind(&self) -> &'static str {
        match self {
            Body::Exact { .. } => "STRING",
            Body::Regex { .. } => "REGEX",
            Body::Json { .. } => "JSON",
            Body::JsonSchema { .. } => "JSON_SCHEMA",
            Body::XPath { .. } => "XPATH",
            Body::Parameters { .. } => "PARAMETERS",
            Body::Binary { .. } => "BINARY",
        }
    }

    /// Declared content type, or the natural one for the variant.
    pub fn content_type(&self) -> Option<&str> {
        match self {
            Body::Exact { content_type, .. } | Body::Binary { content_type, .. } => {
                content_type.as_deref()
            }
            Body::Json { content_type, .. } => content_type.as_deref().or(Some(APPLICATION_JSON)),
            Body::Parameters { .. } => Some(FORM_URLENCODED),
            _ => None,
        }
    }

    /// Textual form of the body.
    pub fn to_text(&self) -> Cow<'_, str> {
        match self {
            Body::Exact { string, .. } => Cow::Borrowed(string),
            Body::Regex { regex } => Cow::Borrowed(regex),
            Body::Json { json, .. } => Cow::Owned(json.to_string()),
            Body::JsonSchema { json_schema } => Cow::Owned(json_schema.to_string()),
            Body::XPath { xpath } => Cow::Borrowed(xpath),
            Body::Parameters { parameters } => Cow::Owned(encode_form(parameters)),
            Body::Binary {
                base64_bytes,
                content_type,
            } => decode_text(base64_bytes, content_type.as_deref()),
        }
    }

    /// Raw bytes of the body.
    pub fn to_bytes(&self) -> Cow<'_, [u8]> {
        match self {
            Body::Binary { base64_bytes, .. } => Cow::Borrowed(base64_bytes),
            Body::Exact { string, .. } => Cow::Borrowed(string.as_bytes()),
            other => Cow::Owned(other.to_text().into_owned().into_bytes()),
        }
    }
}

impl Serialize for Body {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        Body::serialize(self, serializer)
    }
}

impl<'de> Deserialize<'de> for Body {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::String(text) => Ok(Body::exact(text)),
            Value::Object(map) if map.contains_key("type") => {
                Body::deserialize(Value::Object(map)).map_err(de::Error::custom)
            }
            other => Ok(Body::json(other)),
        }
    }
}

impl From<&str> for Body {
    fn from(value: &str) -> Self {
        Body::exact(value)
    }
}

impl From<String> for Body {
    fn from(value: String) -> Self {
        Body::exact(value)
    }
}

/// Decode bytes using the charset named in a content type (UTF-8 when absent).
pub fn decode_text<'a>(bytes: &'a [u8], content_type: Option<&str>) -> Cow<'a, str> {
    let charset = content_type.and_then(|ct| {
        ct.split(';')
            .skip(1)
            .filter_map(|p| p.split_once('='))
            .find(|(k, _)| k.trim().eq_ignore_ascii_case("charset"))
            .map(|(_, v)| v.trim().trim_matches('"').to_ascii_lowercase())
    });
    match charset.as_deref() {
        Some("iso-8859-1") | Some("latin1") | Some("us-ascii") => {
            Cow::Owned(bytes.iter().map(|&b| b as char).collect())
        }
        _ => String::from_utf8_lossy(bytes),
    }
}

/// Encode parameters as `application/x-www-form-urlencoded`.
pub fn encode_form(parameters: &MultiValueMap) -> String {
    parameters
        .entries()
        .iter()
        .flat_map(|entry| {
            entry.values.iter().map(move |value| {
                format!(
                    "{}={}",
                    urlencoding::encode(entry.name.value()),
                    urlencoding::encode(value.value())
                )
            })
        })
        .collect::<Vec<_>>()
        .join("&")
}

mod base64_bytes {
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&base64::engine::general_purpose::STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let text = String::deserialize(deserializer)?;
        base64::engine::general_purpose::STANDARD
            .decode(text.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}

/// Encode bytes the way binary bodies are serialized.
pub fn to_base64(bytes: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(bytes)
}
