//! Actions an expectation performs once matched.
//!
//! The core only selects an action; executing it belongs to the transport layer.

use super::body::Body;
use super::key_value::MultiValueMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

// ============================================================================
// Time units and delays
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TimeUnit {
    Nanoseconds,
    Microseconds,
    #[default]
    Milliseconds,
    Seconds,
    Minutes,
    Hours,
    Days,
}

impl TimeUnit {
    pub fn to_duration(self, amount: u64) -> Duration {
        match self {
            TimeUnit::Nanoseconds => Duration::from_nanos(amount),
            TimeUnit::Microseconds => Duration::from_micros(amount),
            TimeUnit::Milliseconds => Duration::from_millis(amount),
            TimeUnit::Seconds => Duration::from_secs(amount),
            TimeUnit::Minutes => Duration::from_secs(amount.saturating_mul(60)),
            TimeUnit::Hours => Duration::from_secs(amount.saturating_mul(3_600)),
            TimeUnit::Days => Duration::from_secs(amount.saturating_mul(86_400)),
        }
    }
}

/// Delay applied by the transport before performing an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Delay {
    pub time_unit: TimeUnit,
    pub value: u64,
}

impl Delay {
    pub fn milliseconds(value: u64) -> Self {
        Self {
            time_unit: TimeUnit::Milliseconds,
            value,
        }
    }

    pub fn seconds(value: u64) -> Self {
        Self {
            time_unit: TimeUnit::Seconds,
            value,
        }
    }

    pub fn duration(&self) -> Duration {
        self.time_unit.to_duration(self.value)
    }
}

// ============================================================================
// Action payloads
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason_phrase: Option<String>,
    #[serde(default, skip_serializing_if = "MultiValueMap::is_empty")]
    pub headers: MultiValueMap,
    #[serde(default, skip_serializing_if = "MultiValueMap::is_empty")]
    pub cookies: MultiValueMap,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Body>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay: Option<Delay>,
}

impl HttpResponse {
    pub fn response() -> Self {
        Self::default()
    }

    pub fn not_found() -> Self {
        Self::response().with_status_code(404)
    }

    pub fn with_status_code(mut self, status_code: u16) -> Self {
        self.status_code = Some(status_code);
        self
    }

    pub fn with_reason_phrase(mut self, reason_phrase: impl Into<String>) -> Self {
        self.reason_phrase = Some(reason_phrase.into());
        self
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers = self.headers.with_entry(name, [value]);
        self
    }

    pub fn with_cookie(mut self, name: &str, value: &str) -> Self {
        self.cookies = self.cookies.with_entry(name, [value]);
        self
    }

    pub fn with_body(mut self, body: impl Into<Body>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn with_delay(mut self, delay: Delay) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Scheme {
    #[default]
    Http,
    Https,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpForward {
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub scheme: Scheme,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay: Option<Delay>,
}

fn default_port() -> u16 {
    80
}

impl HttpForward {
    pub fn forward(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            scheme: Scheme::Http,
            delay: None,
        }
    }

    pub fn with_scheme(mut self, scheme: Scheme) -> Self {
        self.scheme = scheme;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TemplateType {
    Javascript,
    Velocity,
}

/// A response or forward produced by evaluating a template against the request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpTemplate {
    pub template_type: TemplateType,
    pub template: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay: Option<Delay>,
}

impl HttpTemplate {
    pub fn template(template_type: TemplateType, template: impl Into<String>) -> Self {
        Self {
            template_type,
            template: template.into(),
            delay: None,
        }
    }
}

/// Deliberate connection-level failure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpError {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drop_connection: Option<bool>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "optional_base64"
    )]
    pub response_bytes: Option<Vec<u8>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay: Option<Delay>,
}

impl HttpError {
    pub fn error() -> Self {
        Self::default()
    }

    pub fn with_drop_connection(mut self, drop_connection: bool) -> Self {
        self.drop_connection = Some(drop_connection);
        self
    }

    pub fn with_response_bytes(mut self, bytes: impl Into<Vec<u8>>) -> Self {
        self.response_bytes = Some(bytes.into());
        self
    }
}

/// Callback resolved by a registered handler name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpClassCallback {
    pub callback_class: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay: Option<Delay>,
}

impl HttpClassCallback {
    pub fn callback(callback_class: impl Into<String>) -> Self {
        Self {
            callback_class: callback_class.into(),
            delay: None,
        }
    }
}

/// Callback delivered to a connected client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpObjectCallback {
    pub client_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay: Option<Delay>,
}

impl HttpObjectCallback {
    pub fn callback(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            delay: None,
        }
    }
}

mod optional_base64 {
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error> {
        match bytes {
            Some(bytes) => {
                serializer.serialize_some(&base64::engine::general_purpose::STANDARD.encode(bytes))
            }
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Vec<u8>>, D::Error> {
        Option::<String>::deserialize(deserializer)?
            .map(|text| {
                base64::engine::general_purpose::STANDARD
                    .decode(text.as_bytes())
                    .map_err(serde::de::Error::custom)
            })
            .transpose()
    }
}

// ============================================================================
// Action
// ============================================================================

/// Kind of action, used in error messages and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    Response,
    ResponseTemplate,
    Forward,
    ForwardTemplate,
    Error,
    ClassCallback,
    ObjectCallback,
}

impl ActionKind {
    fn noun(self) -> &'static str {
        match self {
            ActionKind::Response => "response",
            ActionKind::ResponseTemplate => "response template",
            ActionKind::Forward => "forward",
            ActionKind::ForwardTemplate => "forward template",
            ActionKind::Error => "error",
            ActionKind::ClassCallback => "class callback",
            ActionKind::ObjectCallback => "object callback",
        }
    }

    /// Noun with its indefinite article, e.g. "an error".
    pub fn with_article(self) -> String {
        let noun = self.noun();
        let article = if noun.starts_with(['a', 'e', 'i', 'o', 'u']) {
            "an"
        } else {
            "a"
        };
        format!("{} {}", article, noun)
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.noun())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Response(HttpResponse),
    ResponseTemplate(HttpTemplate),
    Forward(HttpForward),
    ForwardTemplate(HttpTemplate),
    Error(HttpError),
    ClassCallback(HttpClassCallback),
    ObjectCallback(HttpObjectCallback),
}

impl Action {
    pub fn kind(&self) -> ActionKind {
        match self {
            Action::Response(_) => ActionKind::Response,
            Action::ResponseTemplate(_) => ActionKind::ResponseTemplate,
            Action::Forward(_) => ActionKind::Forward,
            Action::ForwardTemplate(_) => ActionKind::ForwardTemplate,
            Action::Error(_) => ActionKind::Error,
            Action::ClassCallback(_) => ActionKind::ClassCallback,
            Action::ObjectCallback(_) => ActionKind::ObjectCallback,
        }
    }

    pub fn delay(&self) -> Option<Delay> {
        match self {
            Action::Response(r) => r.delay,
            Action::ResponseTemplate(t) | Action::ForwardTemplate(t) => t.delay,
            Action::Forward(f) => f.delay,
            Action::Error(e) => e.delay,
            Action::ClassCallback(c) => c.delay,
            Action::ObjectCallback(c) => c.delay,
        }
    }
}
