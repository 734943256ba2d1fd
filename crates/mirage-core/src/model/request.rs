//! Decoded HTTP request, used both as an incoming request and as a matcher template.

use super::body::Body;
use super::key_value::{KeyMatchStyle, MultiValueMap};
use super::nottable::NottableString;
use serde::{Deserialize, Serialize};

fn is_false(value: &bool) -> bool {
    !*value
}

fn is_blank(value: &NottableString) -> bool {
    value.is_blank() && !value.is_not()
}

/// An HTTP request.
///
/// When used as a matcher, blank strings and empty maps mean "don't care".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpRequest {
    #[serde(default, skip_serializing_if = "is_blank")]
    pub method: NottableString,
    #[serde(default, skip_serializing_if = "is_blank")]
    pub url: NottableString,
    #[serde(default, skip_serializing_if = "is_blank")]
    pub path: NottableString,
    #[serde(default, skip_serializing_if = "MultiValueMap::is_empty")]
    pub query_string_parameters: MultiValueMap,
    #[serde(default, skip_serializing_if = "MultiValueMap::is_empty")]
    pub headers: MultiValueMap,
    #[serde(default, skip_serializing_if = "MultiValueMap::is_empty")]
    pub cookies: MultiValueMap,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Body>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keep_alive: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secure: Option<bool>,
    /// Inverts the content match of this request when used as a matcher.
    #[serde(default, skip_serializing_if = "is_false")]
    pub not: bool,
}

impl HttpRequest {
    /// An empty request, which as a matcher matches everything.
    pub fn request() -> Self {
        Self::default()
    }

    /// Negated request matcher.
    pub fn not_request() -> Self {
        Self {
            not: true,
            ..Self::default()
        }
    }

    pub fn with_method(mut self, method: impl Into<NottableString>) -> Self {
        self.method = method.into();
        self
    }

    pub fn with_url(mut self, url: impl Into<NottableString>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_path(mut self, path: impl Into<NottableString>) -> Self {
        self.path = path.into();
        self
    }

    pub fn with_query_parameter<N, V, I>(mut self, name: N, values: I) -> Self
    where
        N: Into<NottableString>,
        V: Into<NottableString>,
        I: IntoIterator<Item = V>,
    {
        self.query_string_parameters = self.query_string_parameters.with_entry(name, values);
        self
    }

    pub fn with_query_parameters(mut self, parameters: MultiValueMap) -> Self {
        self.query_string_parameters = parameters;
        self
    }

    pub fn with_query_key_match_style(mut self, style: KeyMatchStyle) -> Self {
        self.query_string_parameters = self.query_string_parameters.with_key_match_style(style);
        self
    }

    pub fn with_header<N, V, I>(mut self, name: N, values: I) -> Self
    where
        N: Into<NottableString>,
        V: Into<NottableString>,
        I: IntoIterator<Item = V>,
    {
        self.headers = self.headers.with_entry(name, values);
        self
    }

    pub fn with_headers(mut self, headers: MultiValueMap) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_cookie(mut self, name: impl Into<NottableString>, value: impl Into<NottableString>) -> Self {
        self.cookies = self.cookies.with_entry(name, [value]);
        self
    }

    pub fn with_cookies(mut self, cookies: MultiValueMap) -> Self {
        self.cookies = cookies;
        self
    }

    pub fn with_body(mut self, body: impl Into<Body>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn with_keep_alive(mut self, keep_alive: bool) -> Self {
        self.keep_alive = Some(keep_alive);
        self
    }

    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = Some(secure);
        self
    }

    pub fn with_not(mut self, not: bool) -> Self {
        self.not = not;
        self
    }

    /// Content type from the body, falling back to the `content-type` header.
    pub fn content_type(&self) -> Option<&str> {
        self.body
            .as_ref()
            .and_then(Body::content_type)
            .or_else(|| self.headers.get_first("content-type"))
    }

    /// First value of a header, matched case-insensitively.
    pub fn first_header(&self, name: &str) -> Option<&str> {
        self.headers.get_first(name)
    }
}
