//! A request matcher bound to an action, a match budget and a time-to-live.

use super::types::ExpectationError;
use crate::model::{
    Action, HttpClassCallback, HttpError, HttpForward, HttpObjectCallback, HttpRequest,
    HttpResponse, HttpTemplate, TimeToLive, Times,
};
use crate::predicate::HttpRequestMatcher;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};

/// A stored rule: when a request matches, perform the action.
///
/// The matcher is compiled once at construction; the remaining-times counter
/// is the only state that changes afterwards.
#[derive(Debug, Clone)]
pub struct Expectation {
    id: String,
    priority: i32,
    http_request: Option<HttpRequest>,
    matcher: HttpRequestMatcher,
    action: Option<Action>,
    times: Times,
    time_to_live: TimeToLive,
    created: DateTime<Utc>,
}

impl Expectation {
    /// Unlimited expectation for a request (`None` matches every request).
    pub fn new(http_request: Option<HttpRequest>) -> Self {
        Self::with_times(http_request, None, None)
    }

    /// `None` times or TTL mean unlimited.
    pub fn with_times(
        http_request: Option<HttpRequest>,
        times: Option<Times>,
        time_to_live: Option<TimeToLive>,
    ) -> Self {
        let created = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            priority: 0,
            matcher: HttpRequestMatcher::new(http_request.as_ref()),
            http_request,
            action: None,
            times: times.unwrap_or_default(),
            time_to_live: time_to_live.unwrap_or_default().started_at(created),
            created,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Re-anchor the creation instant, recomputing a relative TTL.
    pub fn with_created(mut self, created: DateTime<Utc>) -> Self {
        self.created = created;
        self.time_to_live = self.time_to_live.started_at(created);
        self
    }

    // ------------------------------------------------------------------------
    // Action setters. A `None` argument leaves the expectation unchanged.
    // ------------------------------------------------------------------------

    pub fn then_respond(self, response: impl Into<Option<HttpResponse>>) -> Result<Self, ExpectationError> {
        self.set_action(response.into().map(Action::Response))
    }

    pub fn then_respond_template(self, template: impl Into<Option<HttpTemplate>>) -> Result<Self, ExpectationError> {
        self.set_action(template.into().map(Action::ResponseTemplate))
    }

    pub fn then_forward(self, forward: impl Into<Option<HttpForward>>) -> Result<Self, ExpectationError> {
        self.set_action(forward.into().map(Action::Forward))
    }

    pub fn then_forward_template(self, template: impl Into<Option<HttpTemplate>>) -> Result<Self, ExpectationError> {
        self.set_action(template.into().map(Action::ForwardTemplate))
    }

    pub fn then_error(self, error: impl Into<Option<HttpError>>) -> Result<Self, ExpectationError> {
        self.set_action(error.into().map(Action::Error))
    }

    pub fn then_callback_class(
        self,
        callback: impl Into<Option<HttpClassCallback>>,
    ) -> Result<Self, ExpectationError> {
        self.set_action(callback.into().map(Action::ClassCallback))
    }

    pub fn then_callback_object(
        self,
        callback: impl Into<Option<HttpObjectCallback>>,
    ) -> Result<Self, ExpectationError> {
        self.set_action(callback.into().map(Action::ObjectCallback))
    }

    fn set_action(mut self, action: Option<Action>) -> Result<Self, ExpectationError> {
        let Some(action) = action else {
            return Ok(self);
        };
        if let Some(existing) = &self.action {
            if existing.kind() != action.kind() {
                return Err(ExpectationError::ActionAlreadySet {
                    new: action.kind(),
                    existing: existing.kind(),
                });
            }
        }
        self.action = Some(action);
        Ok(self)
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn http_request(&self) -> Option<&HttpRequest> {
        self.http_request.as_ref()
    }

    pub fn matcher(&self) -> &HttpRequestMatcher {
        &self.matcher
    }

    pub fn action(&self) -> Option<&Action> {
        self.action.as_ref()
    }

    pub fn times(&self) -> &Times {
        &self.times
    }

    pub fn time_to_live(&self) -> &TimeToLive {
        &self.time_to_live
    }

    pub fn created(&self) -> DateTime<Utc> {
        self.created
    }

    // ------------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------------

    /// Has matches left and has not outlived its TTL.
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.times.has_remaining() && self.time_to_live.still_alive(now)
    }

    /// Match a request and consume one use of the budget.
    ///
    /// Not idempotent: every `true` result decrements the remaining count.
    pub fn matches(&self, request: Option<&HttpRequest>) -> bool {
        self.matches_at(request, Utc::now())
    }

    pub fn matches_at(&self, request: Option<&HttpRequest>, now: DateTime<Utc>) -> bool {
        self.is_active_at(now) && self.matcher.matches(request) && self.times.try_decrement()
    }

    // ------------------------------------------------------------------------
    // Definitions
    // ------------------------------------------------------------------------

    /// Build an expectation from its serialized definition.
    ///
    /// A definition with more than one action fails like the equivalent
    /// sequence of `then_*` calls.
    pub fn from_definition(definition: ExpectationDefinition) -> Result<Self, ExpectationError> {
        let mut expectation = Expectation::with_times(
            definition.http_request,
            definition.times,
            definition.time_to_live,
        )
        .with_priority(definition.priority);
        if let Some(id) = definition.id {
            expectation = expectation.with_id(id);
        }
        expectation
            .then_respond(definition.http_response)?
            .then_respond_template(definition.http_response_template)?
            .then_forward(definition.http_forward)?
            .then_forward_template(definition.http_forward_template)?
            .then_error(definition.http_error)?
            .then_callback_class(definition.http_class_callback)?
            .then_callback_object(definition.http_object_callback)
    }

    pub fn to_definition(&self) -> ExpectationDefinition {
        let mut definition = ExpectationDefinition {
            id: Some(self.id.clone()),
            priority: self.priority,
            http_request: self.http_request.clone(),
            times: Some(self.times.clone()),
            time_to_live: Some(self.time_to_live.clone()),
            ..ExpectationDefinition::default()
        };
        match self.action.clone() {
            Some(Action::Response(r)) => definition.http_response = Some(r),
            Some(Action::ResponseTemplate(t)) => definition.http_response_template = Some(t),
            Some(Action::Forward(f)) => definition.http_forward = Some(f),
            Some(Action::ForwardTemplate(t)) => definition.http_forward_template = Some(t),
            Some(Action::Error(e)) => definition.http_error = Some(e),
            Some(Action::ClassCallback(c)) => definition.http_class_callback = Some(c),
            Some(Action::ObjectCallback(c)) => definition.http_object_callback = Some(c),
            None => {}
        }
        definition
    }
}

impl Serialize for Expectation {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_definition().serialize(serializer)
    }
}

/// Serialized form of an [`Expectation`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpectationDefinition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub priority: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_request: Option<HttpRequest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_response: Option<HttpResponse>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_response_template: Option<HttpTemplate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_forward: Option<HttpForward>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_forward_template: Option<HttpTemplate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_error: Option<HttpError>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_class_callback: Option<HttpClassCallback>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_object_callback: Option<HttpObjectCallback>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub times: Option<Times>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_to_live: Option<TimeToLive>,
}
