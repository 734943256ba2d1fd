use super::*;
use crate::model::{Body, KeyMatchStyle};
use serde_json::json;

fn get(path: &str) -> HttpRequest {
    HttpRequest::request().with_method("GET").with_path(path)
}

#[test]
fn test_wildcard_matches_everything() {
    let matcher = HttpRequestMatcher::new(None);
    assert!(matcher.matches(None));
    assert!(matcher.matches(Some(&get("/any"))));

    let empty = HttpRequestMatcher::new(Some(&HttpRequest::request()));
    assert!(empty.matches(None));
    assert!(empty.matches(Some(&get("/any"))));
}

#[test]
fn test_method_and_path() {
    let matcher = HttpRequestMatcher::new(Some(&get("/orders/[0-9]+")));
    assert!(matcher.matches(Some(&get("/orders/42"))));
    assert!(matcher.matches(Some(&HttpRequest::request().with_method("get").with_path("/orders/1"))));
    assert!(!matcher.matches(Some(&get("/orders/abc"))));
    assert!(!matcher.matches(Some(&HttpRequest::request().with_method("POST").with_path("/orders/1"))));
    // Path is case sensitive
    assert!(!HttpRequestMatcher::new(Some(&get("/Orders"))).matches(Some(&get("/orders"))));
}

#[test]
fn test_negated_path() {
    let matcher = HttpRequestMatcher::new(Some(&HttpRequest::request().with_path("!/health")));
    assert!(matcher.matches(Some(&get("/orders"))));
    assert!(!matcher.matches(Some(&get("/health"))));
}

#[test]
fn test_headers_subset() {
    let matcher = HttpRequestMatcher::new(Some(
        &HttpRequest::request().with_header("ACCEPT", ["application/.*"]),
    ));
    let request = get("/")
        .with_header("Accept", ["application/json"])
        .with_header("X-Trace", ["1"]);
    assert!(matcher.matches(Some(&request)));
    assert!(!matcher.matches(Some(&get("/"))));
}

#[test]
fn test_query_parameters_matching_key() {
    let template = HttpRequest::request()
        .with_query_parameter("id", ["1", "2"])
        .with_query_key_match_style(KeyMatchStyle::MatchingKey);
    let matcher = HttpRequestMatcher::new(Some(&template));
    assert!(matcher.matches(Some(&get("/").with_query_parameter("id", ["2", "1"]))));
    assert!(!matcher.matches(Some(&get("/").with_query_parameter("id", ["1", "2", "3"]))));
}

#[test]
fn test_cookies() {
    let matcher = HttpRequestMatcher::new(Some(&HttpRequest::request().with_cookie("session", "abc.*")));
    assert!(matcher.matches(Some(&get("/").with_cookie("session", "abc123"))));
    assert!(!matcher.matches(Some(&get("/").with_cookie("session", "zzz"))));
}

#[test]
fn test_json_body() {
    let matcher = HttpRequestMatcher::new(Some(
        &HttpRequest::request().with_body(Body::json(json!({"id": 1}))),
    ));
    assert!(matcher.matches(Some(&get("/").with_body(r#"{"id": 1, "extra": 2}"#))));
    assert!(!matcher.matches(Some(&get("/").with_body(r#"{"id": 2}"#))));
    assert!(!matcher.matches(Some(&get("/"))));
}

#[test]
fn test_not_inverts_content_match() {
    let matcher = HttpRequestMatcher::new(Some(&get("/orders").with_not(true)));
    assert!(!matcher.matches(Some(&get("/orders"))));
    assert!(matcher.matches(Some(&get("/other"))));
}

#[test]
fn test_connection_flags_are_not_negated() {
    let template = get("/orders").with_not(true).with_keep_alive(true);
    let matcher = HttpRequestMatcher::new(Some(&template));
    assert!(matcher.matches(Some(&get("/other").with_keep_alive(true))));
    assert!(!matcher.matches(Some(&get("/other").with_keep_alive(false))));
    assert!(!matcher.matches(Some(&get("/other"))));

    let secure = HttpRequestMatcher::new(Some(&HttpRequest::request().with_secure(true)));
    assert!(secure.matches(Some(&get("/").with_secure(true))));
    assert!(!secure.matches(Some(&get("/").with_secure(false))));
}

#[test]
fn test_explain_records_every_field() {
    let template = get("/orders").with_header("X-Tenant", ["blue"]);
    let matcher = HttpRequestMatcher::new(Some(&template));
    let report = matcher.explain(Some(&get("/users").with_header("X-Tenant", ["red"])));

    assert!(!report.matched);
    assert_eq!(
        report.failed_fields(),
        vec![MatchField::Path, MatchField::Headers]
    );
    assert!(report.field(MatchField::Method).unwrap().matched);
    assert_eq!(
        report.field(MatchField::Path).unwrap().differences,
        vec!["expected: /orders found: /users"]
    );
    let text = report.to_string();
    assert!(text.contains("path didn't match"));
    assert!(text.contains("headers didn't match"));
}

#[test]
fn test_explain_agrees_with_matches() {
    let matcher = HttpRequestMatcher::new(Some(&get("/a")));
    for request in [get("/a"), get("/b"), HttpRequest::request()] {
        assert_eq!(
            matcher.explain(Some(&request)).matched,
            matcher.matches(Some(&request))
        );
    }
}

#[test]
fn test_control_plane_is_literal() {
    let stored = get("/orders/.*");
    let literal = HttpRequestMatcher::control_plane(Some(&get("/orders/.*")));
    assert!(literal.matches(Some(&stored)));

    let regex_looking = HttpRequestMatcher::control_plane(Some(&get("/orders/1")));
    assert!(!regex_looking.matches(Some(&stored)));

    let pattern = HttpRequestMatcher::control_plane(Some(&get("/orders/[0-9]")));
    assert!(!pattern.matches(Some(&get("/orders/1"))));
}

#[test]
fn test_control_plane_compares_bodies_by_value() {
    let stored = get("/").with_body(Body::regex("id=.*"));
    let matcher = HttpRequestMatcher::control_plane(Some(&stored));
    assert!(matcher.matches(Some(&stored)));
    assert!(!matcher.matches(Some(&get("/").with_body("id=1"))));
}
