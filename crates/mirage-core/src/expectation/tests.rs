use super::*;
use crate::clock::{Clock, ManualClock};
use crate::model::{
    HttpClassCallback, HttpError, HttpForward, HttpRequest, HttpResponse, HttpTemplate,
    TemplateType, TimeToLive, TimeUnit, Times,
};
use chrono::Duration;
use parking_lot::Mutex;
use std::sync::Arc;

fn on_path(path: &str) -> HttpRequest {
    HttpRequest::request().with_path(path)
}

fn respond(path: &str, times: Times) -> Expectation {
    Expectation::with_times(Some(on_path(path)), Some(times), None)
        .then_respond(HttpResponse::response().with_body(path))
        .unwrap()
}

fn body_of(expectation: &Expectation) -> String {
    match expectation.action() {
        Some(crate::model::Action::Response(response)) => response
            .body
            .as_ref()
            .map(|b| b.to_text().into_owned())
            .unwrap_or_default(),
        other => panic!("unexpected action {:?}", other),
    }
}

fn manual_store() -> (Arc<ManualClock>, ExpectationStore) {
    let clock = Arc::new(ManualClock::default());
    let store = ExpectationStore::with_clock(clock.clone(), DEFAULT_MAX_EXPECTATIONS);
    (clock, store)
}

// ----------------------------------------------------------------------------
// Expectation
// ----------------------------------------------------------------------------

#[test]
fn test_null_request_matcher_matches_everything() {
    let expectation = Expectation::new(None);
    assert!(expectation.matches(None));
    assert!(expectation.matches(Some(&on_path("/anything"))));
}

#[test]
fn test_matches_absent_request_against_empty_template() {
    let expectation = Expectation::new(Some(HttpRequest::request()));
    assert!(expectation.matches(None));

    let specific = Expectation::new(Some(on_path("/orders")));
    assert!(!specific.matches(None));
}

#[test]
fn test_exactly_zero_times_never_matches() {
    let expectation = Expectation::with_times(None, Some(Times::exactly(0)), None);
    assert!(!expectation.is_active_at(expectation.created()));
    assert!(!expectation.matches(Some(&on_path("/orders"))));
}

#[test]
fn test_once_is_consumed_by_first_match() {
    let expectation = respond("/orders", Times::once());
    assert!(expectation.matches(Some(&on_path("/orders"))));
    assert!(!expectation.is_active_at(expectation.created()));
    assert!(!expectation.matches(Some(&on_path("/orders"))));
}

#[test]
fn test_non_matching_request_does_not_consume() {
    let expectation = respond("/orders", Times::once());
    assert!(!expectation.matches(Some(&on_path("/users"))));
    assert_eq!(expectation.times().remaining(), 1);
}

#[test]
fn test_expired_ttl_is_inactive() {
    let expectation = Expectation::with_times(
        Some(on_path("/orders")),
        None,
        Some(TimeToLive::exactly(TimeUnit::Seconds, 10)),
    );
    let created = expectation.created();
    assert!(expectation.is_active_at(created + Duration::seconds(9)));
    assert!(!expectation.is_active_at(created + Duration::seconds(10)));
    assert!(!expectation.matches_at(Some(&on_path("/orders")), created + Duration::seconds(11)));
}

#[test]
fn test_setting_second_action_kind_fails() {
    let err = Expectation::new(None)
        .then_respond(HttpResponse::response())
        .unwrap()
        .then_forward(HttpForward::forward("localhost", 8080))
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "It is not possible to set a forward once a response has been set"
    );

    let err = Expectation::new(None)
        .then_error(HttpError::error())
        .unwrap()
        .then_callback_class(HttpClassCallback::callback("com.example.Callback"))
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "It is not possible to set a class callback once an error has been set"
    );

    let err = Expectation::new(None)
        .then_forward_template(HttpTemplate::template(TemplateType::Javascript, "return {};"))
        .unwrap()
        .then_respond_template(HttpTemplate::template(TemplateType::Velocity, "{}"))
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "It is not possible to set a response template once a forward template has been set"
    );
}

#[test]
fn test_absent_action_and_same_kind_are_accepted() {
    let expectation = Expectation::new(None)
        .then_respond(HttpResponse::response().with_status_code(201))
        .unwrap()
        .then_forward(None::<HttpForward>)
        .unwrap()
        .then_respond(HttpResponse::response().with_status_code(202))
        .unwrap();
    match expectation.action() {
        Some(crate::model::Action::Response(r)) => assert_eq!(r.status_code, Some(202)),
        other => panic!("unexpected action {:?}", other),
    }
}

#[test]
fn test_definition_round_trip_keeps_id_and_action() {
    let json = serde_json::json!({
        "id": "exp-1",
        "priority": 5,
        "httpRequest": {"path": "/orders"},
        "httpResponse": {"statusCode": 200, "body": "ok"},
        "times": {"remainingTimes": 2, "unlimited": false}
    });
    let definition: ExpectationDefinition = serde_json::from_value(json).unwrap();
    let expectation = Expectation::from_definition(definition).unwrap();
    assert_eq!(expectation.id(), "exp-1");
    assert_eq!(expectation.priority(), 5);
    assert_eq!(expectation.times().remaining(), 2);

    let value = serde_json::to_value(&expectation).unwrap();
    assert_eq!(value["id"], "exp-1");
    assert_eq!(value["httpRequest"]["path"], "/orders");
    assert_eq!(value["httpResponse"]["statusCode"], 200);
}

#[test]
fn test_definition_with_two_actions_is_rejected() {
    let json = serde_json::json!({
        "httpResponse": {"statusCode": 200},
        "httpForward": {"host": "localhost", "port": 8080}
    });
    let definition: ExpectationDefinition = serde_json::from_value(json).unwrap();
    let err = Expectation::from_definition(definition).unwrap_err();
    assert!(matches!(err, ExpectationError::ActionAlreadySet { .. }));
}

// ----------------------------------------------------------------------------
// Store
// ----------------------------------------------------------------------------

#[test]
fn test_first_matching_follows_insertion_order() {
    let store = ExpectationStore::new();
    store.add(
        Expectation::new(Some(on_path("/orders")))
            .then_respond(HttpResponse::response().with_body("first"))
            .unwrap(),
    );
    store.add(
        Expectation::new(Some(on_path("/orders")))
            .then_respond(HttpResponse::response().with_body("second"))
            .unwrap(),
    );
    let found = store.first_matching_expectation(&on_path("/orders")).unwrap();
    assert_eq!(body_of(&found), "first");
}

#[test]
fn test_higher_priority_wins_regardless_of_order() {
    let store = ExpectationStore::new();
    store.add(respond("/orders", Times::unlimited()).with_priority(0));
    store.add(
        Expectation::new(Some(on_path("/orders")))
            .with_priority(10)
            .then_respond(HttpResponse::response().with_body("priority"))
            .unwrap(),
    );
    let found = store.first_matching_expectation(&on_path("/orders")).unwrap();
    assert_eq!(body_of(&found), "priority");
    assert_eq!(store.all()[0].priority(), 10);
}

#[test]
fn test_exhausted_expectation_falls_through_to_next() {
    let store = ExpectationStore::new();
    store.add(
        Expectation::with_times(Some(on_path("/orders")), Some(Times::exactly(2)), None)
            .then_respond(HttpResponse::response().with_body("limited"))
            .unwrap(),
    );
    store.add(
        Expectation::new(Some(on_path("/orders")))
            .then_respond(HttpResponse::response().with_body("fallback"))
            .unwrap(),
    );
    let bodies: Vec<String> = (0..4)
        .map(|_| body_of(&store.first_matching_expectation(&on_path("/orders")).unwrap()))
        .collect();
    assert_eq!(bodies, vec!["limited", "limited", "fallback", "fallback"]);
}

#[test]
fn test_no_match_returns_none() {
    let store = ExpectationStore::new();
    store.add(respond("/orders", Times::unlimited()));
    assert!(store.first_matching_expectation(&on_path("/users")).is_none());
}

#[test]
fn test_add_with_same_id_replaces_in_place() {
    let store = ExpectationStore::new();
    store.add(respond("/a", Times::unlimited()).with_id("a"));
    store.add(respond("/b", Times::unlimited()).with_id("b"));
    store.add(respond("/a2", Times::unlimited()).with_id("a"));

    let ids: Vec<String> = store.all().iter().map(|e| e.id().to_string()).collect();
    assert_eq!(ids, vec!["a", "b"]);
    assert!(store.first_matching_expectation(&on_path("/a2")).is_some());
    assert!(store.first_matching_expectation(&on_path("/a")).is_none());
}

#[test]
fn test_update_requires_existing_id() {
    let store = ExpectationStore::new();
    let err = store
        .update(respond("/a", Times::unlimited()).with_id("missing"))
        .unwrap_err();
    assert_eq!(err.to_string(), "No expectation found with id missing");

    store.add(respond("/a", Times::unlimited()).with_id("present"));
    assert!(store.update(respond("/b", Times::unlimited()).with_id("present")).is_ok());
    assert_eq!(store.len(), 1);
}

#[test]
fn test_clear_by_request_is_literal() {
    let store = ExpectationStore::new();
    store.add(respond("/orders/.*", Times::unlimited()));
    store.add(respond("/orders/1", Times::unlimited()));
    store.add(respond("/users", Times::unlimited()));

    let removed = store.clear(Some(&on_path("/orders/1")));
    assert_eq!(removed.len(), 1);
    assert_eq!(store.len(), 2);
    assert!(store.get(removed[0].id()).is_none());

    store.clear(None);
    assert!(store.is_empty());
}

#[test]
fn test_retrieve_active_filters_exhausted_and_by_request() {
    let store = ExpectationStore::new();
    store.add(respond("/orders", Times::once()));
    store.add(respond("/users", Times::unlimited()));
    assert_eq!(store.retrieve_active(None).len(), 2);

    store.first_matching_expectation(&on_path("/orders"));
    assert_eq!(store.retrieve_active(None).len(), 1);
    assert_eq!(store.all().len(), 2);
    assert_eq!(store.retrieve_active(Some(&on_path("/users"))).len(), 1);
    assert!(store.retrieve_active(Some(&on_path("/orders"))).is_empty());
}

#[test]
fn test_remove_expired_uses_store_clock() {
    let (clock, store) = manual_store();
    store.add(Expectation::with_times(
        Some(on_path("/short")),
        None,
        Some(TimeToLive::exactly(TimeUnit::Seconds, 5)),
    ));
    store.add(respond("/forever", Times::unlimited()));

    assert_eq!(store.remove_expired(), 0);
    assert!(store.first_matching_expectation(&on_path("/short")).is_some());

    clock.advance(Duration::seconds(6));
    assert!(store.first_matching_expectation(&on_path("/short")).is_none());
    assert_eq!(store.remove_expired(), 1);
    assert_eq!(store.len(), 1);
}

#[test]
fn test_eviction_drops_oldest_when_full() {
    let store = ExpectationStore::with_clock(Arc::new(ManualClock::default()), 2);
    store.add(respond("/1", Times::unlimited()).with_id("1"));
    store.add(respond("/2", Times::unlimited()).with_id("2").with_priority(-5));
    store.add(respond("/3", Times::unlimited()).with_id("3"));

    let ids: Vec<String> = store.all().iter().map(|e| e.id().to_string()).collect();
    assert_eq!(ids, vec!["3", "2"]);
}

#[test]
fn test_explain_reports_each_active_expectation() {
    let store = ExpectationStore::new();
    store.add(respond("/orders", Times::unlimited()));
    store.add(respond("/users", Times::once()));
    let reports = store.explain(&on_path("/users"));
    assert_eq!(reports.len(), 2);
    assert!(!reports[0].1.matched);
    assert!(reports[1].1.matched);
    // explaining does not consume
    assert_eq!(reports[1].0.times().remaining(), 1);
}

#[derive(Default)]
struct Recorder {
    calls: Mutex<Vec<(usize, MutationCause)>>,
}

impl ExpectationListener for Recorder {
    fn updated(&self, snapshot: &StoreSnapshot, cause: MutationCause) {
        self.calls.lock().push((snapshot.expectations.len(), cause));
    }
}

#[test]
fn test_listeners_see_every_mutation() {
    let store = ExpectationStore::new();
    let recorder = Arc::new(Recorder::default());
    store.add_listener(recorder.clone());

    store.add(respond("/a", Times::unlimited()));
    store.add_with_cause(respond("/b", Times::unlimited()), MutationCause::Initializer);
    store.clear(Some(&on_path("/a")));
    store.clear(Some(&on_path("/none")));
    store.reset();

    let calls = recorder.calls.lock().clone();
    assert_eq!(
        calls,
        vec![
            (1, MutationCause::Api),
            (2, MutationCause::Initializer),
            (1, MutationCause::Api),
            (0, MutationCause::Reset),
        ]
    );
}

#[derive(Default)]
struct Revisions(Mutex<Vec<u64>>);

impl ExpectationListener for Revisions {
    fn updated(&self, snapshot: &StoreSnapshot, _cause: MutationCause) {
        self.0.lock().push(snapshot.revision);
    }
}

#[test]
fn test_snapshot_revisions_increase_with_each_mutation() {
    let store = ExpectationStore::new();
    let revisions = Arc::new(Revisions::default());
    store.add_listener(revisions.clone());

    let added = store.add(respond("/a", Times::unlimited()));
    store.update(respond("/b", Times::unlimited()).with_id(added.id().to_string())).unwrap();
    store.reset();

    assert_eq!(*revisions.0.lock(), vec![1, 2, 3]);
}

#[test]
fn test_snapshot_records_store_clock() {
    let (clock, store) = manual_store();
    let recorded = Arc::new(Mutex::new(Vec::new()));

    struct Instants(Arc<Mutex<Vec<chrono::DateTime<chrono::Utc>>>>);
    impl ExpectationListener for Instants {
        fn updated(&self, snapshot: &StoreSnapshot, _cause: MutationCause) {
            self.0.lock().push(snapshot.taken_at);
        }
    }
    store.add_listener(Arc::new(Instants(recorded.clone())));

    store.add(respond("/a", Times::unlimited()));
    assert_eq!(*recorded.lock(), vec![clock.now()]);
}

#[test]
fn test_update_after_clear_is_not_found() {
    let store = Arc::new(ExpectationStore::new());
    for _ in 0..50 {
        let added = store.add(respond("/a", Times::unlimited()));
        let id = added.id().to_string();
        let updater = {
            let store = store.clone();
            let id = id.clone();
            std::thread::spawn(move || store.update(respond("/b", Times::unlimited()).with_id(id)))
        };
        store.clear(None);
        let result = updater.join().unwrap();
        // Either the update landed before the clear (and was cleared) or it saw no entry.
        assert!(store.get(&id).is_none(), "{:?}", result.as_ref().map(|e| e.id().to_string()));
        if let Err(e) = result {
            assert!(matches!(e, ExpectationError::NotFound(_)));
        }
    }
}

#[tokio::test]
async fn test_expiry_sweeper_removes_and_stops() {
    let (clock, store) = manual_store();
    let store = Arc::new(store);
    store.add(Expectation::with_times(
        Some(on_path("/short")),
        None,
        Some(TimeToLive::exactly(TimeUnit::Milliseconds, 10)),
    ));
    clock.advance(Duration::milliseconds(20));

    let (tx, rx) = tokio::sync::broadcast::channel(1);
    let handle = spawn_expiry_sweeper(store.clone(), std::time::Duration::from_millis(5), rx);
    for _ in 0..100 {
        if store.is_empty() {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }
    assert!(store.is_empty());

    tx.send(()).unwrap();
    handle.await.unwrap();
}
