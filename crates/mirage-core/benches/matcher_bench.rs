use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use mirage_core::model::{Body, HttpRequest, HttpResponse, MultiValueMap};
use mirage_core::predicate::{contains_all, HttpRequestMatcher, MatchOptions};
use mirage_core::{Expectation, ExpectationStore};

fn create_expectation(id: usize, regex: bool) -> Expectation {
    let path = if regex {
        format!("/api/v\\d+/endpoint{id}")
    } else {
        format!("/api/v1/endpoint{id}")
    };
    Expectation::new(Some(
        HttpRequest::request()
            .with_method("GET")
            .with_path(path)
            .with_header("accept", ["application/json"]),
    ))
    .then_respond(HttpResponse::response().with_status_code(200))
    .unwrap()
}

fn populated_store(count: usize, regex: bool) -> ExpectationStore {
    let store = ExpectationStore::new();
    for i in 0..count {
        store.add(create_expectation(i, regex));
    }
    store
}

fn incoming(path: &str) -> HttpRequest {
    HttpRequest::request()
        .with_method("GET")
        .with_path(path)
        .with_header("Accept", ["application/json"])
        .with_header("User-Agent", ["bench"])
}

fn bench_store_lookup(c: &mut Criterion) {
    let mut group = c.benchmark_group("store_lookup");

    for count in [10, 50, 100, 500, 1000].iter() {
        let store = populated_store(*count, false);
        let first = incoming("/api/v1/endpoint0");
        let last = incoming(&format!("/api/v1/endpoint{}", count - 1));
        let missing = incoming("/not/found");

        group.throughput(Throughput::Elements(1));
        group.bench_with_input(BenchmarkId::new("first_match", count), count, |b, _| {
            b.iter(|| store.first_matching_expectation(black_box(&first)));
        });
        group.bench_with_input(BenchmarkId::new("last_match", count), count, |b, _| {
            b.iter(|| store.first_matching_expectation(black_box(&last)));
        });
        group.bench_with_input(BenchmarkId::new("no_match", count), count, |b, _| {
            b.iter(|| store.first_matching_expectation(black_box(&missing)));
        });
    }

    group.finish();
}

fn bench_regex_lookup(c: &mut Criterion) {
    let mut group = c.benchmark_group("regex_lookup");

    for count in [10, 50, 100].iter() {
        let store = populated_store(*count, true);
        let last = incoming(&format!("/api/v2/endpoint{}", count - 1));

        group.throughput(Throughput::Elements(1));
        group.bench_with_input(BenchmarkId::new("last_match", count), count, |b, _| {
            b.iter(|| store.first_matching_expectation(black_box(&last)));
        });
    }

    group.finish();
}

fn bench_single_matcher(c: &mut Criterion) {
    let mut group = c.benchmark_group("single_matcher");
    let template = HttpRequest::request()
        .with_method("POST")
        .with_path("/orders/.*")
        .with_body(Body::json(serde_json::json!({"kind": "order"})));
    let matcher = HttpRequestMatcher::new(Some(&template));
    let request = incoming("/orders/42")
        .with_method("POST")
        .with_body(r#"{"kind": "order", "id": 42, "lines": [1, 2, 3]}"#);

    group.throughput(Throughput::Elements(1));
    group.bench_function("matches", |b| {
        b.iter(|| matcher.matches(black_box(Some(&request))));
    });
    group.bench_function("explain", |b| {
        b.iter(|| matcher.explain(black_box(Some(&incoming("/users")))));
    });
    group.finish();
}

fn bench_contains_all(c: &mut Criterion) {
    let mut group = c.benchmark_group("contains_all");
    let matcher = MultiValueMap::builder()
        .entry("key.*", ["value.*"])
        .entry("!excluded", ["x"])
        .build();
    let subject = MultiValueMap::builder()
        .entry("keyOne", ["valueOne"])
        .entry("keyTwo", ["valueTwo"])
        .entry("other", ["a", "b", "c"])
        .build();
    let options = MatchOptions::case_insensitive();

    group.throughput(Throughput::Elements(1));
    group.bench_function("regex_and_negated_keys", |b| {
        b.iter(|| contains_all(black_box(&subject), black_box(&matcher), options));
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_store_lookup,
    bench_regex_lookup,
    bench_single_matcher,
    bench_contains_all
);
criterion_main!(benches);
