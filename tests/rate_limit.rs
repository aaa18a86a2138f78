use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router,
    body::{Body, to_bytes},
    extract::ConnectInfo,
    http::{Request, StatusCode, header},
    middleware::from_fn_with_state,
    routing::get,
};
use serde_json::Value;
use tasks_backend::{
    cache::InMemoryRateLimitStore,
    clock::ManualClock,
    config::RateLimitConfig,
    middleware::{RateLimiter, rate_limit},
};
use tower::ServiceExt;

fn app(config: RateLimitConfig) -> (Router, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(1_700_000_000.0));
    let store = Arc::new(InMemoryRateLimitStore::with_clock(clock.clone()));
    let limiter = Arc::new(RateLimiter::with_clock(store, clock.clone(), config));

    let router = Router::new()
        .route("/", get(|| async { "OK" }))
        .layer(from_fn_with_state(limiter, rate_limit));

    (router, clock)
}

fn request_from(peer: &str) -> Request<Body> {
    let addr: SocketAddr = format!("{peer}:40000").parse().unwrap();
    let mut req = Request::builder().uri("/").body(Body::empty()).unwrap();
    req.extensions_mut().insert(ConnectInfo(addr));
    req
}

fn forwarded_request(forwarded_for: &str, peer: &str) -> Request<Body> {
    let mut req = request_from(peer);
    req.headers_mut()
        .insert("x-forwarded-for", forwarded_for.parse().unwrap());
    req
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), 1024).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn hundred_requests_pass_and_the_next_is_rejected() {
    let (app, _) = app(RateLimitConfig::default());

    for i in 1..=100 {
        let response = app.clone().oneshot(request_from("127.0.0.1")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK, "request {i}");
        let body = to_bytes(response.into_body(), 16).await.unwrap();
        assert_eq!(&body[..], b"OK");
    }

    let response = app.clone().oneshot(request_from("127.0.0.1")).await.unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(response.headers().contains_key(header::RETRY_AFTER));

    let body = json_body(response).await;
    assert_eq!(body["error"], "Rate limit exceeded");
    let retry_after = body["retry_after"].as_u64().unwrap();
    assert!(retry_after <= 60);
}

#[tokio::test]
async fn client_is_admitted_again_after_the_window() {
    let (app, clock) = app(RateLimitConfig::default());

    for _ in 0..101 {
        app.clone().oneshot(request_from("127.0.0.1")).await.unwrap();
    }
    let denied = app.clone().oneshot(request_from("127.0.0.1")).await.unwrap();
    assert_eq!(denied.status(), StatusCode::TOO_MANY_REQUESTS);

    clock.advance(61.0);

    let response = app.clone().oneshot(request_from("127.0.0.1")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn request_exactly_at_window_end_still_counts_against_it() {
    let (app, clock) = app(RateLimitConfig::new(3, 60));

    for _ in 0..3 {
        let response = app.clone().oneshot(request_from("10.1.1.1")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    clock.advance(60.0);
    let response = app.clone().oneshot(request_from("10.1.1.1")).await.unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(json_body(response).await["retry_after"], 0);
}

#[tokio::test]
async fn distinct_clients_have_separate_budgets() {
    let (app, _) = app(RateLimitConfig::new(1, 60));

    let first = app.clone().oneshot(request_from("10.0.0.1")).await.unwrap();
    let again = app.clone().oneshot(request_from("10.0.0.1")).await.unwrap();
    let other = app.clone().oneshot(request_from("10.0.0.2")).await.unwrap();

    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(again.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(other.status(), StatusCode::OK);
}

#[tokio::test]
async fn forwarded_for_header_identifies_the_client() {
    let (app, _) = app(RateLimitConfig::new(1, 60));

    let first = app
        .clone()
        .oneshot(forwarded_request("203.0.113.9, 10.0.0.1", "10.0.0.254"))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);

    // same proxy, different original client
    let other = app
        .clone()
        .oneshot(forwarded_request("203.0.113.10", "10.0.0.254"))
        .await
        .unwrap();
    assert_eq!(other.status(), StatusCode::OK);

    let repeat = app
        .clone()
        .oneshot(forwarded_request("203.0.113.9", "192.0.2.1"))
        .await
        .unwrap();
    assert_eq!(repeat.status(), StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn requests_without_any_address_share_the_unknown_bucket() {
    let (app, _) = app(RateLimitConfig::new(1, 60));
    let bare = || Request::builder().uri("/").body(Body::empty()).unwrap();

    let first = app.clone().oneshot(bare()).await.unwrap();
    let second = app.clone().oneshot(bare()).await.unwrap();

    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
}
