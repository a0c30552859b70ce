mod common;

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use common::{envelope, post, test_config, FakeTransport};
use contentful_blog::api::routes::{create_router, REVALIDATE_HEADER};
use contentful_blog::AppState;
use serde_json::{json, Value};
use tower::ServiceExt;

fn app(transport: FakeTransport) -> Router {
    create_router(AppState::new(test_config(), Arc::new(transport)))
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, axum::http::HeaderMap, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, headers, serde_json::from_slice(&bytes).unwrap())
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn lists_posts_with_cache_headers() {
    let app = app(FakeTransport::returning(envelope(vec![post("a"), post("b")])));

    let (status, headers, body) = send(app, get("/api/posts")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CACHE_CONTROL], "public, s-maxage=3600");
    assert_eq!(headers["cache-tag"], "posts");
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
    assert_eq!(body["data"][0]["coverImage"]["url"], "https://images.ctfassets.net/a.png");
    assert_eq!(body["meta"]["status"], "success");
}

#[tokio::test]
async fn draft_listing_is_not_cached() {
    let app = app(FakeTransport::returning(envelope(vec![])));

    let (status, headers, _) = send(app, get("/api/posts?draft=true")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CACHE_CONTROL], "no-store");
}

#[tokio::test]
async fn post_page_degrades_when_post_is_missing() {
    let app = app(FakeTransport::new(|query| {
        if query.contains("slug_not_in") {
            Ok(envelope(vec![post("other")]))
        } else {
            Ok(envelope(vec![]))
        }
    }));

    let (status, _, body) = send(app, get("/api/posts/hello")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["post"], Value::Null);
    assert_eq!(body["data"]["morePosts"][0]["slug"], "other");
}

#[tokio::test]
async fn missing_preview_post_is_404() {
    let app = app(FakeTransport::returning(envelope(vec![])));

    let (status, _, body) = send(app, get("/api/preview/ghost")).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["meta"]["status"], "error");
}

#[tokio::test]
async fn upstream_failure_is_bad_gateway() {
    let app = app(FakeTransport::new(|_| {
        Err(contentful_blog::error::AppError::Transport { status: 500, message: "down".into() })
    }));

    let (status, _, body) = send(app, get("/api/posts")).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["meta"]["message"], "Upstream returned HTTP 500: down");
}

#[tokio::test]
async fn metrics_report_counters() {
    let state = AppState::new(test_config(), Arc::new(FakeTransport::returning(envelope(vec![]))));
    state.posts.get_all_posts(false).await.unwrap();
    let app = create_router(state);

    let (status, _, body) = send(app, get("/api/metrics")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["requests"], 1);
    assert_eq!(body["data"]["outbound_calls"], 1);
    assert_eq!(body["data"]["dedup_hit_rate"], 0.0);
    assert_eq!(body["data"]["seconds_since_last_rate_limit"], Value::Null);
}

#[tokio::test]
async fn revalidate_rejects_bad_secret() {
    for secret in [None, Some("wrong")] {
        let mut request = Request::builder().method("POST").uri("/api/revalidate");
        if let Some(secret) = secret {
            request = request.header(REVALIDATE_HEADER, secret);
        }
        let app = app(FakeTransport::returning(json!({})));

        let (status, _, body) = send(app, request.body(Body::empty()).unwrap()).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body, json!({ "message": "Invalid secret" }));
    }
}

#[tokio::test]
async fn revalidate_accepts_shared_secret() {
    let state = AppState::new(test_config(), Arc::new(FakeTransport::returning(json!({}))));
    let request = Request::builder()
        .method("POST")
        .uri("/api/revalidate")
        .header(REVALIDATE_HEADER, "s3cret")
        .body(Body::empty())
        .unwrap();

    let (status, _, body) = send(create_router(state.clone()), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["revalidated"], true);
    assert_eq!(body["data"]["tags"], json!(["posts"]));
    assert_eq!(body["data"]["paths"], json!(["/", "/posts/[slug]"]));

    let (_, _, info) = send(create_router(state), get("/api/revalidate")).await;
    assert_eq!(info["data"]["header"], REVALIDATE_HEADER);
    assert!(info["data"]["last_revalidated_at"].is_string());
}
