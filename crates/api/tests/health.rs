mod common;

use axum::http::{Method, StatusCode};

use common::build_test_app;

#[tokio::test]
async fn health_reports_store_status() {
    let app = build_test_app().await;

    let (status, body) = app.call(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["store_healthy"], true);

    app.store.fail_ping();
    let (status, body) = app.call(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "degraded");
}

#[tokio::test]
async fn responses_carry_a_request_id() {
    let app = build_test_app().await;
    let request = axum::http::Request::builder()
        .uri("/health")
        .body(axum::body::Body::empty())
        .unwrap();

    let response = tower::ServiceExt::oneshot(app.router.clone(), request)
        .await
        .unwrap();
    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn cors_preflight_allows_the_user_header() {
    let app = build_test_app().await;
    let request = axum::http::Request::builder()
        .method(Method::OPTIONS)
        .uri("/api/v1/notifications")
        .header("origin", "http://localhost:8081")
        .header("access-control-request-method", "GET")
        .header("access-control-request-headers", "x-user-id")
        .body(axum::body::Body::empty())
        .unwrap();

    let response = tower::ServiceExt::oneshot(app.router.clone(), request)
        .await
        .unwrap();
    let headers = response.headers();
    assert_eq!(headers["access-control-allow-origin"], "http://localhost:8081");
    assert!(headers["access-control-allow-headers"]
        .to_str()
        .unwrap()
        .contains("x-user-id"));
    assert!(headers.contains_key("x-request-id"));
}
