//! Admin endpoints: reconciliation, stats, integrity and roles.

mod common;

use axum::http::{Method, StatusCode};
use pulse_core::roles::Role;
use pulse_db::models::content::NewContent;
use pulse_db::repositories::ContentRepo;
use serde_json::json;

use common::{build_test_app, event_body, seed_user, TestApp, ADMIN_ID};

async fn create_event(app: &TestApp, name: &str) -> String {
    let (status, body) = app
        .call(
            Method::POST,
            "/api/v1/events",
            Some(ADMIN_ID),
            Some(event_body(name)),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    body["data"]["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn admin_endpoints_require_the_admin_role() {
    let app = build_test_app().await;
    seed_user(&app.store, "u1", "acc-1", Role::User).await;

    let (status, body) = app
        .call(Method::GET, "/api/v1/admin/notifications/stats", None, None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHORIZED");

    let (status, body) = app
        .call(Method::GET, "/api/v1/admin/notifications/stats", Some("u1"), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "FORBIDDEN");

    let (status, _) = app
        .call(Method::POST, "/api/v1/admin/integrity/diagnose", Some("u1"), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn verify_and_resend_fills_the_gap_once() {
    let app = build_test_app().await;
    seed_user(&app.store, "u1", "acc-1", Role::User).await;
    seed_user(&app.store, "u2", "acc-2", Role::User).await;
    app.store.fail_create_where("notifications", "userId", "u2");

    let event_id = create_event(&app, "Partial").await;
    app.drain_outbox().await;
    app.store.clear_faults();

    let uri = format!("/api/v1/admin/events/{event_id}/verify-and-resend");
    let (status, body) = app.call(Method::POST, &uri, Some(ADMIN_ID), None).await;
    assert_eq!(status, StatusCode::OK);
    let data = &body["data"];
    assert_eq!(data["verification"]["ok"], false);
    assert_eq!(data["verification"]["total_users"], 3);
    assert_eq!(data["verification"]["missing"], json!(["u2"]));
    assert_eq!(data["resend"]["attempted"], 1);
    assert_eq!(data["resend"]["succeeded"], 1);
    assert_eq!(data["complete"], true);

    let (_, body) = app.call(Method::POST, &uri, Some(ADMIN_ID), None).await;
    assert_eq!(body["data"]["verification"]["ok"], true);
    assert_eq!(body["data"]["resend"]["attempted"], 0);

    let (_, body) = app
        .call(Method::GET, "/api/v1/notifications/unread-count", Some("u2"), None)
        .await;
    assert_eq!(body["data"]["count"], 1);
}

#[tokio::test]
async fn verify_and_resend_of_unknown_event_is_not_found() {
    let app = build_test_app().await;

    let (status, body) = app
        .call(
            Method::POST,
            "/api/v1/admin/events/nope/verify-and-resend",
            Some(ADMIN_ID),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn unreadable_directory_is_service_unavailable() {
    let app = build_test_app().await;
    let event_id = create_event(&app, "Blind").await;
    app.store.fail_lists("notifications");

    let (status, body) = app
        .call(
            Method::POST,
            &format!("/api/v1/admin/events/{event_id}/verify-and-resend"),
            Some(ADMIN_ID),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["code"], "SERVICE_UNAVAILABLE");
}

#[tokio::test]
async fn stats_track_reads() {
    let app = build_test_app().await;
    for (id, account) in [("u1", "acc-1"), ("u2", "acc-2"), ("u3", "acc-3")] {
        seed_user(&app.store, id, account, Role::User).await;
    }
    create_event(&app, "Counted").await;
    app.drain_outbox().await;
    app.call(Method::POST, "/api/v1/notifications/read-all", Some("u1"), None)
        .await;

    let (status, body) = app
        .call(Method::GET, "/api/v1/admin/notifications/stats", Some(ADMIN_ID), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let stats = &body["data"];
    assert_eq!(stats["total_users"], 4);
    assert_eq!(stats["total_notifications"], 4);
    assert_eq!(stats["unread_notifications"], 3);
    assert_eq!(stats["recent_notifications"], 4);
    assert_eq!(stats["read_rate"], 25.0);
}

#[tokio::test]
async fn orphaned_content_is_diagnosed_and_repaired() {
    let app = build_test_app().await;
    seed_user(&app.store, "u1", "acc-1", Role::User).await;
    for (title, creator) in [("mine", Some("u1")), ("alias", Some("acc-1")), ("ghost", Some("ghost-id"))] {
        ContentRepo::create(
            &*app.store,
            &NewContent {
                title: title.into(),
                thumbnail: None,
                video: Some(format!("{title}.mp4")),
                prompt: None,
                creator: creator.map(str::to_string),
            },
        )
        .await
        .unwrap();
    }

    let (status, body) = app
        .call(Method::POST, "/api/v1/admin/integrity/diagnose", Some(ADMIN_ID), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let data = &body["data"];
    assert_eq!(data["total_records"], 3);
    assert_eq!(data["valid"], 1);
    assert_eq!(data["valid_by_alias"], 1);
    assert_eq!(data["health"], "warning");
    assert_eq!(
        data["orphaned"][0]["reason"],
        json!({ "kind": "unknown_user", "detail": "ghost-id" })
    );

    let (status, body) = app
        .call(
            Method::POST,
            "/api/v1/admin/integrity/repair",
            Some(ADMIN_ID),
            Some(json!({ "fallback_user_id": "nobody" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let (status, body) = app
        .call(
            Method::POST,
            "/api/v1/admin/integrity/repair",
            Some(ADMIN_ID),
            Some(json!({ "fallback_user_id": "u1" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["repair"]["attempted"], 1);
    assert_eq!(body["data"]["repair"]["fixed"], 1);

    let (_, body) = app
        .call(Method::POST, "/api/v1/admin/integrity/diagnose", Some(ADMIN_ID), None)
        .await;
    assert_eq!(body["data"]["health"], "healthy");
}

#[tokio::test]
async fn repair_requires_a_fallback_user() {
    let app = build_test_app().await;

    let (status, body) = app
        .call(
            Method::POST,
            "/api/v1/admin/integrity/repair",
            Some(ADMIN_ID),
            Some(json!({ "fallback_user_id": "  " })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn roles_are_changed_by_account_id() {
    let app = build_test_app().await;
    seed_user(&app.store, "u1", "acc-1", Role::User).await;

    let (status, body) = app
        .call(
            Method::PUT,
            "/api/v1/admin/users/acc-1/role",
            Some(ADMIN_ID),
            Some(json!({ "role": "admin" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["id"], "u1");
    assert_eq!(body["data"]["role"], "admin");

    // The role is read per request, so the promotion applies immediately.
    let (status, _) = app
        .call(Method::GET, "/api/v1/admin/notifications/stats", Some("u1"), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app
        .call(
            Method::PUT,
            "/api/v1/admin/users/acc-1/role",
            Some(ADMIN_ID),
            Some(json!({ "role": "owner" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let (status, _) = app
        .call(
            Method::PUT,
            "/api/v1/admin/users/acc-404/role",
            Some(ADMIN_ID),
            Some(json!({ "role": "user" })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
