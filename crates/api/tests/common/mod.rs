//! Shared fixtures for HTTP tests: the production router over a
//! [`MemoryStore`], plus request helpers.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use pulse_core::config::{IntegrityConfig, NotifyConfig, OutboxConfig};
use pulse_core::roles::Role;
use pulse_db::models::user::CreateUser;
use pulse_db::repositories::UserRepo;
use pulse_db::MemoryStore;
use pulse_events::NotifyServices;
use serde_json::Value;
use tower::ServiceExt;

use pulse_api::config::ServerConfig;
use pulse_api::router::build_app_router;
use pulse_api::state::AppState;

pub const ADMIN_ID: &str = "admin-1";
pub const ADMIN_ACCOUNT: &str = "acc-admin";

/// Test `ServerConfig` with the dev CORS origin and a 30-second timeout.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:8081".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 5,
    }
}

/// Fan-out without pacing so tests drain the outbox immediately.
pub fn fast_notify_config() -> NotifyConfig {
    NotifyConfig {
        batch_delay: Duration::ZERO,
        settling_delay: Duration::ZERO,
        ..NotifyConfig::default()
    }
}

pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
    pub services: NotifyServices,
}

impl TestApp {
    /// Send a request as `user` (a user id or account id, or `None` for an
    /// anonymous request) and return the status with the parsed JSON body
    /// (`Value::Null` for empty bodies).
    pub async fn call(
        &self,
        method: Method,
        uri: &str,
        user: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(user) = user {
            builder = builder.header("x-user-id", user);
        }
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    /// Run every due outbox task (fan-out, then verification).
    pub async fn drain_outbox(&self) -> usize {
        self.services
            .worker(OutboxConfig::default())
            .drain_once()
            .await
            .unwrap()
    }
}

/// Build the full application router with all middleware layers over a
/// fresh in-memory store seeded with one admin.
pub async fn build_test_app() -> TestApp {
    let store = Arc::new(MemoryStore::new());
    seed_user(&store, ADMIN_ID, ADMIN_ACCOUNT, Role::Admin).await;

    let services = NotifyServices::new(store.clone(), fast_notify_config());
    let config = test_config();
    let state = AppState::new(
        store.clone(),
        config.clone(),
        services.clone(),
        IntegrityConfig::default(),
    );

    TestApp {
        router: build_app_router(state, &config),
        store,
        services,
    }
}

pub async fn seed_user(store: &MemoryStore, id: &str, account_id: &str, role: Role) {
    UserRepo::create_with_id(
        store,
        id,
        &CreateUser {
            account_id: account_id.into(),
            username: id.into(),
            email: None,
            role,
        },
    )
    .await
    .unwrap();
}

pub fn event_body(name: &str) -> Value {
    serde_json::json!({
        "name": name,
        "description": "Live set",
        "date": "2026-12-05T19:30:00Z",
        "venue": "Hall A",
    })
}
