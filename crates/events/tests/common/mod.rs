//! Shared fixtures for pipeline tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use pulse_core::config::NotifyConfig;
use pulse_core::roles::Role;
use pulse_db::models::event::{Event, EventDraft};
use pulse_db::models::user::CreateUser;
use pulse_db::repositories::{EventRepo, UserRepo};
use pulse_db::{DocumentStore, MemoryStore};
use pulse_events::push::{LocalAlert, LocalAlerter, PushError, PushGateway, PushMessage};

pub fn store() -> Arc<MemoryStore> {
    Arc::new(MemoryStore::new())
}

/// Id of the `n`th seeded user (1-based).
pub fn user_id(n: usize) -> String {
    format!("u{n:02}")
}

/// Seed `n` users with ids `u01..`, account ids `acc-01..`.
pub async fn seed_users(store: &MemoryStore, n: usize) {
    seed_user_range(store, 1..=n).await;
}

pub async fn seed_user_range(store: &MemoryStore, range: std::ops::RangeInclusive<usize>) {
    for i in range {
        UserRepo::create_with_id(
            store,
            &user_id(i),
            &CreateUser {
                account_id: format!("acc-{i:02}"),
                username: format!("user{i}"),
                email: None,
                role: Role::User,
            },
        )
        .await
        .unwrap();
    }
}

/// Insert a raw document that no model can parse.
pub async fn seed_malformed(store: &MemoryStore, collection: &str, id: &str, body: serde_json::Value) {
    let serde_json::Value::Object(data) = body else {
        panic!("document body must be an object");
    };
    store.create(collection, id, data).await.unwrap();
}

pub async fn seed_admin(store: &MemoryStore, id: &str, account_id: &str) {
    UserRepo::create_with_id(
        store,
        id,
        &CreateUser {
            account_id: account_id.into(),
            username: "admin".into(),
            email: None,
            role: Role::Admin,
        },
    )
    .await
    .unwrap();
}

pub fn draft() -> EventDraft {
    EventDraft {
        name: "Winter Showcase".into(),
        description: "Student films".into(),
        date: Utc.with_ymd_and_hms(2026, 12, 12, 18, 0, 0).unwrap(),
        venue: "Main Hall".into(),
    }
}

pub async fn seed_event(store: &MemoryStore) -> Event {
    EventRepo::create(store, &draft(), "admin").await.unwrap()
}

pub fn config() -> NotifyConfig {
    NotifyConfig::default()
}

#[derive(Default)]
pub struct RecordingGateway {
    pub sent: Mutex<Vec<PushMessage>>,
}

#[async_trait]
impl PushGateway for RecordingGateway {
    async fn send(&self, message: &PushMessage) -> Result<(), PushError> {
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingAlerter {
    pub alerts: Mutex<Vec<(String, LocalAlert)>>,
    pub fail: bool,
}

#[async_trait]
impl LocalAlerter for RecordingAlerter {
    async fn alert(&self, user_id: &str, alert: &LocalAlert) -> Result<(), PushError> {
        if self.fail {
            return Err(PushError::Unavailable("device offline".into()));
        }
        self.alerts
            .lock()
            .unwrap()
            .push((user_id.to_string(), alert.clone()));
        Ok(())
    }
}
