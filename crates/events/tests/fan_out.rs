//! Fan-out, verification and resend against the in-memory store.

mod common;

use std::sync::Arc;

use assert_matches::assert_matches;
use pulse_core::config::NotifyConfig;
use pulse_db::repositories::UserRepo;
use pulse_events::{
    DeliveryVerifier, FanOutError, FanOutOrchestrator, FanOutReport, ResendCoordinator,
    ResendReport, VerifyError,
};
use serde_json::json;

use common::*;

#[tokio::test(start_paused = true)]
async fn complete_fan_out_verifies_clean() {
    let store = store();
    seed_users(&store, 23).await;
    let event = seed_event(&store).await;

    let report = FanOutOrchestrator::new(store.clone(), &config())
        .fan_out(&event)
        .await
        .unwrap();
    assert_eq!(report.total_users, 23);
    assert_eq!(report.created, 23);
    assert_eq!(report.failed, 0);

    let verification = DeliveryVerifier::new(store.clone(), &config())
        .verify(&event.id)
        .await
        .unwrap();
    assert!(verification.ok);
    assert_eq!(verification.total_notified, 23);
    assert!(verification.missing.is_empty());
}

#[tokio::test(start_paused = true)]
async fn one_failure_among_twelve_is_found_and_resent() {
    let store = store();
    seed_users(&store, 12).await;
    let event = seed_event(&store).await;
    store.fail_create_where("notifications", "userId", user_id(7));

    let report = FanOutOrchestrator::new(store.clone(), &config())
        .fan_out(&event)
        .await
        .unwrap();
    assert_eq!(
        report,
        FanOutReport {
            total_users: 12,
            created: 11,
            failed: 1,
            push_prepared: 0,
        }
    );

    let verifier = DeliveryVerifier::new(store.clone(), &config());
    let verification = verifier.verify(&event.id).await.unwrap();
    assert!(!verification.ok);
    assert_eq!(verification.missing, [user_id(7)]);

    store.clear_faults();
    let resend = ResendCoordinator::new(store.clone(), &config());
    assert_eq!(
        resend.resend_missing(&event.id).await.unwrap(),
        ResendReport {
            attempted: 1,
            succeeded: 1,
            push_prepared: 0,
        }
    );

    assert!(verifier.verify(&event.id).await.unwrap().ok);

    // Nothing left to do the second time round.
    assert_eq!(
        resend.resend_missing(&event.id).await.unwrap(),
        ResendReport::default()
    );
}

#[tokio::test(start_paused = true)]
async fn double_fan_out_creates_no_duplicates() {
    let store = store();
    seed_users(&store, 15).await;
    let event = seed_event(&store).await;
    let orchestrator = FanOutOrchestrator::new(store.clone(), &config());

    orchestrator.fan_out(&event).await.unwrap();
    let second = orchestrator.fan_out(&event).await.unwrap();

    assert_eq!(second.created, 15);
    assert_eq!(store.len("notifications"), 15);
}

#[tokio::test(start_paused = true)]
async fn directory_failure_aborts_fan_out() {
    let store = store();
    seed_users(&store, 5).await;
    let event = seed_event(&store).await;
    store.fail_lists("users");

    let err = FanOutOrchestrator::new(store.clone(), &config())
        .fan_out(&event)
        .await
        .unwrap_err();
    assert_matches!(err, FanOutError::Directory(_));
    assert!(store.is_empty("notifications"));
}

#[tokio::test(start_paused = true)]
async fn unreadable_notifications_make_verification_incomplete() {
    let store = store();
    seed_users(&store, 3).await;
    let event = seed_event(&store).await;
    store.fail_lists("notifications");

    let err = DeliveryVerifier::new(store.clone(), &config())
        .verify(&event.id)
        .await
        .unwrap_err();
    assert_matches!(err, VerifyError::VerificationIncomplete(_));
}

#[tokio::test(start_paused = true)]
async fn resend_for_unknown_event_is_not_found() {
    let store = store();
    seed_users(&store, 2).await;

    let err = ResendCoordinator::new(store.clone(), &config())
        .resend_missing("no-such-event")
        .await
        .unwrap_err();
    assert_matches!(err, VerifyError::EventNotFound(id) if id == "no-such-event");
}

#[tokio::test(start_paused = true)]
async fn push_messages_go_to_users_with_tokens() {
    let store = store();
    seed_users(&store, 4).await;
    UserRepo::update_push_token(&*store, &user_id(2), Some("ExponentPushToken[two]"))
        .await
        .unwrap();
    UserRepo::update_push_token(&*store, &user_id(4), Some("ExponentPushToken[four]"))
        .await
        .unwrap();
    let event = seed_event(&store).await;

    let gateway = Arc::new(RecordingGateway::default());
    let report = FanOutOrchestrator::new(store.clone(), &config())
        .with_push_gateway(gateway.clone())
        .fan_out(&event)
        .await
        .unwrap();

    assert_eq!(report.push_prepared, 2);
    let sent = gateway.sent.lock().unwrap();
    let mut tokens: Vec<_> = sent.iter().map(|m| m.to.as_str()).collect();
    tokens.sort();
    assert_eq!(tokens, ["ExponentPushToken[four]", "ExponentPushToken[two]"]);
    assert_eq!(sent[0].title, "New Event: Winter Showcase");
}

#[tokio::test(start_paused = true)]
async fn repeated_fan_out_pushes_each_token_once() {
    let store = store();
    seed_users(&store, 3).await;
    UserRepo::update_push_token(&*store, &user_id(1), Some("ExponentPushToken[one]"))
        .await
        .unwrap();
    let event = seed_event(&store).await;

    let gateway = Arc::new(RecordingGateway::default());
    let orchestrator = FanOutOrchestrator::new(store.clone(), &config())
        .with_push_gateway(gateway.clone());

    let first = orchestrator.fan_out(&event).await.unwrap();
    let second = orchestrator.fan_out(&event).await.unwrap();

    assert_eq!(first.push_prepared, 1);
    assert_eq!(second.push_prepared, 0);
    assert_eq!(second.created, 3);
    assert_eq!(gateway.sent.lock().unwrap().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn malformed_user_is_skipped_without_cutting_paging_short() {
    let store = store();
    seed_users(&store, 6).await;
    seed_malformed(&store, "users", "broken", json!({"username": "no-account"})).await;
    seed_user_range(&store, 7..=12).await;
    let event = seed_event(&store).await;
    let config = NotifyConfig {
        page_size: 5,
        ..config()
    };

    let report = FanOutOrchestrator::new(store.clone(), &config)
        .fan_out(&event)
        .await
        .unwrap();
    assert_eq!(report.total_users, 12);
    assert_eq!(report.created, 12);
    assert_eq!(report.failed, 0);
    assert_eq!(store.len("notifications"), 12);

    let verification = DeliveryVerifier::new(store.clone(), &config)
        .verify(&event.id)
        .await
        .unwrap();
    assert!(verification.ok);
    assert_eq!(verification.total_users, 12);
}

#[tokio::test(start_paused = true)]
async fn malformed_notification_leaves_its_recipient_missing() {
    let store = store();
    seed_users(&store, 3).await;
    let event = seed_event(&store).await;
    store.fail_create_where("notifications", "userId", user_id(2));
    FanOutOrchestrator::new(store.clone(), &config())
        .fan_out(&event)
        .await
        .unwrap();
    store.clear_faults();
    // Matches the event but lacks a recipient.
    seed_malformed(
        &store,
        "notifications",
        "stray",
        json!({"eventId": event.id, "title": "New Event: Winter Showcase"}),
    )
    .await;

    let verification = DeliveryVerifier::new(store.clone(), &config())
        .verify(&event.id)
        .await
        .unwrap();
    assert!(!verification.ok);
    assert_eq!(verification.total_notified, 2);
    assert_eq!(verification.missing, [user_id(2)]);
}

#[tokio::test(start_paused = true)]
async fn resend_pushes_to_recovered_recipients_only() {
    let store = store();
    seed_users(&store, 4).await;
    for n in [1, 3] {
        UserRepo::update_push_token(&*store, &user_id(n), Some(&format!("ExponentPushToken[{n}]")))
            .await
            .unwrap();
    }
    let event = seed_event(&store).await;
    let gateway = Arc::new(RecordingGateway::default());

    store.fail_create_where("notifications", "userId", user_id(3));
    let report = FanOutOrchestrator::new(store.clone(), &config())
        .with_push_gateway(gateway.clone())
        .fan_out(&event)
        .await
        .unwrap();
    assert_eq!(report.push_prepared, 1);
    store.clear_faults();

    let resend = ResendCoordinator::new(store.clone(), &config())
        .with_push_gateway(gateway.clone())
        .resend_missing(&event.id)
        .await
        .unwrap();
    assert_eq!(
        resend,
        ResendReport {
            attempted: 1,
            succeeded: 1,
            push_prepared: 1,
        }
    );

    let sent = gateway.sent.lock().unwrap();
    let tokens: Vec<_> = sent.iter().map(|m| m.to.as_str()).collect();
    assert_eq!(tokens, ["ExponentPushToken[1]", "ExponentPushToken[3]"]);
}
