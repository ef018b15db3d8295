//! Device-facing alerts.
//!
//! Two collaborators sit at the edge of the pipeline:
//!
//! - [`PushGateway`] delivers a [`PushMessage`] to a device push token. The
//!   fan-out prepares one message per recipient that registered a token.
//! - [`LocalAlerter`] shows an immediate alert on the event creator's own
//!   device. It is fire-and-forget; failure never fails event creation.
//!
//! Transport is out of scope for this crate; the bundled implementations
//! only log what they would send.

use async_trait::async_trait;
use futures::future::join_all;
use pulse_db::models::event::Event;
use pulse_db::models::user::User;
use serde::Serialize;
use serde_json::json;

/// `data.type` attached to every new-event alert.
pub const NEW_EVENT_TYPE: &str = "new_event";

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

/// Payload handed to a [`PushGateway`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PushMessage {
    /// Destination device token.
    pub to: String,
    pub title: String,
    pub body: String,
    pub data: serde_json::Value,
    pub sound: &'static str,
}

impl PushMessage {
    pub fn for_event(event: &Event, token: &str) -> Self {
        Self {
            to: token.to_string(),
            title: pulse_db::models::notification::event_title(&event.name),
            body: format!("{} at {}", event.description, event.venue),
            data: json!({
                "eventId": event.id,
                "type": NEW_EVENT_TYPE,
                "eventName": event.name,
                "eventVenue": event.venue,
                "eventDate": event.date,
            }),
            sound: "default",
        }
    }
}

/// Payload handed to a [`LocalAlerter`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocalAlert {
    pub title: String,
    pub body: String,
    pub data: serde_json::Value,
}

impl LocalAlert {
    pub fn for_event(event: &Event) -> Self {
        Self {
            title: pulse_db::models::notification::event_title(&event.name),
            body: format!(
                "{} on {} at {}",
                event.description,
                event.date.format("%Y-%m-%d"),
                event.venue
            ),
            data: json!({ "eventId": event.id, "type": NEW_EVENT_TYPE }),
        }
    }
}

// ---------------------------------------------------------------------------
// Collaborators
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum PushError {
    /// The gateway refused the message (bad token, payload too large).
    #[error("Push rejected: {0}")]
    Rejected(String),

    #[error("Push gateway unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait PushGateway: Send + Sync {
    async fn send(&self, message: &PushMessage) -> Result<(), PushError>;
}

#[async_trait]
pub trait LocalAlerter: Send + Sync {
    /// Alert `user_id`'s own device.
    async fn alert(&self, user_id: &str, alert: &LocalAlert) -> Result<(), PushError>;
}

/// Gateway that records push messages in the log instead of sending them.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingPushGateway;

#[async_trait]
impl PushGateway for LoggingPushGateway {
    async fn send(&self, message: &PushMessage) -> Result<(), PushError> {
        tracing::debug!(
            to = %message.to,
            title = %message.title,
            body = %message.body,
            "Push message prepared"
        );
        Ok(())
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingLocalAlerter;

#[async_trait]
impl LocalAlerter for LoggingLocalAlerter {
    async fn alert(&self, user_id: &str, alert: &LocalAlert) -> Result<(), PushError> {
        tracing::debug!(user_id, title = %alert.title, body = %alert.body, "Local alert");
        Ok(())
    }
}

/// Send the new-event push to every user in `recipients` that registered a
/// token. Send failures are logged and do not stop the others. Returns the
/// number of messages handed to the gateway.
pub async fn send_event_push<'a>(
    gateway: &dyn PushGateway,
    event: &Event,
    recipients: impl IntoIterator<Item = &'a User>,
) -> usize {
    let messages: Vec<PushMessage> = recipients
        .into_iter()
        .filter_map(|u| u.push_token.as_deref().map(|t| PushMessage::for_event(event, t)))
        .collect();

    let outcomes = join_all(messages.iter().map(|m| gateway.send(m))).await;
    for (message, outcome) in messages.iter().zip(&outcomes) {
        if let Err(e) = outcome {
            tracing::warn!(event_id = %event.id, to = %message.to, error = %e, "Push send failed");
        }
    }
    messages.len()
}
