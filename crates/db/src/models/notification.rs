//! Notification entity models and DTOs.

use pulse_core::types::{DocId, Timestamp};
use serde::Serialize;
use serde_json::json;

use super::event::Event;
use super::fields::{instant, object, Fields};
use crate::collections::NOTIFICATIONS;
use crate::error::DbError;
use crate::store::{Document, DocumentData};

/// A document from the `notifications` collection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub id: DocId,
    pub user_id: DocId,
    pub event_id: Option<DocId>,
    pub title: String,
    pub description: String,
    pub event_venue: Option<String>,
    pub date: Option<Timestamp>,
    pub is_read: bool,
    pub created_at: Timestamp,
}

impl Notification {
    pub fn from_document(doc: &Document) -> Result<Self, DbError> {
        let f = Fields::new(NOTIFICATIONS, doc);
        Ok(Self {
            id: doc.id.clone(),
            user_id: f.required_str("userId")?,
            event_id: f.optional_str("eventId")?,
            title: f.required_str("title")?,
            description: f.optional_str("description")?.unwrap_or_default(),
            event_venue: f.optional_str("eventVenue")?,
            date: f.optional_timestamp("date")?,
            is_read: f.bool_or("isRead", false)?,
            created_at: doc.created_at,
        })
    }
}

/// Title shown for a new-event notification.
pub fn event_title(event_name: &str) -> String {
    format!("New Event: {event_name}")
}

/// Body of a notification about to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct NewNotification {
    pub user_id: DocId,
    pub event_id: Option<DocId>,
    pub title: String,
    pub description: String,
    pub event_venue: Option<String>,
    pub date: Option<Timestamp>,
}

impl NewNotification {
    /// The notification `user_id` receives about `event`.
    pub fn for_event(event: &Event, user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            event_id: Some(event.id.clone()),
            title: event_title(&event.name),
            description: event.description.clone(),
            event_venue: Some(event.venue.clone()),
            date: Some(event.date),
        }
    }

    pub fn to_data(&self) -> DocumentData {
        object(json!({
            "userId": self.user_id,
            "eventId": self.event_id,
            "title": self.title,
            "description": self.description,
            "eventVenue": self.event_venue,
            "date": self.date.as_ref().map(instant),
            "isRead": false,
        }))
    }
}
