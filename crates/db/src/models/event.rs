//! Event entity models and DTOs.

use pulse_core::types::{DocId, Timestamp};
use serde::{Deserialize, Serialize};
use serde_json::json;
use validator::Validate;

use super::fields::{instant, object, Fields};
use crate::collections::EVENTS;
use crate::error::DbError;
use crate::store::{Document, DocumentData};

/// Status assigned to newly published events.
pub const EVENT_STATUS_ACTIVE: &str = "active";

/// A document from the `events` collection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Event {
    pub id: DocId,
    pub name: String,
    pub description: String,
    pub date: Timestamp,
    pub venue: String,
    pub created_by: DocId,
    pub status: String,
    pub created_at: Timestamp,
}

impl Event {
    pub fn from_document(doc: &Document) -> Result<Self, DbError> {
        let f = Fields::new(EVENTS, doc);
        Ok(Self {
            id: doc.id.clone(),
            name: f.required_str("name")?,
            description: f.optional_str("description")?.unwrap_or_default(),
            date: f.required_timestamp("date")?,
            venue: f.optional_str("venue")?.unwrap_or_default(),
            created_by: f.required_str("createdBy")?,
            status: f
                .optional_str("status")?
                .unwrap_or_else(|| EVENT_STATUS_ACTIVE.to_string()),
            created_at: doc.created_at,
        })
    }
}

/// Admin-submitted event fields, validated before anything is persisted.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct EventDraft {
    #[validate(length(min = 1, max = 200, message = "name must be 1-200 characters"))]
    pub name: String,
    #[validate(length(max = 2000, message = "description must be at most 2000 characters"))]
    #[serde(default)]
    pub description: String,
    pub date: Timestamp,
    #[validate(length(min = 1, max = 200, message = "venue must be 1-200 characters"))]
    pub venue: String,
}

impl EventDraft {
    /// Body of the event document, attributed to `created_by`.
    pub fn to_data(&self, created_by: &str) -> DocumentData {
        object(json!({
            "name": self.name.trim(),
            "description": self.description.trim(),
            "date": instant(&self.date),
            "venue": self.venue.trim(),
            "createdBy": created_by,
            "status": EVENT_STATUS_ACTIVE,
        }))
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    fn draft(name: &str, venue: &str) -> EventDraft {
        EventDraft {
            name: name.into(),
            description: "Live set".into(),
            date: Utc.with_ymd_and_hms(2026, 11, 1, 20, 0, 0).unwrap(),
            venue: venue.into(),
        }
    }

    #[test]
    fn draft_validation_rejects_empty_name_and_venue() {
        assert!(draft("Gig", "Hall").validate().is_ok());

        let errors = draft("", "").validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("name"));
        assert!(fields.contains_key("venue"));
    }

    #[test]
    fn draft_body_parses_back_into_event() {
        let d = draft("  Gig ", "Hall");
        let doc = Document {
            id: "e1".into(),
            data: d.to_data("admin-1"),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let event = Event::from_document(&doc).unwrap();
        assert_eq!(event.name, "Gig");
        assert_eq!(event.created_by, "admin-1");
        assert_eq!(event.status, EVENT_STATUS_ACTIVE);
        assert_eq!(event.date, d.date);
    }
}
