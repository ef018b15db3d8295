//! Repository for the `events` collection.

use pulse_core::ids::new_doc_id;

use super::parse_all;
use crate::collections::EVENTS;
use crate::error::DbError;
use crate::models::event::{Event, EventDraft};
use crate::store::{DocumentStore, ListQuery, CREATED_AT};

/// Events are write-once; there is no update or delete.
pub struct EventRepo;

impl EventRepo {
    /// Persist a validated draft attributed to `created_by`.
    pub async fn create(
        store: &dyn DocumentStore,
        draft: &EventDraft,
        created_by: &str,
    ) -> Result<Event, DbError> {
        let doc = store
            .create(EVENTS, &new_doc_id(), draft.to_data(created_by))
            .await?;
        Event::from_document(&doc)
    }

    pub async fn find_by_id(store: &dyn DocumentStore, id: &str) -> Result<Option<Event>, DbError> {
        match store.get(EVENTS, id).await? {
            Some(doc) => Event::from_document(&doc).map(Some),
            None => Ok(None),
        }
    }

    /// List events, newest first.
    pub async fn list(
        store: &dyn DocumentStore,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Event>, DbError> {
        let docs = store
            .list(
                EVENTS,
                &ListQuery::new().order_desc(CREATED_AT).limit(limit).offset(offset),
            )
            .await?;
        parse_all(docs, Event::from_document)
    }
}
