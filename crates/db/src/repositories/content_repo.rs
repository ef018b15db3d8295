//! Repository for content records (video posts).

use pulse_core::ids::new_doc_id;
use serde_json::json;

use super::parse_all;
use crate::collections::CONTENT;
use crate::error::DbError;
use crate::models::content::{ContentRecord, NewContent};
use crate::models::fields::object;
use crate::store::{DocumentStore, ListQuery};

pub struct ContentRepo;

impl ContentRepo {
    pub async fn create(
        store: &dyn DocumentStore,
        new: &NewContent,
    ) -> Result<ContentRecord, DbError> {
        let doc = store.create(CONTENT, &new_doc_id(), new.to_data()).await?;
        ContentRecord::from_document(&doc)
    }

    pub async fn find_by_id(
        store: &dyn DocumentStore,
        id: &str,
    ) -> Result<Option<ContentRecord>, DbError> {
        match store.get(CONTENT, id).await? {
            Some(doc) => ContentRecord::from_document(&doc).map(Some),
            None => Ok(None),
        }
    }

    /// One page of records in creation order.
    pub async fn list_page(
        store: &dyn DocumentStore,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<ContentRecord>, DbError> {
        let docs = store
            .list(CONTENT, &ListQuery::new().limit(limit).offset(offset))
            .await?;
        parse_all(docs, ContentRecord::from_document)
    }

    /// Point a record's `creator` at `user_id`.
    ///
    /// Returns `false` if the record no longer exists.
    pub async fn update_creator(
        store: &dyn DocumentStore,
        id: &str,
        user_id: &str,
    ) -> Result<bool, DbError> {
        let patch = object(json!({ "creator": user_id }));
        Ok(store.update(CONTENT, id, patch).await?.is_some())
    }
}
