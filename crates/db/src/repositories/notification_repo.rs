//! Repository for the `notifications` collection.

use chrono::Utc;
use pulse_core::ids::{new_doc_id, notification_id};
use pulse_core::types::{DocId, Timestamp};
use serde_json::json;

use super::{parse_all, parse_page, Page};
use crate::collections::NOTIFICATIONS;
use crate::error::DbError;
use crate::models::fields::{instant, object};
use crate::models::notification::{NewNotification, Notification};
use crate::store::{DocumentStore, Filter, ListQuery, CREATED_AT};

const USER_ID: &str = "userId";
const EVENT_ID: &str = "eventId";
const IS_READ: &str = "isRead";

/// Unread notifications updated per round of [`NotificationRepo::mark_all_read`].
const MARK_ALL_PAGE: i64 = 100;

/// Provides CRUD operations for notifications.
pub struct NotificationRepo;

impl NotificationRepo {
    /// Id under which `new` is stored: derived from `(eventId, userId)` for
    /// event notifications, random otherwise.
    pub fn id_for(new: &NewNotification) -> DocId {
        match &new.event_id {
            Some(event_id) => notification_id(event_id, &new.user_id),
            None => new_doc_id(),
        }
    }

    /// Write a notification.
    ///
    /// A second write for the same event and user fails with a store
    /// `AlreadyExists` error (see [`DbError::is_already_exists`]).
    pub async fn create(
        store: &dyn DocumentStore,
        new: &NewNotification,
    ) -> Result<Notification, DbError> {
        let doc = store
            .create(NOTIFICATIONS, &Self::id_for(new), new.to_data())
            .await?;
        Notification::from_document(&doc)
    }

    pub async fn find_by_id(
        store: &dyn DocumentStore,
        id: &str,
    ) -> Result<Option<Notification>, DbError> {
        match store.get(NOTIFICATIONS, id).await? {
            Some(doc) => Notification::from_document(&doc).map(Some),
            None => Ok(None),
        }
    }

    /// One page of the notifications written for `event_id`. Malformed
    /// records are skipped.
    pub async fn list_for_event_page(
        store: &dyn DocumentStore,
        event_id: &str,
        offset: i64,
        limit: i64,
    ) -> Result<Page<Notification>, DbError> {
        let docs = store
            .list(
                NOTIFICATIONS,
                &ListQuery::new()
                    .equal(EVENT_ID, event_id)
                    .limit(limit)
                    .offset(offset),
            )
            .await?;
        Ok(parse_page(NOTIFICATIONS, docs, Notification::from_document))
    }

    /// List notifications for a user, newest first.
    ///
    /// When `unread_only` is `true`, only notifications with `isRead = false`
    /// are returned.
    pub async fn list_for_user(
        store: &dyn DocumentStore,
        user_id: &str,
        unread_only: bool,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Notification>, DbError> {
        let mut query = ListQuery::new().equal(USER_ID, user_id);
        if unread_only {
            query = query.equal(IS_READ, false);
        }
        let docs = store
            .list(
                NOTIFICATIONS,
                &query.order_desc(CREATED_AT).limit(limit).offset(offset),
            )
            .await?;
        parse_all(docs, Notification::from_document)
    }

    /// Mark a single notification as read.
    ///
    /// Returns `false` if the notification does not exist.
    pub async fn mark_read(store: &dyn DocumentStore, id: &str) -> Result<bool, DbError> {
        let patch = object(json!({ IS_READ: true }));
        Ok(store.update(NOTIFICATIONS, id, patch).await?.is_some())
    }

    /// Mark all unread notifications as read for a user.
    ///
    /// Returns the number of notifications that were marked read.
    pub async fn mark_all_read(store: &dyn DocumentStore, user_id: &str) -> Result<u64, DbError> {
        let query = ListQuery::new()
            .equal(USER_ID, user_id)
            .equal(IS_READ, false)
            .limit(MARK_ALL_PAGE);

        let mut changed = 0u64;
        loop {
            // Marked documents drop out of the filter, so always read offset 0.
            let page = store.list(NOTIFICATIONS, &query).await?;
            let fetched = page.len();
            for doc in page {
                let patch = object(json!({ IS_READ: true }));
                if store.update(NOTIFICATIONS, &doc.id, patch).await?.is_some() {
                    changed += 1;
                }
            }
            if (fetched as i64) < MARK_ALL_PAGE {
                return Ok(changed);
            }
        }
    }

    /// Delete a notification. Returns `false` if it did not exist.
    pub async fn delete(store: &dyn DocumentStore, id: &str) -> Result<bool, DbError> {
        Ok(store.delete(NOTIFICATIONS, id).await?)
    }

    /// Count unread notifications for a user.
    pub async fn unread_count(store: &dyn DocumentStore, user_id: &str) -> Result<u64, DbError> {
        let filters = [
            Filter::Equal(USER_ID.into(), json!(user_id)),
            Filter::Equal(IS_READ.into(), json!(false)),
        ];
        Ok(store.count(NOTIFICATIONS, &filters).await?)
    }

    // -----------------------------------------------------------------------
    // Aggregates
    // -----------------------------------------------------------------------

    pub async fn count_all(store: &dyn DocumentStore) -> Result<u64, DbError> {
        Ok(store.count(NOTIFICATIONS, &[]).await?)
    }

    pub async fn count_unread(store: &dyn DocumentStore) -> Result<u64, DbError> {
        let filters = [Filter::Equal(IS_READ.into(), json!(false))];
        Ok(store.count(NOTIFICATIONS, &filters).await?)
    }

    /// Count notifications created strictly after `since`.
    pub async fn count_created_since(
        store: &dyn DocumentStore,
        since: Timestamp,
    ) -> Result<u64, DbError> {
        let filters = [Filter::GreaterThan(CREATED_AT.into(), json!(instant(&since)))];
        Ok(store.count(NOTIFICATIONS, &filters).await?)
    }

    /// Count notifications created within the last `days` days.
    pub async fn count_recent(store: &dyn DocumentStore, days: i64) -> Result<u64, DbError> {
        Self::count_created_since(store, Utc::now() - chrono::Duration::days(days)).await
    }
}
