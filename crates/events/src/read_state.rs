//! Recipient-side notification operations.
//!
//! Every operation is scoped to the acting user: a notification owned by
//! someone else is reported as not found.

use pulse_db::models::notification::Notification;
use pulse_db::repositories::NotificationRepo;
use pulse_db::StoreHandle;

use crate::error::ReadStateError;

#[derive(Clone)]
pub struct ReadStateStore {
    store: StoreHandle,
}

impl ReadStateStore {
    pub fn new(store: StoreHandle) -> Self {
        Self { store }
    }

    /// Newest first.
    pub async fn list_for_user(
        &self,
        user_id: &str,
        unread_only: bool,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Notification>, ReadStateError> {
        Ok(NotificationRepo::list_for_user(&*self.store, user_id, unread_only, limit, offset).await?)
    }

    pub async fn mark_read(&self, user_id: &str, id: &str) -> Result<(), ReadStateError> {
        self.owned(user_id, id).await?;
        if NotificationRepo::mark_read(&*self.store, id).await? {
            Ok(())
        } else {
            Err(ReadStateError::NotFound(id.to_string()))
        }
    }

    /// Returns the number of notifications that changed.
    pub async fn mark_all_read(&self, user_id: &str) -> Result<u64, ReadStateError> {
        let changed = NotificationRepo::mark_all_read(&*self.store, user_id).await?;
        tracing::debug!(user_id, changed, "Marked all notifications read");
        Ok(changed)
    }

    pub async fn delete(&self, user_id: &str, id: &str) -> Result<(), ReadStateError> {
        self.owned(user_id, id).await?;
        if NotificationRepo::delete(&*self.store, id).await? {
            Ok(())
        } else {
            Err(ReadStateError::NotFound(id.to_string()))
        }
    }

    /// Always recounted from the store.
    pub async fn unread_count(&self, user_id: &str) -> Result<u64, ReadStateError> {
        Ok(NotificationRepo::unread_count(&*self.store, user_id).await?)
    }

    async fn owned(&self, user_id: &str, id: &str) -> Result<Notification, ReadStateError> {
        match NotificationRepo::find_by_id(&*self.store, id).await? {
            Some(n) if n.user_id == user_id => Ok(n),
            _ => Err(ReadStateError::NotFound(id.to_string())),
        }
    }
}
