//! Delivery verification: which users have no notification for an event.

use std::collections::HashSet;

use pulse_core::config::NotifyConfig;
use pulse_core::types::DocId;
use pulse_db::repositories::NotificationRepo;
use pulse_db::StoreHandle;
use serde::Serialize;

use crate::directory::UserDirectory;
use crate::error::VerifyError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerificationResult {
    /// `true` iff `missing` is empty.
    pub ok: bool,
    pub total_users: usize,
    /// Distinct recipients holding a notification for the event.
    pub total_notified: usize,
    /// Users without a notification, in directory order.
    pub missing: Vec<DocId>,
}

#[derive(Clone)]
pub struct DeliveryVerifier {
    store: StoreHandle,
    directory: UserDirectory,
}

impl DeliveryVerifier {
    pub fn new(store: StoreHandle, config: &NotifyConfig) -> Self {
        Self {
            directory: UserDirectory::new(store.clone(), config.page_size),
            store,
        }
    }

    /// Compare the full user directory with the event's notifications.
    ///
    /// Both sides are listed to exhaustion; a failed page on either side
    /// yields [`VerifyError::VerificationIncomplete`]. Malformed records are
    /// skipped: a user that cannot be read is not counted, and an unreadable
    /// notification leaves its recipient missing.
    pub async fn verify(&self, event_id: &str) -> Result<VerificationResult, VerifyError> {
        let users = self.directory.list_all_users().await?;
        let notified = self.notified_users(event_id).await?;

        let missing: Vec<DocId> = users
            .iter()
            .filter(|u| !notified.contains(&u.id))
            .map(|u| u.id.clone())
            .collect();

        let result = VerificationResult {
            ok: missing.is_empty(),
            total_users: users.len(),
            total_notified: notified.len(),
            missing,
        };

        tracing::info!(
            event_id,
            total_users = result.total_users,
            total_notified = result.total_notified,
            missing = result.missing.len(),
            "Delivery verified"
        );
        Ok(result)
    }

    async fn notified_users(&self, event_id: &str) -> Result<HashSet<DocId>, VerifyError> {
        let page_size = self.directory.page_size();
        let mut notified = HashSet::new();
        let mut offset = 0i64;

        loop {
            let page = NotificationRepo::list_for_event_page(&*self.store, event_id, offset, page_size)
                .await
                .map_err(|e| VerifyError::VerificationIncomplete(e.to_string()))?;
            let fetched = page.fetched as i64;
            notified.extend(page.items.into_iter().map(|n| n.user_id));

            if fetched < page_size {
                return Ok(notified);
            }
            offset += fetched;
        }
    }
}
