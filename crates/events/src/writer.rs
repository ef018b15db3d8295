//! Best-effort batched notification writes.
//!
//! Recipients are split into fixed-size batches. The creates of one batch
//! are issued concurrently and awaited together; the writer then pauses
//! for the inter-batch delay before starting the next batch (not after the
//! last one). A failed create is recorded against its recipient and never
//! stops the remaining writes.

use std::time::Duration;

use futures::future::join_all;
use pulse_core::config::NotifyConfig;
use pulse_core::types::DocId;
use pulse_db::models::event::Event;
use pulse_db::models::notification::NewNotification;
use pulse_db::repositories::NotificationRepo;
use pulse_db::StoreHandle;

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Written by this call.
    Created,
    /// Written by an earlier run; the deterministic id collided.
    AlreadyPresent,
    Failed(String),
}

impl WriteOutcome {
    /// `true` if the recipient holds the notification after the write.
    pub fn is_delivered(&self) -> bool {
        !matches!(self, WriteOutcome::Failed(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipientResult {
    pub user_id: DocId,
    pub outcome: WriteOutcome,
}

/// A single recipient whose notification could not be written.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Failed to write notification for {recipient}: {cause}")]
pub struct WriteFailed {
    pub recipient: DocId,
    pub cause: String,
}

/// Per-recipient outcomes of one [`NotificationWriter::write_notifications`] call,
/// in recipient order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchResult {
    pub results: Vec<RecipientResult>,
}

impl BatchResult {
    /// Recipients holding the notification, whether written now or before.
    pub fn created(&self) -> usize {
        self.results.iter().filter(|r| r.outcome.is_delivered()).count()
    }

    pub fn already_present(&self) -> usize {
        self.results
            .iter()
            .filter(|r| r.outcome == WriteOutcome::AlreadyPresent)
            .count()
    }

    pub fn failed(&self) -> usize {
        self.results.len() - self.created()
    }

    pub fn failures(&self) -> impl Iterator<Item = WriteFailed> + '_ {
        self.results.iter().filter_map(|r| match &r.outcome {
            WriteOutcome::Failed(cause) => Some(WriteFailed {
                recipient: r.user_id.clone(),
                cause: cause.clone(),
            }),
            WriteOutcome::Created | WriteOutcome::AlreadyPresent => None,
        })
    }

    /// Ids of recipients written by this call. Recipients that already held
    /// the notification are left out, so side effects such as push are not
    /// repeated on a re-run.
    pub fn newly_created_ids(&self) -> impl Iterator<Item = &str> {
        self.results
            .iter()
            .filter(|r| r.outcome == WriteOutcome::Created)
            .map(|r| r.user_id.as_str())
    }
}

// ---------------------------------------------------------------------------
// NotificationWriter
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct NotificationWriter {
    store: StoreHandle,
    batch_size: usize,
    batch_delay: Duration,
}

impl NotificationWriter {
    pub fn new(store: StoreHandle, config: &NotifyConfig) -> Self {
        Self {
            store,
            batch_size: config.batch_size.max(1),
            batch_delay: config.batch_delay,
        }
    }

    /// Write one notification about `event` to each recipient.
    pub async fn write_notifications(&self, event: &Event, recipients: &[DocId]) -> BatchResult {
        let batches: Vec<&[DocId]> = recipients.chunks(self.batch_size).collect();
        let batch_count = batches.len();
        let mut result = BatchResult {
            results: Vec::with_capacity(recipients.len()),
        };

        for (index, batch) in batches.into_iter().enumerate() {
            let outcomes = join_all(batch.iter().map(|user_id| self.write_one(event, user_id))).await;

            let failed = outcomes
                .iter()
                .filter(|o| matches!(o, WriteOutcome::Failed(_)))
                .count();
            tracing::debug!(
                event_id = %event.id,
                batch = index + 1,
                of = batch_count,
                size = batch.len(),
                failed,
                "Notification batch settled"
            );

            result
                .results
                .extend(batch.iter().zip(outcomes).map(|(user_id, outcome)| RecipientResult {
                    user_id: user_id.clone(),
                    outcome,
                }));

            if index + 1 < batch_count {
                tokio::time::sleep(self.batch_delay).await;
            }
        }

        result
    }

    async fn write_one(&self, event: &Event, user_id: &str) -> WriteOutcome {
        let new = NewNotification::for_event(event, user_id);
        match NotificationRepo::create(&*self.store, &new).await {
            Ok(_) => WriteOutcome::Created,
            Err(e) if e.is_already_exists() => {
                tracing::debug!(event_id = %event.id, user_id, "Notification already present");
                WriteOutcome::AlreadyPresent
            }
            Err(e) => {
                tracing::warn!(event_id = %event.id, user_id, error = %e, "Notification write failed");
                WriteOutcome::Failed(e.to_string())
            }
        }
    }
}
