//! Repository for the `outbox` collection.

use pulse_core::types::Timestamp;
use serde_json::json;

use super::parse_all;
use crate::collections::OUTBOX;
use crate::error::DbError;
use crate::models::fields::object;
use crate::models::outbox::{new_task_data, OutboxTask, TaskKind, TaskStatus};
use crate::store::{DocumentStore, ListQuery};

const STATUS: &str = "status";
const RUN_AFTER_MS: &str = "runAfterMs";

/// Persistence for deferred fan-out and verification tasks.
pub struct OutboxRepo;

impl OutboxRepo {
    /// Enqueue a task due at `run_after`.
    ///
    /// Task ids are deterministic per `(kind, event_id)`; enqueueing a task
    /// that already exists is a no-op and returns `false`.
    pub async fn enqueue(
        store: &dyn DocumentStore,
        kind: TaskKind,
        event_id: &str,
        run_after: Timestamp,
    ) -> Result<bool, DbError> {
        let id = OutboxTask::task_id(kind, event_id);
        match store
            .create(OUTBOX, &id, new_task_data(kind, event_id, run_after))
            .await
        {
            Ok(_) => Ok(true),
            Err(e) => {
                let err = DbError::from(e);
                if err.is_already_exists() {
                    Ok(false)
                } else {
                    Err(err)
                }
            }
        }
    }

    pub async fn find_by_id(
        store: &dyn DocumentStore,
        id: &str,
    ) -> Result<Option<OutboxTask>, DbError> {
        match store.get(OUTBOX, id).await? {
            Some(doc) => OutboxTask::from_document(&doc).map(Some),
            None => Ok(None),
        }
    }

    /// Pending tasks whose `run_after` is at or before `now`, earliest first.
    pub async fn list_due(
        store: &dyn DocumentStore,
        now: Timestamp,
        limit: i64,
    ) -> Result<Vec<OutboxTask>, DbError> {
        let query = ListQuery::new()
            .equal(STATUS, TaskStatus::Pending.as_str())
            .less_than_or_equal(RUN_AFTER_MS, now.timestamp_millis())
            .order_asc(RUN_AFTER_MS)
            .limit(limit);
        let docs = store.list(OUTBOX, &query).await?;
        parse_all(docs, OutboxTask::from_document)
    }

    pub async fn mark_done(store: &dyn DocumentStore, task: &OutboxTask) -> Result<(), DbError> {
        let patch = object(json!({
            STATUS: TaskStatus::Done.as_str(),
            "attempts": task.attempts + 1,
            "lastError": null,
        }));
        store.update(OUTBOX, &task.id, patch).await?;
        Ok(())
    }

    /// Record a failed attempt.
    ///
    /// With `retry_at` the task stays pending and becomes due again then;
    /// without it the task is marked failed for good.
    pub async fn record_failure(
        store: &dyn DocumentStore,
        task: &OutboxTask,
        error: &str,
        retry_at: Option<Timestamp>,
    ) -> Result<(), DbError> {
        let mut patch = object(json!({
            "attempts": task.attempts + 1,
            "lastError": error,
        }));
        match retry_at {
            Some(at) => {
                patch.insert(RUN_AFTER_MS.into(), json!(at.timestamp_millis()));
            }
            None => {
                patch.insert(STATUS.into(), json!(TaskStatus::Failed.as_str()));
            }
        }
        store.update(OUTBOX, &task.id, patch).await?;
        Ok(())
    }
}
