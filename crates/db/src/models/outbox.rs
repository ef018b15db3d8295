//! Outbox task records: deferred fan-out and verification work.

use std::fmt;
use std::str::FromStr;

use chrono::{TimeZone, Utc};
use pulse_core::types::{DocId, Timestamp};
use serde::Serialize;
use serde_json::json;

use super::fields::{object, Fields};
use crate::collections::OUTBOX;
use crate::error::DbError;
use crate::store::{Document, DocumentData};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    /// Write one notification per user for an event.
    FanOut,
    /// Check an event's delivery and resend to whoever is missing.
    Verify,
}

impl TaskKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::FanOut => "fan_out",
            Self::Verify => "verify",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fan_out" => Ok(Self::FanOut),
            "verify" => Ok(Self::Verify),
            other => Err(format!("unknown task kind '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Done,
    /// Gave up after the configured number of attempts.
    Failed,
}

impl TaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }
}

impl FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "done" => Ok(Self::Done),
            "failed" => Ok(Self::Failed),
            other => Err(format!("unknown task status '{other}'")),
        }
    }
}

/// A document from the `outbox` collection.
///
/// `run_after` is stored as epoch milliseconds (`runAfterMs`) so the due
/// filter is a numeric comparison in every backend.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutboxTask {
    pub id: DocId,
    pub kind: TaskKind,
    pub event_id: DocId,
    pub status: TaskStatus,
    pub attempts: u32,
    pub last_error: Option<String>,
    pub run_after: Timestamp,
    pub created_at: Timestamp,
}

impl OutboxTask {
    /// Deterministic id: one task of each kind per event.
    pub fn task_id(kind: TaskKind, event_id: &str) -> DocId {
        format!("{}-{event_id}", kind.as_str())
    }

    pub fn from_document(doc: &Document) -> Result<Self, DbError> {
        let f = Fields::new(OUTBOX, doc);
        let kind = f.required_str("kind")?;
        let status = f.required_str("status")?;
        let run_after_ms = f.i64_or("runAfterMs", 0)?;
        let attempts = f.i64_or("attempts", 0)?;

        Ok(Self {
            id: doc.id.clone(),
            kind: kind.parse().map_err(|e: String| f.malformed(e))?,
            event_id: f.required_str("eventId")?,
            status: status.parse().map_err(|e: String| f.malformed(e))?,
            attempts: u32::try_from(attempts)
                .map_err(|_| f.malformed(format!("'attempts' out of range: {attempts}")))?,
            last_error: f.optional_str("lastError")?,
            run_after: Utc
                .timestamp_millis_opt(run_after_ms)
                .single()
                .ok_or_else(|| f.malformed(format!("'runAfterMs' out of range: {run_after_ms}")))?,
            created_at: doc.created_at,
        })
    }
}

/// Body of a freshly enqueued task.
pub fn new_task_data(kind: TaskKind, event_id: &str, run_after: Timestamp) -> DocumentData {
    object(json!({
        "kind": kind.as_str(),
        "eventId": event_id,
        "status": TaskStatus::Pending.as_str(),
        "attempts": 0,
        "lastError": null,
        "runAfterMs": run_after.timestamp_millis(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_ids_are_per_kind_and_event() {
        assert_eq!(OutboxTask::task_id(TaskKind::FanOut, "e1"), "fan_out-e1");
        assert_eq!(OutboxTask::task_id(TaskKind::Verify, "e1"), "verify-e1");
    }

    #[test]
    fn new_task_parses_as_pending() {
        let run_after = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
        let doc = Document {
            id: "verify-e1".into(),
            data: new_task_data(TaskKind::Verify, "e1", run_after),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let task = OutboxTask::from_document(&doc).unwrap();
        assert_eq!(task.kind, TaskKind::Verify);
        assert_eq!(task.status, TaskStatus::Pending);
        assert_eq!(task.attempts, 0);
        assert_eq!(task.run_after, run_after);
    }

    #[test]
    fn unknown_kind_is_malformed() {
        let mut data = new_task_data(TaskKind::FanOut, "e1", Utc::now());
        data.insert("kind".into(), json!("explode"));
        let doc = Document {
            id: "x".into(),
            data,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert!(matches!(
            OutboxTask::from_document(&doc),
            Err(DbError::MalformedRecord { collection: "outbox", .. })
        ));
    }
}
