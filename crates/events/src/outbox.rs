//! Persisted outbox for deferred fan-out and verification.
//!
//! Event creation enqueues a `fan_out` task and returns. [`OutboxWorker`]
//! picks due tasks up, runs the fan-out, then enqueues a `verify` task due
//! after the settling delay; the verify task checks delivery and resends to
//! whoever is missing. Tasks live in the store, so a restart resumes where
//! the previous process stopped, and deterministic task and notification
//! ids make a re-run harmless.
//!
//! The worker polls on an interval and is also woken immediately through
//! [`Outbox`]'s `Notify` when a task is enqueued in-process.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use pulse_core::config::{NotifyConfig, OutboxConfig};
use pulse_core::types::Timestamp;
use pulse_db::models::outbox::{OutboxTask, TaskKind};
use pulse_db::repositories::{EventRepo, OutboxRepo};
use pulse_db::{DbError, StoreHandle};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use crate::error::{FanOutError, VerifyError};
use crate::fanout::FanOutOrchestrator;
use crate::resend::ResendCoordinator;

/// Lower bound for the poll interval; `tokio::time::interval` rejects zero.
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

fn after(delay: Duration) -> Timestamp {
    Utc::now() + chrono::Duration::from_std(delay).unwrap_or_else(|_| chrono::Duration::zero())
}

// ---------------------------------------------------------------------------
// Outbox
// ---------------------------------------------------------------------------

/// Enqueue side of the outbox, shared by the API and the worker.
#[derive(Clone)]
pub struct Outbox {
    store: StoreHandle,
    wake: Arc<Notify>,
}

impl Outbox {
    pub fn new(store: StoreHandle) -> Self {
        Self {
            store,
            wake: Arc::new(Notify::new()),
        }
    }

    /// Enqueue a task due immediately.
    pub async fn enqueue_now(&self, kind: TaskKind, event_id: &str) -> Result<bool, DbError> {
        self.enqueue(kind, event_id, Utc::now()).await
    }

    /// Enqueue a task due at `run_after` and wake the worker.
    ///
    /// Returns `false` if the task already existed.
    pub async fn enqueue(
        &self,
        kind: TaskKind,
        event_id: &str,
        run_after: Timestamp,
    ) -> Result<bool, DbError> {
        let created = OutboxRepo::enqueue(&*self.store, kind, event_id, run_after).await?;
        if created {
            tracing::debug!(event_id, kind = %kind, %run_after, "Outbox task enqueued");
            self.wake.notify_one();
        }
        Ok(created)
    }

    async fn woken(&self) {
        self.wake.notified().await;
    }
}

// ---------------------------------------------------------------------------
// OutboxWorker
// ---------------------------------------------------------------------------

/// Why a task attempt did not complete.
enum TaskFailure {
    /// Worth another attempt after backoff.
    Retry(String),
    /// Will never succeed (the event is gone).
    Permanent(String),
}

impl From<FanOutError> for TaskFailure {
    fn from(err: FanOutError) -> Self {
        match err {
            FanOutError::EventNotFound(_) => TaskFailure::Permanent(err.to_string()),
            FanOutError::Directory(_) | FanOutError::Store(_) => TaskFailure::Retry(err.to_string()),
        }
    }
}

impl From<VerifyError> for TaskFailure {
    fn from(err: VerifyError) -> Self {
        match err {
            VerifyError::EventNotFound(_) => TaskFailure::Permanent(err.to_string()),
            VerifyError::VerificationIncomplete(_) => TaskFailure::Retry(err.to_string()),
        }
    }
}

impl From<DbError> for TaskFailure {
    fn from(err: DbError) -> Self {
        TaskFailure::Retry(err.to_string())
    }
}

/// Background service draining the outbox.
pub struct OutboxWorker {
    store: StoreHandle,
    outbox: Outbox,
    fan_out: FanOutOrchestrator,
    resend: ResendCoordinator,
    config: OutboxConfig,
    settling_delay: Duration,
}

impl OutboxWorker {
    pub fn new(
        outbox: Outbox,
        fan_out: FanOutOrchestrator,
        resend: ResendCoordinator,
        notify: &NotifyConfig,
        config: OutboxConfig,
    ) -> Self {
        Self {
            store: outbox.store.clone(),
            outbox,
            fan_out,
            resend,
            config,
            settling_delay: notify.settling_delay,
        }
    }

    /// Run the worker loop until `cancel` fires.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(self.config.poll_interval.max(MIN_POLL_INTERVAL));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        tracing::info!(
            poll_interval_secs = self.config.poll_interval.as_secs(),
            max_attempts = self.config.max_attempts,
            "Outbox worker started"
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Outbox worker cancelled");
                    break;
                }
                _ = interval.tick() => {}
                _ = self.outbox.woken() => {}
            }

            if let Err(e) = self.drain_once().await {
                tracing::error!(error = %e, "Failed to poll outbox");
            }
        }
    }

    /// Process due tasks until none are left. Returns the number of task
    /// attempts made.
    pub async fn drain_once(&self) -> Result<usize, DbError> {
        let mut processed = 0;
        loop {
            let due = OutboxRepo::list_due(&*self.store, Utc::now(), self.config.claim_limit).await?;
            if due.is_empty() {
                return Ok(processed);
            }
            for task in &due {
                self.process(task).await?;
                processed += 1;
            }
        }
    }

    async fn process(&self, task: &OutboxTask) -> Result<(), DbError> {
        let outcome = match task.kind {
            TaskKind::FanOut => self.run_fan_out(&task.event_id).await,
            TaskKind::Verify => self.run_verify(&task.event_id).await,
        };

        match outcome {
            Ok(()) => OutboxRepo::mark_done(&*self.store, task).await,
            Err(TaskFailure::Retry(reason)) if task.attempts + 1 < self.config.max_attempts => {
                let delay = self.config.retry_delay(task.attempts + 1);
                tracing::warn!(
                    task_id = %task.id,
                    attempt = task.attempts + 1,
                    retry_in_ms = delay.as_millis() as u64,
                    error = %reason,
                    "Outbox task failed, will retry"
                );
                OutboxRepo::record_failure(&*self.store, task, &reason, Some(after(delay))).await
            }
            Err(TaskFailure::Retry(reason)) | Err(TaskFailure::Permanent(reason)) => {
                tracing::error!(
                    task_id = %task.id,
                    attempts = task.attempts + 1,
                    error = %reason,
                    "Outbox task failed permanently"
                );
                OutboxRepo::record_failure(&*self.store, task, &reason, None).await
            }
        }
    }

    async fn run_fan_out(&self, event_id: &str) -> Result<(), TaskFailure> {
        let event = EventRepo::find_by_id(&*self.store, event_id)
            .await?
            .ok_or_else(|| FanOutError::EventNotFound(event_id.to_string()))?;

        self.fan_out.fan_out(&event).await?;
        self.outbox
            .enqueue(TaskKind::Verify, event_id, after(self.settling_delay))
            .await?;
        Ok(())
    }

    async fn run_verify(&self, event_id: &str) -> Result<(), TaskFailure> {
        let outcome = self.resend.reconcile(event_id).await?;
        if outcome.is_complete() {
            Ok(())
        } else {
            Err(TaskFailure::Retry(format!(
                "{} of {} resends failed",
                outcome.resend.attempted - outcome.resend.succeeded,
                outcome.resend.attempted
            )))
        }
    }
}
