//! Event notification pipeline.
//!
//! This crate turns a newly created event into one notification per user
//! and keeps that promise under partial failure:
//!
//! - [`UserDirectory`]: paged enumeration of users and id/alias lookup.
//! - [`NotificationWriter`]: batched, paced, best-effort notification writes.
//! - [`FanOutOrchestrator`]: directory enumeration plus writes for one event.
//! - [`DeliveryVerifier`] / [`ResendCoordinator`]: find and fill delivery gaps.
//! - [`Outbox`] / [`OutboxWorker`]: persisted deferral of fan-out and
//!   verification.
//! - [`EventPublisher`]: validated event creation that schedules delivery.
//! - [`ReadStateStore`]: recipient-side read/delete operations.
//! - [`stats`]: dashboard aggregates.

pub mod directory;
pub mod error;
pub mod fanout;
pub mod outbox;
pub mod publisher;
pub mod push;
pub mod read_state;
pub mod resend;
pub mod services;
pub mod stats;
pub mod verify;
pub mod writer;

pub use directory::{LookupError, Resolved, ResolvedVia, UserDirectory};
pub use error::{DirectoryUnavailable, FanOutError, PublishError, ReadStateError, VerifyError};
pub use fanout::{FanOutOrchestrator, FanOutReport};
pub use outbox::{Outbox, OutboxWorker};
pub use publisher::EventPublisher;
pub use push::{LocalAlerter, LoggingLocalAlerter, LoggingPushGateway, PushGateway, PushMessage};
pub use read_state::ReadStateStore;
pub use resend::{Reconciliation, ResendCoordinator, ResendReport};
pub use services::NotifyServices;
pub use stats::NotificationStats;
pub use verify::{DeliveryVerifier, VerificationResult};
pub use writer::{BatchResult, NotificationWriter, WriteFailed, WriteOutcome};
