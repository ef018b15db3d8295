//! Error types for the notification pipeline.

use pulse_core::types::DocId;
use pulse_db::DbError;

/// A page request against the user directory failed; enumeration was
/// abandoned and no partial result is returned.
#[derive(Debug, thiserror::Error)]
#[error("User directory unavailable at offset {offset}: {source}")]
pub struct DirectoryUnavailable {
    pub offset: i64,
    #[source]
    pub source: DbError,
}

/// Fan-out could not run at all. Per-recipient failures are not errors;
/// they are reported in the fan-out report.
#[derive(Debug, thiserror::Error)]
pub enum FanOutError {
    #[error(transparent)]
    Directory(#[from] DirectoryUnavailable),

    #[error("Event not found: {0}")]
    EventNotFound(DocId),

    #[error(transparent)]
    Store(#[from] DbError),
}

/// Verification or resend could not establish ground truth.
#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    /// Users or notifications could not be listed; the delivery state of
    /// the event is unknown (not the same as "nobody is missing").
    #[error("Verification incomplete: {0}")]
    VerificationIncomplete(String),

    #[error("Event not found: {0}")]
    EventNotFound(DocId),
}

impl From<DirectoryUnavailable> for VerifyError {
    fn from(err: DirectoryUnavailable) -> Self {
        VerifyError::VerificationIncomplete(err.to_string())
    }
}

/// Event creation was rejected. Fan-out problems never surface here.
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("Validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Unknown user: {0}")]
    UnknownUser(DocId),

    #[error("User {0} is not allowed to create events")]
    Forbidden(DocId),

    #[error(transparent)]
    Store(#[from] DbError),
}

/// A read-state operation on a recipient's notification failed.
#[derive(Debug, thiserror::Error)]
pub enum ReadStateError {
    #[error("Notification not found: {0}")]
    NotFound(DocId),

    #[error(transparent)]
    Store(#[from] DbError),
}
