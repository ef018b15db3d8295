use pulse_core::types::DocId;
use pulse_db::DbError;
use pulse_events::DirectoryUnavailable;

/// A diagnosis or repair could not run. Individual orphans and failed
/// record updates are report data, not errors.
#[derive(Debug, thiserror::Error)]
pub enum IntegrityError {
    #[error(transparent)]
    Directory(#[from] DirectoryUnavailable),

    #[error("Fallback user not found: {0}")]
    FallbackUserNotFound(DocId),

    #[error(transparent)]
    Store(#[from] DbError),
}
