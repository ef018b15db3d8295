use pulse_core::types::DocId;

use crate::store::StoreError;

/// Error returned by repositories.
///
/// Repositories either fail at the store (`Store`) or reject a document
/// whose shape does not match the record schema (`MalformedRecord`).
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Malformed {collection} record {id}: {reason}")]
    MalformedRecord {
        collection: &'static str,
        id: DocId,
        reason: String,
    },
}

impl DbError {
    /// `true` if a create collided with an existing id.
    pub fn is_already_exists(&self) -> bool {
        matches!(self, DbError::Store(StoreError::AlreadyExists { .. }))
    }
}
