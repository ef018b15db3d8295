//! Per-collection repositories.
//!
//! Repositories are zero-sized structs whose associated functions take the
//! store as their first argument, so callers holding a
//! [`StoreHandle`](crate::StoreHandle) pass `&*handle`.

pub mod content_repo;
pub mod event_repo;
pub mod notification_repo;
pub mod outbox_repo;
pub mod user_repo;

pub use content_repo::ContentRepo;
pub use event_repo::EventRepo;
pub use notification_repo::NotificationRepo;
pub use outbox_repo::OutboxRepo;
pub use user_repo::UserRepo;

use crate::error::DbError;
use crate::store::Document;

/// One listing page parsed record by record.
///
/// Malformed records are skipped and logged. `fetched` counts the documents
/// the store returned, so paging can stop on a short page without being
/// misled by skipped records.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub fetched: usize,
    pub skipped: usize,
}

/// Parse every document of a listing, failing on the first malformed one.
pub(crate) fn parse_all<T>(
    docs: Vec<Document>,
    parse: fn(&Document) -> Result<T, DbError>,
) -> Result<Vec<T>, DbError> {
    docs.iter().map(parse).collect()
}

/// Parse a listing page, skipping (and logging) malformed documents.
pub(crate) fn parse_page<T>(
    collection: &str,
    docs: Vec<Document>,
    parse: fn(&Document) -> Result<T, DbError>,
) -> Page<T> {
    let fetched = docs.len();
    let mut items = Vec::with_capacity(fetched);
    for doc in &docs {
        match parse(doc) {
            Ok(item) => items.push(item),
            Err(e) => {
                tracing::warn!(collection, id = %doc.id, error = %e, "Skipping malformed record");
            }
        }
    }
    let skipped = fetched - items.len();
    Page {
        items,
        fetched,
        skipped,
    }
}
