//! Record schemas parsed from store documents.
//!
//! Each model has a `from_document` constructor that rejects documents not
//! matching its schema with [`DbError::MalformedRecord`](crate::DbError),
//! and write-side DTOs that render the stored body.

pub(crate) mod fields;

pub mod content;
pub mod event;
pub mod notification;
pub mod outbox;
pub mod user;
