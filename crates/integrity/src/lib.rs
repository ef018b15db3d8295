//! Referential-integrity checks for content records.
//!
//! Content records name their creator by user id or, when written by older
//! clients, by the user's external account id. [`reference`] classifies a
//! single reference; [`scan`] samples the content collection, reports
//! orphans and rewrites them to a fallback user on request.

pub mod error;
pub mod reference;
pub mod scan;

pub use error::IntegrityError;
pub use reference::{classify, Classification, OrphanReason, UserIndex};
pub use scan::{Diagnosis, OrphanedRecord, ReferenceScanner, RepairFailed, RepairReport};
