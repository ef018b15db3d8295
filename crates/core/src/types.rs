/// Document identifiers are opaque strings assigned by (or supplied to) the
/// document store.
pub type DocId = String;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
