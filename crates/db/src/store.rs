//! Document-store abstraction.
//!
//! The notification core talks to its backing service exclusively through
//! [`DocumentStore`]: single-record create/get/update/delete plus filtered,
//! ordered, paged listing. Records are schemaless JSON objects; typed
//! models are parsed from them at the repository boundary.
//!
//! Two implementations ship with the crate:
//! [`PgDocumentStore`](crate::postgres::PgDocumentStore) for production and
//! [`MemoryStore`](crate::memory::MemoryStore) for tests and local runs.

use std::cmp::Ordering;
use std::sync::Arc;

use async_trait::async_trait;
use pulse_core::types::{DocId, Timestamp};
use serde_json::{Map, Value};

/// Pseudo-field addressing a document's creation timestamp in filters and
/// ordering. Values compared against it are RFC 3339 strings.
pub const CREATED_AT: &str = "$createdAt";

/// Shared, injectable store handle.
pub type StoreHandle = Arc<dyn DocumentStore>;

/// JSON object body of a document.
pub type DocumentData = Map<String, Value>;

// ---------------------------------------------------------------------------
// Document
// ---------------------------------------------------------------------------

/// A stored record together with its store-managed metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: DocId,
    pub data: DocumentData,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Document {
    /// Borrow a field of the body.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.data.get(field)
    }
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// A single predicate on a document field.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Equal(String, Value),
    GreaterThan(String, Value),
    LessThanOrEqual(String, Value),
}

impl Filter {
    pub fn field(&self) -> &str {
        match self {
            Filter::Equal(f, _) | Filter::GreaterThan(f, _) | Filter::LessThanOrEqual(f, _) => f,
        }
    }
}

/// Sort direction for [`ListQuery`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

/// Filtered, ordered, paged listing request.
///
/// Without an explicit order, documents are returned oldest first with the
/// id as tie-breaker, which keeps offset paging stable over a static
/// collection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListQuery {
    pub filters: Vec<Filter>,
    pub order: Option<(String, Direction)>,
    pub limit: Option<i64>,
    pub offset: i64,
}

impl ListQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn equal(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::Equal(field.into(), value.into()));
        self
    }

    pub fn greater_than(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters
            .push(Filter::GreaterThan(field.into(), value.into()));
        self
    }

    pub fn less_than_or_equal(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters
            .push(Filter::LessThanOrEqual(field.into(), value.into()));
        self
    }

    pub fn order_asc(mut self, field: impl Into<String>) -> Self {
        self.order = Some((field.into(), Direction::Asc));
        self
    }

    pub fn order_desc(mut self, field: impl Into<String>) -> Self {
        self.order = Some((field.into(), Direction::Desc));
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: i64) -> Self {
        self.offset = offset;
        self
    }
}

/// Order two JSON scalars of the same kind. Mixed or non-scalar values are
/// incomparable and never satisfy a range filter.
pub fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failure of a single store request.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A create collided with an existing `(collection, id)`.
    #[error("Document {id} already exists in {collection}")]
    AlreadyExists { collection: String, id: DocId },

    /// The query could not be expressed (bad field or filter value).
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// The backend did not answer (network, throttling, injected fault).
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// CRUD primitives of the backing document service.
///
/// Each call is an independent request: implementations guarantee
/// per-record atomicity and nothing more.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert a document under a caller-chosen id.
    ///
    /// Fails with [`StoreError::AlreadyExists`] if the id is taken.
    async fn create(
        &self,
        collection: &str,
        id: &str,
        data: DocumentData,
    ) -> Result<Document, StoreError>;

    /// Fetch a single document, `None` if absent.
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError>;

    /// Shallow-merge `patch` into an existing document.
    ///
    /// Returns `None` if no such document exists.
    async fn update(
        &self,
        collection: &str,
        id: &str,
        patch: DocumentData,
    ) -> Result<Option<Document>, StoreError>;

    /// Delete a document. Returns `true` if it existed.
    async fn delete(&self, collection: &str, id: &str) -> Result<bool, StoreError>;

    /// List documents matching `query`.
    async fn list(&self, collection: &str, query: &ListQuery) -> Result<Vec<Document>, StoreError>;

    /// Count documents matching every filter.
    async fn count(&self, collection: &str, filters: &[Filter]) -> Result<u64, StoreError>;

    /// Cheap reachability probe.
    async fn ping(&self) -> Result<(), StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn builder_accumulates_filters_and_paging() {
        let q = ListQuery::new()
            .equal("userId", "u1")
            .equal("isRead", false)
            .order_desc(CREATED_AT)
            .limit(25)
            .offset(50);

        assert_eq!(q.filters.len(), 2);
        assert_eq!(q.filters[0], Filter::Equal("userId".into(), json!("u1")));
        assert_eq!(q.order, Some((CREATED_AT.to_string(), Direction::Desc)));
        assert_eq!(q.limit, Some(25));
        assert_eq!(q.offset, 50);
    }

    #[test]
    fn compare_values_same_kind_only() {
        assert_eq!(compare_values(&json!(1), &json!(2)), Some(Ordering::Less));
        assert_eq!(compare_values(&json!("b"), &json!("a")), Some(Ordering::Greater));
        assert_eq!(compare_values(&json!(1), &json!("1")), None);
        assert_eq!(compare_values(&json!(null), &json!(null)), None);
    }
}
