//! PostgreSQL-backed [`DocumentStore`].
//!
//! All collections share the `documents` table (see
//! `migrations/20261016000001_create_documents.sql`). Document bodies live in
//! a JSONB column. String equality compares `data ->> 'field'` as text so the
//! expression indexes apply; other comparisons use JSONB ordering. The
//! `$createdAt` pseudo-field maps onto the `created_at` column.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pulse_core::types::Timestamp;
use serde_json::Value;
use sqlx::types::Json;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};

use crate::store::{
    Direction, Document, DocumentData, DocumentStore, Filter, ListQuery, StoreError, CREATED_AT,
};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, data, created_at, updated_at";

/// PostgreSQL unique-violation SQLSTATE.
const UNIQUE_VIOLATION: &str = "23505";

/// A row from the `documents` table.
#[derive(Debug, FromRow)]
struct DocumentRow {
    id: String,
    data: Json<DocumentData>,
    created_at: Timestamp,
    updated_at: Timestamp,
}

impl From<DocumentRow> for Document {
    fn from(row: DocumentRow) -> Self {
        Document {
            id: row.id,
            data: row.data.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Document store over a sqlx connection pool.
#[derive(Debug, Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn created_at_bound(value: &Value) -> Result<Timestamp, StoreError> {
    value
        .as_str()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| StoreError::InvalidQuery(format!("{CREATED_AT} expects RFC 3339, got {value}")))
}

/// A field name as a quoted SQL literal. Names are inlined rather than bound
/// so the planner can match the expression indexes.
fn field_literal(field: &str) -> Result<String, StoreError> {
    if field.is_empty() || !field.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(StoreError::InvalidQuery(format!("unsupported field name '{field}'")));
    }
    Ok(format!("'{field}'"))
}

/// Append `AND <predicate>` for every filter.
fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, filters: &[Filter]) -> Result<(), StoreError> {
    for filter in filters {
        let (field, op, value) = match filter {
            Filter::Equal(f, v) => (f, "=", v),
            Filter::GreaterThan(f, v) => (f, ">", v),
            Filter::LessThanOrEqual(f, v) => (f, "<=", v),
        };

        qb.push(" AND ");
        if field == CREATED_AT {
            qb.push("created_at ")
                .push(op)
                .push(" ")
                .push_bind(created_at_bound(value)?);
            continue;
        }

        let name = field_literal(field)?;
        match (filter, value) {
            (Filter::Equal(..), Value::String(text)) => {
                qb.push(format!("data ->> {name} = ")).push_bind(text.clone());
            }
            _ => {
                qb.push(format!("data -> {name} {op} "))
                    .push_bind(Json(value.clone()));
            }
        }
    }
    Ok(())
}

/// Map a unique violation on insert to [`StoreError::AlreadyExists`].
fn classify_insert_error(err: sqlx::Error, collection: &str, id: &str) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) {
            return StoreError::AlreadyExists {
                collection: collection.to_string(),
                id: id.to_string(),
            };
        }
    }
    StoreError::Database(err)
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn create(
        &self,
        collection: &str,
        id: &str,
        data: DocumentData,
    ) -> Result<Document, StoreError> {
        let query = format!(
            "INSERT INTO documents (collection, id, data)
             VALUES ($1, $2, $3)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, DocumentRow>(&query)
            .bind(collection)
            .bind(id)
            .bind(Json(data))
            .fetch_one(&self.pool)
            .await
            .map(Document::from)
            .map_err(|e| classify_insert_error(e, collection, id))
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let query = format!("SELECT {COLUMNS} FROM documents WHERE collection = $1 AND id = $2");
        let row = sqlx::query_as::<_, DocumentRow>(&query)
            .bind(collection)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Document::from))
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        patch: DocumentData,
    ) -> Result<Option<Document>, StoreError> {
        let query = format!(
            "UPDATE documents SET
                data = data || $3,
                updated_at = NOW()
             WHERE collection = $1 AND id = $2
             RETURNING {COLUMNS}"
        );
        let row = sqlx::query_as::<_, DocumentRow>(&query)
            .bind(collection)
            .bind(id)
            .bind(Json(patch))
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Document::from))
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM documents WHERE collection = $1 AND id = $2")
            .bind(collection)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list(&self, collection: &str, query: &ListQuery) -> Result<Vec<Document>, StoreError> {
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {COLUMNS} FROM documents WHERE collection = "
        ));
        qb.push_bind(collection.to_string());
        push_filters(&mut qb, &query.filters)?;

        qb.push(" ORDER BY ");
        match &query.order {
            None => {
                qb.push("created_at ASC, id ASC");
            }
            Some((field, direction)) => {
                let dir = match direction {
                    Direction::Asc => "ASC",
                    Direction::Desc => "DESC",
                };
                if field == CREATED_AT {
                    qb.push(format!("created_at {dir}, id {dir}"));
                } else {
                    let name = field_literal(field)?;
                    qb.push(format!("data -> {name} {dir}, created_at {dir}, id {dir}"));
                }
            }
        }

        if let Some(limit) = query.limit {
            qb.push(" LIMIT ").push_bind(limit.max(0));
        }
        qb.push(" OFFSET ").push_bind(query.offset.max(0));

        let rows = qb
            .build_query_as::<DocumentRow>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Document::from).collect())
    }

    async fn count(&self, collection: &str, filters: &[Filter]) -> Result<u64, StoreError> {
        let mut qb =
            QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM documents WHERE collection = ");
        qb.push_bind(collection.to_string());
        push_filters(&mut qb, filters)?;

        let count: i64 = qb.build_query_scalar::<i64>().fetch_one(&self.pool).await?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
