//! In-process [`DocumentStore`] backend.
//!
//! [`MemoryStore`] keeps every collection in a `BTreeMap` behind a single
//! mutex and mirrors the Postgres backend's filtering, ordering and paging
//! rules. It also supports fault injection and records list requests, which
//! is what the fan-out, verification and repair tests are built on.
//! `STORE_BACKEND=memory` runs the services against it for local work.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pulse_core::types::{DocId, Timestamp};
use serde_json::Value;

use crate::store::{
    compare_values, Direction, Document, DocumentData, DocumentStore, Filter, ListQuery,
    StoreError, CREATED_AT,
};

// ---------------------------------------------------------------------------
// Fault injection
// ---------------------------------------------------------------------------

/// A request failure armed on a [`MemoryStore`].
#[derive(Debug, Clone)]
enum Fault {
    /// Fail every create in `collection` whose body has `field == value`.
    CreateWhere {
        collection: String,
        field: String,
        value: Value,
    },
    /// Let `remaining_ok` list requests on `collection` through, then fail.
    List {
        collection: String,
        remaining_ok: usize,
    },
    /// Fail updates of one document.
    Update { collection: String, id: DocId },
    /// Fail health pings.
    Ping,
}

/// One observed `list` request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListCall {
    pub collection: String,
    pub limit: Option<i64>,
    pub offset: i64,
    pub returned: usize,
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct Entry {
    doc: Document,
    seq: u64,
}

#[derive(Debug, Default)]
struct State {
    collections: HashMap<String, BTreeMap<DocId, Entry>>,
    next_seq: u64,
    faults: Vec<Fault>,
    list_calls: Vec<ListCall>,
}

/// Thread-safe in-memory document store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Fail creates in `collection` whose `field` equals `value`.
    pub fn fail_create_where(
        &self,
        collection: impl Into<String>,
        field: impl Into<String>,
        value: impl Into<Value>,
    ) {
        self.lock().faults.push(Fault::CreateWhere {
            collection: collection.into(),
            field: field.into(),
            value: value.into(),
        });
    }

    /// Fail every list request on `collection`.
    pub fn fail_lists(&self, collection: impl Into<String>) {
        self.fail_lists_after(collection, 0);
    }

    /// Let `successes` list requests on `collection` succeed, then fail the rest.
    pub fn fail_lists_after(&self, collection: impl Into<String>, successes: usize) {
        self.lock().faults.push(Fault::List {
            collection: collection.into(),
            remaining_ok: successes,
        });
    }

    /// Fail updates of the document `id` in `collection`.
    pub fn fail_update(&self, collection: impl Into<String>, id: impl Into<DocId>) {
        self.lock().faults.push(Fault::Update {
            collection: collection.into(),
            id: id.into(),
        });
    }

    /// Fail every `ping`, as an unreachable backend would.
    pub fn fail_ping(&self) {
        self.lock().faults.push(Fault::Ping);
    }

    /// Disarm all injected faults.
    pub fn clear_faults(&self) {
        self.lock().faults.clear();
    }

    /// List requests observed for `collection`, oldest first.
    pub fn list_calls(&self, collection: &str) -> Vec<ListCall> {
        self.lock()
            .list_calls
            .iter()
            .filter(|c| c.collection == collection)
            .cloned()
            .collect()
    }

    /// Number of documents currently in `collection`.
    pub fn len(&self, collection: &str) -> usize {
        self.lock().collections.get(collection).map_or(0, BTreeMap::len)
    }

    /// `true` if `collection` holds no documents.
    pub fn is_empty(&self, collection: &str) -> bool {
        self.len(collection) == 0
    }
}

// ---------------------------------------------------------------------------
// Query evaluation
// ---------------------------------------------------------------------------

fn parse_instant(value: &Value) -> Result<Timestamp, StoreError> {
    value
        .as_str()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| StoreError::InvalidQuery(format!("{CREATED_AT} expects RFC 3339, got {value}")))
}

fn matches(doc: &Document, filter: &Filter) -> Result<bool, StoreError> {
    let ordering = if filter.field() == CREATED_AT {
        let bound = match filter {
            Filter::Equal(_, v) | Filter::GreaterThan(_, v) | Filter::LessThanOrEqual(_, v) => {
                parse_instant(v)?
            }
        };
        Some(doc.created_at.cmp(&bound))
    } else {
        match filter {
            Filter::Equal(field, v) => return Ok(doc.get(field) == Some(v)),
            Filter::GreaterThan(field, v) | Filter::LessThanOrEqual(field, v) => {
                doc.get(field).and_then(|actual| compare_values(actual, v))
            }
        }
    };

    Ok(match filter {
        Filter::Equal(..) => ordering == Some(Ordering::Equal),
        Filter::GreaterThan(..) => ordering == Some(Ordering::Greater),
        Filter::LessThanOrEqual(..) => {
            matches!(ordering, Some(Ordering::Less | Ordering::Equal))
        }
    })
}

fn matches_all(doc: &Document, filters: &[Filter]) -> Result<bool, StoreError> {
    for filter in filters {
        if !matches(doc, filter)? {
            return Ok(false);
        }
    }
    Ok(true)
}

fn compare_entries(a: &Entry, b: &Entry, order: Option<&(String, Direction)>) -> Ordering {
    let natural = a
        .doc
        .created_at
        .cmp(&b.doc.created_at)
        .then(a.seq.cmp(&b.seq));

    match order {
        None => natural,
        Some((field, direction)) => {
            let primary = if field == CREATED_AT {
                natural
            } else {
                match (a.doc.get(field), b.doc.get(field)) {
                    (Some(x), Some(y)) => compare_values(x, y).unwrap_or(Ordering::Equal),
                    (Some(_), None) => Ordering::Greater,
                    (None, Some(_)) => Ordering::Less,
                    (None, None) => Ordering::Equal,
                }
                .then(natural)
            };
            match direction {
                Direction::Asc => primary,
                Direction::Desc => primary.reverse(),
            }
        }
    }
}

fn unavailable(op: &str, collection: &str) -> StoreError {
    StoreError::Unavailable(format!("injected {op} failure on {collection}"))
}

// ---------------------------------------------------------------------------
// DocumentStore
// ---------------------------------------------------------------------------

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn create(
        &self,
        collection: &str,
        id: &str,
        data: DocumentData,
    ) -> Result<Document, StoreError> {
        let mut state = self.lock();

        let faulted = state.faults.iter().any(|fault| match fault {
            Fault::CreateWhere {
                collection: c,
                field,
                value,
            } => c == collection && data.get(field) == Some(value),
            _ => false,
        });
        if faulted {
            return Err(unavailable("create", collection));
        }

        state.next_seq += 1;
        let seq = state.next_seq;
        let docs = state.collections.entry(collection.to_string()).or_default();
        if docs.contains_key(id) {
            return Err(StoreError::AlreadyExists {
                collection: collection.to_string(),
                id: id.to_string(),
            });
        }

        let now = Utc::now();
        let doc = Document {
            id: id.to_string(),
            data,
            created_at: now,
            updated_at: now,
        };
        docs.insert(
            id.to_string(),
            Entry {
                doc: doc.clone(),
                seq,
            },
        );
        Ok(doc)
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let state = self.lock();
        Ok(state
            .collections
            .get(collection)
            .and_then(|docs| docs.get(id))
            .map(|entry| entry.doc.clone()))
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        patch: DocumentData,
    ) -> Result<Option<Document>, StoreError> {
        let mut state = self.lock();

        let faulted = state.faults.iter().any(|fault| {
            matches!(fault, Fault::Update { collection: c, id: i } if c == collection && i == id)
        });
        if faulted {
            return Err(unavailable("update", collection));
        }

        let Some(entry) = state
            .collections
            .get_mut(collection)
            .and_then(|docs| docs.get_mut(id))
        else {
            return Ok(None);
        };

        entry.doc.data.extend(patch);
        entry.doc.updated_at = Utc::now();
        Ok(Some(entry.doc.clone()))
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<bool, StoreError> {
        let mut state = self.lock();
        Ok(state
            .collections
            .get_mut(collection)
            .is_some_and(|docs| docs.remove(id).is_some()))
    }

    async fn list(&self, collection: &str, query: &ListQuery) -> Result<Vec<Document>, StoreError> {
        let mut state = self.lock();

        for fault in state.faults.iter_mut() {
            if let Fault::List {
                collection: c,
                remaining_ok,
            } = fault
            {
                if c == collection {
                    if *remaining_ok == 0 {
                        return Err(unavailable("list", collection));
                    }
                    *remaining_ok -= 1;
                }
            }
        }

        let mut selected: Vec<&Entry> = Vec::new();
        if let Some(docs) = state.collections.get(collection) {
            for entry in docs.values() {
                if matches_all(&entry.doc, &query.filters)? {
                    selected.push(entry);
                }
            }
        }
        selected.sort_by(|a, b| compare_entries(a, b, query.order.as_ref()));

        let offset = usize::try_from(query.offset.max(0)).unwrap_or(usize::MAX);
        let limit = query
            .limit
            .map_or(usize::MAX, |l| usize::try_from(l.max(0)).unwrap_or(usize::MAX));
        let page: Vec<Document> = selected
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(|entry| entry.doc.clone())
            .collect();

        state.list_calls.push(ListCall {
            collection: collection.to_string(),
            limit: query.limit,
            offset: query.offset,
            returned: page.len(),
        });
        Ok(page)
    }

    async fn count(&self, collection: &str, filters: &[Filter]) -> Result<u64, StoreError> {
        let state = self.lock();
        let mut total = 0u64;
        if let Some(docs) = state.collections.get(collection) {
            for entry in docs.values() {
                if matches_all(&entry.doc, filters)? {
                    total += 1;
                }
            }
        }
        Ok(total)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        if self.lock().faults.iter().any(|f| matches!(f, Fault::Ping)) {
            return Err(StoreError::Unavailable("injected ping failure".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use serde_json::json;

    use super::*;

    fn body(value: Value) -> DocumentData {
        match value {
            Value::Object(map) => map,
            _ => panic!("test body must be an object"),
        }
    }

    #[tokio::test]
    async fn create_then_get_round_trips_body() {
        let store = MemoryStore::new();
        store
            .create("users", "u1", body(json!({"username": "ada"})))
            .await
            .unwrap();

        let doc = store.get("users", "u1").await.unwrap().unwrap();
        assert_eq!(doc.get("username"), Some(&json!("ada")));
        assert!(store.get("users", "missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_create_is_rejected() {
        let store = MemoryStore::new();
        store.create("users", "u1", DocumentData::new()).await.unwrap();

        let err = store.create("users", "u1", DocumentData::new()).await.unwrap_err();
        assert_matches!(err, StoreError::AlreadyExists { ref id, .. } if id == "u1");
    }

    #[tokio::test]
    async fn update_merges_and_reports_missing() {
        let store = MemoryStore::new();
        store
            .create("n", "a", body(json!({"isRead": false, "title": "t"})))
            .await
            .unwrap();

        let doc = store
            .update("n", "a", body(json!({"isRead": true})))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(doc.get("isRead"), Some(&json!(true)));
        assert_eq!(doc.get("title"), Some(&json!("t")));

        assert!(store.update("n", "zz", DocumentData::new()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_filters_orders_and_pages() {
        let store = MemoryStore::new();
        for i in 0..5 {
            store
                .create("n", &format!("d{i}"), body(json!({"rank": i, "even": i % 2 == 0})))
                .await
                .unwrap();
        }

        let evens = store
            .list("n", &ListQuery::new().equal("even", true))
            .await
            .unwrap();
        assert_eq!(evens.len(), 3);

        let page = store
            .list("n", &ListQuery::new().order_desc("rank").limit(2).offset(1))
            .await
            .unwrap();
        let ids: Vec<_> = page.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, ["d3", "d2"]);

        let ranged = store
            .list("n", &ListQuery::new().greater_than("rank", 1).less_than_or_equal("rank", 3))
            .await
            .unwrap();
        assert_eq!(ranged.len(), 2);
    }

    #[tokio::test]
    async fn missing_field_never_equals() {
        let store = MemoryStore::new();
        store.create("n", "a", DocumentData::new()).await.unwrap();
        let found = store
            .list("n", &ListQuery::new().equal("eventId", Value::Null))
            .await
            .unwrap();
        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn injected_faults_fire_and_clear() {
        let store = MemoryStore::new();
        store.fail_create_where("n", "userId", "u7");
        store.fail_lists_after("users", 1);

        assert!(store
            .create("n", "a", body(json!({"userId": "u1"})))
            .await
            .is_ok());
        assert_matches!(
            store.create("n", "b", body(json!({"userId": "u7"}))).await,
            Err(StoreError::Unavailable(_))
        );

        assert!(store.list("users", &ListQuery::new()).await.is_ok());
        assert_matches!(
            store.list("users", &ListQuery::new()).await,
            Err(StoreError::Unavailable(_))
        );

        store.clear_faults();
        assert!(store
            .create("n", "b", body(json!({"userId": "u7"})))
            .await
            .is_ok());
        assert!(store.list("users", &ListQuery::new()).await.is_ok());
    }

    #[tokio::test]
    async fn created_at_filter_requires_rfc3339() {
        let store = MemoryStore::new();
        store.create("n", "a", DocumentData::new()).await.unwrap();

        let week_ago = (Utc::now() - chrono::Duration::days(7)).to_rfc3339();
        let recent = store
            .count("n", &[Filter::GreaterThan(CREATED_AT.into(), json!(week_ago))])
            .await
            .unwrap();
        assert_eq!(recent, 1);

        assert_matches!(
            store
                .count("n", &[Filter::GreaterThan(CREATED_AT.into(), json!(42))])
                .await,
            Err(StoreError::InvalidQuery(_))
        );
    }
}
