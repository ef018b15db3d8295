//! Typed field access over schemaless documents.
//!
//! Every model's `from_document` goes through [`Fields`], so a document
//! with a missing or mistyped attribute fails with
//! [`DbError::MalformedRecord`] at the read boundary.

use chrono::{DateTime, Utc};
use pulse_core::types::Timestamp;
use serde_json::Value;

use crate::error::DbError;
use crate::store::{Document, DocumentData};

pub(crate) struct Fields<'a> {
    collection: &'static str,
    doc: &'a Document,
}

impl<'a> Fields<'a> {
    pub(crate) fn new(collection: &'static str, doc: &'a Document) -> Self {
        Self { collection, doc }
    }

    pub(crate) fn malformed(&self, reason: impl Into<String>) -> DbError {
        DbError::MalformedRecord {
            collection: self.collection,
            id: self.doc.id.clone(),
            reason: reason.into(),
        }
    }

    /// The raw value, treating JSON `null` as absent.
    pub(crate) fn raw(&self, name: &str) -> Option<&'a Value> {
        self.doc.data.get(name).filter(|v| !v.is_null())
    }

    pub(crate) fn required_str(&self, name: &str) -> Result<String, DbError> {
        match self.raw(name) {
            Some(Value::String(s)) if !s.is_empty() => Ok(s.clone()),
            Some(Value::String(_)) => Err(self.malformed(format!("'{name}' is empty"))),
            Some(other) => Err(self.malformed(format!(
                "'{name}' must be a string, got {}",
                kind_of(other)
            ))),
            None => Err(self.malformed(format!("missing '{name}'"))),
        }
    }

    pub(crate) fn optional_str(&self, name: &str) -> Result<Option<String>, DbError> {
        match self.raw(name) {
            Some(Value::String(s)) if s.is_empty() => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(other) => Err(self.malformed(format!(
                "'{name}' must be a string, got {}",
                kind_of(other)
            ))),
            None => Ok(None),
        }
    }

    pub(crate) fn bool_or(&self, name: &str, default: bool) -> Result<bool, DbError> {
        match self.raw(name) {
            Some(Value::Bool(b)) => Ok(*b),
            Some(other) => Err(self.malformed(format!(
                "'{name}' must be a boolean, got {}",
                kind_of(other)
            ))),
            None => Ok(default),
        }
    }

    pub(crate) fn i64_or(&self, name: &str, default: i64) -> Result<i64, DbError> {
        match self.raw(name) {
            Some(v) => v.as_i64().ok_or_else(|| {
                self.malformed(format!("'{name}' must be an integer, got {}", kind_of(v)))
            }),
            None => Ok(default),
        }
    }

    pub(crate) fn required_timestamp(&self, name: &str) -> Result<Timestamp, DbError> {
        self.optional_timestamp(name)?
            .ok_or_else(|| self.malformed(format!("missing '{name}'")))
    }

    pub(crate) fn optional_timestamp(&self, name: &str) -> Result<Option<Timestamp>, DbError> {
        match self.optional_str(name)? {
            Some(s) => DateTime::parse_from_rfc3339(&s)
                .map(|dt| Some(dt.with_timezone(&Utc)))
                .map_err(|e| self.malformed(format!("'{name}' is not an RFC 3339 instant: {e}"))),
            None => Ok(None),
        }
    }
}

/// Human-readable JSON type name for error messages.
pub(crate) fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Unwrap a `json!({...})` literal into a document body.
pub(crate) fn object(value: Value) -> DocumentData {
    match value {
        Value::Object(map) => map,
        _ => DocumentData::new(),
    }
}

/// Render a timestamp the way it is stored in documents.
pub(crate) fn instant(ts: &Timestamp) -> String {
    ts.to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}
