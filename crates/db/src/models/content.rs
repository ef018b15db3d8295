//! Content (video post) records and their creator reference.

use pulse_core::types::{DocId, Timestamp};
use serde::Serialize;
use serde_json::{json, Value};

use super::fields::{kind_of, object, Fields};
use crate::collections::CONTENT;
use crate::error::DbError;
use crate::store::{Document, DocumentData};

/// The raw `creator` attribute of a content record.
///
/// Parsed leniently: a record with a broken creator is still a record, and
/// the integrity scan needs to see it to report it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum CreatorRef {
    /// A candidate user id or account id.
    Id(String),
    Missing,
    /// Present but not an id; holds a description of what was found.
    Malformed(String),
}

impl CreatorRef {
    fn parse(value: Option<&Value>) -> Self {
        match value {
            None | Some(Value::Null) => Self::Missing,
            Some(Value::String(s)) if s.trim().is_empty() => {
                Self::Malformed("empty string".into())
            }
            Some(Value::String(s)) => Self::Id(s.clone()),
            // Expanded relationship: `{"$id": "..."}`.
            Some(Value::Object(map)) => match map.get("$id") {
                Some(Value::String(s)) if !s.is_empty() => Self::Id(s.clone()),
                _ => Self::Malformed("object without $id".into()),
            },
            Some(other) => Self::Malformed(kind_of(other).into()),
        }
    }

    pub fn as_id(&self) -> Option<&str> {
        match self {
            Self::Id(id) => Some(id),
            _ => None,
        }
    }
}

/// A document from the content collection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContentRecord {
    pub id: DocId,
    pub title: String,
    pub thumbnail: Option<String>,
    pub video: Option<String>,
    pub prompt: Option<String>,
    pub creator: CreatorRef,
    pub created_at: Timestamp,
}

impl ContentRecord {
    pub fn from_document(doc: &Document) -> Result<Self, DbError> {
        let f = Fields::new(CONTENT, doc);
        Ok(Self {
            id: doc.id.clone(),
            title: f.optional_str("title")?.unwrap_or_default(),
            thumbnail: f.optional_str("thumbnail")?,
            video: f.optional_str("video")?,
            prompt: f.optional_str("prompt")?,
            creator: CreatorRef::parse(f.raw("creator")),
            created_at: doc.created_at,
        })
    }
}

/// Body of a content record about to be written.
#[derive(Debug, Clone)]
pub struct NewContent {
    pub title: String,
    pub thumbnail: Option<String>,
    pub video: Option<String>,
    pub prompt: Option<String>,
    pub creator: Option<String>,
}

impl NewContent {
    pub fn to_data(&self) -> DocumentData {
        object(json!({
            "title": self.title,
            "thumbnail": self.thumbnail,
            "video": self.video,
            "prompt": self.prompt,
            "creator": self.creator,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creator_parsing_is_lenient() {
        assert_eq!(CreatorRef::parse(None), CreatorRef::Missing);
        assert_eq!(CreatorRef::parse(Some(&Value::Null)), CreatorRef::Missing);
        assert_eq!(CreatorRef::parse(Some(&json!("u1"))), CreatorRef::Id("u1".into()));
        assert_eq!(
            CreatorRef::parse(Some(&json!({"$id": "u2", "username": "x"}))),
            CreatorRef::Id("u2".into())
        );
        assert_eq!(
            CreatorRef::parse(Some(&json!(17))),
            CreatorRef::Malformed("number".into())
        );
        assert_eq!(
            CreatorRef::parse(Some(&json!("  "))),
            CreatorRef::Malformed("empty string".into())
        );
    }
}
