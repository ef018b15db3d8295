//! User record schema and DTOs.

use pulse_core::roles::Role;
use pulse_core::types::{DocId, Timestamp};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::fields::{object, Fields};
use crate::collections::USERS;
use crate::error::DbError;
use crate::store::{Document, DocumentData};

/// A document from the `users` collection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct User {
    pub id: DocId,
    /// External auth identity; content records written by older clients
    /// reference users by this value instead of `id`.
    pub account_id: String,
    pub username: String,
    pub email: Option<String>,
    pub role: Role,
    pub push_token: Option<String>,
    pub last_token_update: Option<Timestamp>,
    pub created_at: Timestamp,
}

impl User {
    pub fn from_document(doc: &Document) -> Result<Self, DbError> {
        let f = Fields::new(USERS, doc);
        let role = match f.optional_str("role")? {
            Some(raw) => raw
                .parse()
                .map_err(|_| f.malformed(format!("unknown role '{raw}'")))?,
            None => Role::User,
        };

        Ok(Self {
            id: doc.id.clone(),
            account_id: f.required_str("accountId")?,
            username: f.required_str("username")?,
            email: f.optional_str("email")?,
            role,
            push_token: f.optional_str("pushToken")?,
            last_token_update: f.optional_timestamp("lastTokenUpdate")?,
            created_at: doc.created_at,
        })
    }
}

/// DTO for registering a user document.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateUser {
    pub account_id: String,
    pub username: String,
    pub email: Option<String>,
    #[serde(default)]
    pub role: Role,
}

impl CreateUser {
    pub fn to_data(&self) -> DocumentData {
        object(json!({
            "accountId": self.account_id,
            "username": self.username,
            "email": self.email,
            "role": self.role.as_str(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use chrono::Utc;

    use super::*;

    fn doc(data: serde_json::Value) -> Document {
        Document {
            id: "u1".into(),
            data: object(data),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn parses_complete_user() {
        let user = User::from_document(&doc(json!({
            "accountId": "acc-1",
            "username": "ada",
            "role": "admin",
            "pushToken": "ExponentPushToken[x]",
            "lastTokenUpdate": "2026-10-01T12:00:00.000Z",
        })))
        .unwrap();

        assert_eq!(user.account_id, "acc-1");
        assert_eq!(user.role, Role::Admin);
        assert_eq!(user.push_token.as_deref(), Some("ExponentPushToken[x]"));
        assert!(user.last_token_update.is_some());
    }

    #[test]
    fn role_defaults_to_user() {
        let user = User::from_document(&doc(json!({"accountId": "a", "username": "b"}))).unwrap();
        assert_eq!(user.role, Role::User);
        assert!(user.push_token.is_none());
    }

    #[test]
    fn missing_account_id_is_malformed() {
        let err = User::from_document(&doc(json!({"username": "b"}))).unwrap_err();
        assert_matches!(err, DbError::MalformedRecord { collection: "users", ref id, .. } if id == "u1");
    }

    #[test]
    fn unknown_role_is_malformed() {
        let err = User::from_document(&doc(json!({
            "accountId": "a", "username": "b", "role": "superuser"
        })))
        .unwrap_err();
        assert!(err.to_string().contains("superuser"));
    }
}
