//! Repository for the `users` collection.

use chrono::Utc;
use pulse_core::ids::new_doc_id;
use pulse_core::roles::Role;
use serde_json::{json, Value};

use super::{parse_page, Page};
use crate::collections::USERS;
use crate::error::DbError;
use crate::models::fields::{instant, object};
use crate::models::user::{CreateUser, User};
use crate::store::{DocumentStore, ListQuery};

const ACCOUNT_ID: &str = "accountId";

/// Provides lookups and the few mutations allowed on users.
pub struct UserRepo;

impl UserRepo {
    /// Register a user under a generated id.
    pub async fn create(store: &dyn DocumentStore, input: &CreateUser) -> Result<User, DbError> {
        Self::create_with_id(store, &new_doc_id(), input).await
    }

    /// Register a user under a caller-chosen id (imports and fixtures).
    pub async fn create_with_id(
        store: &dyn DocumentStore,
        id: &str,
        input: &CreateUser,
    ) -> Result<User, DbError> {
        let doc = store.create(USERS, id, input.to_data()).await?;
        User::from_document(&doc)
    }

    /// One page of the directory in stable (creation) order. A malformed
    /// user record is skipped rather than failing the page.
    pub async fn list_page(
        store: &dyn DocumentStore,
        offset: i64,
        limit: i64,
    ) -> Result<Page<User>, DbError> {
        let docs = store
            .list(USERS, &ListQuery::new().limit(limit).offset(offset))
            .await?;
        Ok(parse_page(USERS, docs, User::from_document))
    }

    pub async fn find_by_id(store: &dyn DocumentStore, id: &str) -> Result<Option<User>, DbError> {
        match store.get(USERS, id).await? {
            Some(doc) => User::from_document(&doc).map(Some),
            None => Ok(None),
        }
    }

    /// Find the user whose external auth identity is `account_id`.
    pub async fn find_by_account_id(
        store: &dyn DocumentStore,
        account_id: &str,
    ) -> Result<Option<User>, DbError> {
        let docs = store
            .list(USERS, &ListQuery::new().equal(ACCOUNT_ID, account_id).limit(1))
            .await?;
        docs.first().map(User::from_document).transpose()
    }

    /// Set a user's role. Returns `None` if the user does not exist.
    pub async fn update_role(
        store: &dyn DocumentStore,
        id: &str,
        role: Role,
    ) -> Result<Option<User>, DbError> {
        let patch = object(json!({ "role": role.as_str() }));
        match store.update(USERS, id, patch).await? {
            Some(doc) => User::from_document(&doc).map(Some),
            None => Ok(None),
        }
    }

    /// Store (or clear, with `None`) the device push token and stamp
    /// `lastTokenUpdate`.
    pub async fn update_push_token(
        store: &dyn DocumentStore,
        id: &str,
        token: Option<&str>,
    ) -> Result<Option<User>, DbError> {
        let patch = object(json!({
            "pushToken": token.map_or(Value::Null, |t| Value::String(t.to_string())),
            "lastTokenUpdate": instant(&Utc::now()),
        }));
        match store.update(USERS, id, patch).await? {
            Some(doc) => User::from_document(&doc).map(Some),
            None => Ok(None),
        }
    }

    pub async fn count(store: &dyn DocumentStore) -> Result<u64, DbError> {
        Ok(store.count(USERS, &[]).await?)
    }
}
