//! User directory reader.
//!
//! [`UserDirectory`] enumerates the `users` collection with fixed-size
//! offset pages and resolves user references through ordered lookup
//! strategies: by primary id first, then by external `accountId`.

use futures::stream::{self, Stream, TryStreamExt};
use pulse_db::models::user::User;
use pulse_db::repositories::{Page, UserRepo};
use pulse_db::{DbError, StoreHandle};

use crate::error::DirectoryUnavailable;

// ---------------------------------------------------------------------------
// Lookup
// ---------------------------------------------------------------------------

/// Outcome of a single lookup strategy.
#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error("No user matches '{0}'")]
    NotFound(String),

    #[error(transparent)]
    Store(#[from] DbError),
}

/// Which strategy resolved a reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedVia {
    Id,
    AccountId,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Resolved {
    pub user: User,
    pub via: ResolvedVia,
}

// ---------------------------------------------------------------------------
// UserDirectory
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct UserDirectory {
    store: StoreHandle,
    page_size: i64,
}

impl UserDirectory {
    pub fn new(store: StoreHandle, page_size: i64) -> Self {
        Self {
            store,
            page_size: page_size.max(1),
        }
    }

    pub fn page_size(&self) -> i64 {
        self.page_size
    }

    /// A single bounded page. Malformed user records are skipped with a
    /// warning; only a failed store read is an error.
    pub async fn list_page(&self, offset: i64, limit: i64) -> Result<Vec<User>, DirectoryUnavailable> {
        Ok(self.fetch_page(offset, limit).await?.items)
    }

    async fn fetch_page(&self, offset: i64, limit: i64) -> Result<Page<User>, DirectoryUnavailable> {
        UserRepo::list_page(&*self.store, offset, limit)
            .await
            .map_err(|source| DirectoryUnavailable { offset, source })
    }

    /// Stream of directory pages. Ends after the first short (or empty)
    /// page; yields the error and ends on a failed page. A page is short by
    /// the number of records read, so skipped records never end it early.
    pub fn pages(&self) -> impl Stream<Item = Result<Vec<User>, DirectoryUnavailable>> + '_ {
        stream::try_unfold(Some(0i64), move |next| async move {
            let Some(offset) = next else {
                return Ok::<_, DirectoryUnavailable>(None);
            };
            let page = self.fetch_page(offset, self.page_size).await?;
            if page.fetched == 0 {
                return Ok(None);
            }

            let fetched = page.fetched as i64;
            let next = (fetched >= self.page_size).then_some(offset + fetched);
            Ok(Some((page.items, next)))
        })
    }

    /// Every user, in directory order.
    pub async fn list_all_users(&self) -> Result<Vec<User>, DirectoryUnavailable> {
        let users: Vec<User> = self.pages().try_concat().await?;
        tracing::debug!(count = users.len(), "Enumerated user directory");
        Ok(users)
    }

    /// Lookup by primary id.
    pub async fn by_id(&self, id: &str) -> Result<User, LookupError> {
        UserRepo::find_by_id(&*self.store, id)
            .await?
            .ok_or_else(|| LookupError::NotFound(id.to_string()))
    }

    /// Lookup by external auth identity.
    pub async fn by_account_id(&self, account_id: &str) -> Result<User, LookupError> {
        UserRepo::find_by_account_id(&*self.store, account_id)
            .await?
            .ok_or_else(|| LookupError::NotFound(account_id.to_string()))
    }

    /// Resolve a reference by id, falling back to `accountId`.
    pub async fn resolve(&self, reference: &str) -> Result<Resolved, LookupError> {
        match self.by_id(reference).await {
            Ok(user) => {
                return Ok(Resolved {
                    user,
                    via: ResolvedVia::Id,
                })
            }
            Err(LookupError::NotFound(_)) => {}
            Err(e) => return Err(e),
        }

        self.by_account_id(reference).await.map(|user| Resolved {
            user,
            via: ResolvedVia::AccountId,
        })
    }
}
