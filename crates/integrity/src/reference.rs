//! Creator-reference classification.
//!
//! Pure functions over a preloaded [`UserIndex`]; the scanner decides what
//! to do when the index is only a sample of the directory.

use std::collections::{HashMap, HashSet};
use std::fmt;

use pulse_core::types::DocId;
use pulse_db::models::content::CreatorRef;
use pulse_db::models::user::User;
use serde::Serialize;

// ---------------------------------------------------------------------------
// Health status constants
// ---------------------------------------------------------------------------

/// Every sampled record resolves to a user.
pub const HEALTH_HEALTHY: &str = "healthy";
/// At least one sampled record is orphaned.
pub const HEALTH_WARNING: &str = "warning";

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// Why a record's creator does not resolve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum OrphanReason {
    MissingCreator,
    /// Creator present but not an id (holds what was found).
    MalformedCreator(String),
    /// Creator is an id matching neither a user id nor an account id.
    UnknownUser(String),
}

impl fmt::Display for OrphanReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingCreator => f.write_str("creator is missing"),
            Self::MalformedCreator(found) => write!(f, "creator is malformed ({found})"),
            Self::UnknownUser(id) => write!(f, "creator '{id}' matches no user"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Classification {
    /// Creator is a user's primary id.
    Valid,
    /// Creator is a user's `accountId`.
    ValidByAlias,
    Orphaned { reason: OrphanReason },
}

/// In-memory id and alias index over a set of users.
#[derive(Debug, Default, Clone)]
pub struct UserIndex {
    ids: HashSet<DocId>,
    account_ids: HashMap<String, DocId>,
}

impl UserIndex {
    pub fn new(users: &[User]) -> Self {
        Self {
            ids: users.iter().map(|u| u.id.clone()).collect(),
            account_ids: users
                .iter()
                .map(|u| (u.account_id.clone(), u.id.clone()))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Classify a creator reference. Id matches take precedence over alias
/// matches.
pub fn classify(creator: &CreatorRef, index: &UserIndex) -> Classification {
    match creator {
        CreatorRef::Missing => Classification::Orphaned {
            reason: OrphanReason::MissingCreator,
        },
        CreatorRef::Malformed(found) => Classification::Orphaned {
            reason: OrphanReason::MalformedCreator(found.clone()),
        },
        CreatorRef::Id(id) if index.ids.contains(id) => Classification::Valid,
        CreatorRef::Id(id) if index.account_ids.contains_key(id) => Classification::ValidByAlias,
        CreatorRef::Id(id) => Classification::Orphaned {
            reason: OrphanReason::UnknownUser(id.clone()),
        },
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use pulse_core::roles::Role;

    use super::*;

    fn user(id: &str, account_id: &str) -> User {
        User {
            id: id.into(),
            account_id: account_id.into(),
            username: id.into(),
            email: None,
            role: Role::User,
            push_token: None,
            last_token_update: None,
            created_at: Utc::now(),
        }
    }

    fn index() -> UserIndex {
        UserIndex::new(&[user("u1", "acc-1"), user("u2", "acc-2")])
    }

    #[test]
    fn id_match_is_valid() {
        assert_eq!(classify(&CreatorRef::Id("u1".into()), &index()), Classification::Valid);
    }

    #[test]
    fn account_id_match_is_valid_by_alias() {
        assert_eq!(
            classify(&CreatorRef::Id("acc-2".into()), &index()),
            Classification::ValidByAlias
        );
    }

    #[test]
    fn id_takes_precedence_over_alias() {
        // u3's account id collides with u1's primary id.
        let index = UserIndex::new(&[user("u1", "acc-1"), user("u3", "u1")]);
        assert_eq!(classify(&CreatorRef::Id("u1".into()), &index), Classification::Valid);
    }

    #[test]
    fn unknown_missing_and_malformed_are_orphaned() {
        assert_eq!(
            classify(&CreatorRef::Id("ghost-id".into()), &index()),
            Classification::Orphaned {
                reason: OrphanReason::UnknownUser("ghost-id".into())
            }
        );
        assert_eq!(
            classify(&CreatorRef::Missing, &index()),
            Classification::Orphaned {
                reason: OrphanReason::MissingCreator
            }
        );
        assert_eq!(
            classify(&CreatorRef::Malformed("number".into()), &index()),
            Classification::Orphaned {
                reason: OrphanReason::MalformedCreator("number".into())
            }
        );
    }

    #[test]
    fn reasons_render_for_reports() {
        assert_eq!(
            OrphanReason::UnknownUser("ghost-id".into()).to_string(),
            "creator 'ghost-id' matches no user"
        );
    }
}
