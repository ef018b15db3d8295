//! Document id generation.
//!
//! Fresh records get a time-ordered UUIDv7. Notifications produced by the
//! event fan-out get a UUIDv5 derived from `(event_id, user_id)` so that a
//! second write for the same pair collides instead of duplicating.

use uuid::Uuid;

use crate::types::DocId;

/// Namespace for notification ids. Changing it orphans every existing
/// deterministic id, so it is fixed for the lifetime of the data set.
const NOTIFICATION_NAMESPACE: Uuid = Uuid::from_u128(0x6e6f_7469_6679_4576_8b1e_7075_6c73_6501);

/// Generate a new unique document id (32 lowercase hex characters).
pub fn new_doc_id() -> DocId {
    Uuid::now_v7().simple().to_string()
}

/// Deterministic id of the notification telling `user_id` about `event_id`.
pub fn notification_id(event_id: &str, user_id: &str) -> DocId {
    let name = format!("{event_id}:{user_id}");
    Uuid::new_v5(&NOTIFICATION_NAMESPACE, name.as_bytes())
        .simple()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notification_id_is_stable() {
        assert_eq!(notification_id("e1", "u1"), notification_id("e1", "u1"));
    }

    #[test]
    fn notification_id_depends_on_both_parts() {
        assert_ne!(notification_id("e1", "u1"), notification_id("e1", "u2"));
        assert_ne!(notification_id("e1", "u1"), notification_id("e2", "u1"));
    }

    #[test]
    fn separator_prevents_concatenation_collisions() {
        assert_ne!(notification_id("ab", "c"), notification_id("a", "bc"));
    }

    #[test]
    fn new_doc_ids_are_unique_hex() {
        let a = new_doc_id();
        let b = new_doc_id();
        assert_ne!(a, b);
        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
