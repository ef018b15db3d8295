//! Collection names.
//!
//! These must match the collection names of existing data sets; renaming
//! one silently empties it from the services' point of view.

pub const USERS: &str = "users";
pub const EVENTS: &str = "events";
pub const NOTIFICATIONS: &str = "notifications";
/// Video posts, the content records whose `creator` references users.
pub const CONTENT: &str = "videos";
pub const OUTBOX: &str = "outbox";
