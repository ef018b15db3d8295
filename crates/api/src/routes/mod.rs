pub mod admin;
pub mod event;
pub mod health;
pub mod notification;
pub mod user;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /events                                    create (admin), list
/// /events/{id}                               get
///
/// /notifications                             list (caller's own)
/// /notifications/unread-count                unread count
/// /notifications/read-all                    mark all read (POST)
/// /notifications/{id}/read                   mark read (POST)
/// /notifications/{id}                        delete
///
/// /users/me/push-token                       register/clear push token (PUT)
///
/// /admin/events/{id}/verify-and-resend       reconcile delivery (POST)
/// /admin/notifications/stats                 delivery stats
/// /admin/integrity/diagnose                  orphan scan (POST)
/// /admin/integrity/repair                    orphan repair (POST)
/// /admin/users/{account_id}/role             change role (PUT)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/events", event::router())
        .nest("/notifications", notification::router())
        .nest("/users", user::router())
        .nest("/admin", admin::router())
}
