//! Route definitions for `/admin`.
//!
//! Every handler takes [`RequireAdmin`](crate::middleware::rbac::RequireAdmin).

use axum::routing::{get, post, put};
use axum::Router;

use crate::handlers::admin;
use crate::state::AppState;

/// Routes mounted at `/admin`.
///
/// ```text
/// POST   /events/{id}/verify-and-resend   -> verify_and_resend
/// GET    /notifications/stats             -> notification_stats
/// POST   /integrity/diagnose              -> diagnose
/// POST   /integrity/repair                -> repair
/// PUT    /users/{account_id}/role         -> update_role
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/events/{id}/verify-and-resend",
            post(admin::verify_and_resend),
        )
        .route("/notifications/stats", get(admin::notification_stats))
        .route("/integrity/diagnose", post(admin::diagnose))
        .route("/integrity/repair", post(admin::repair))
        .route("/users/{account_id}/role", put(admin::update_role))
}
