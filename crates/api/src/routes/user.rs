use axum::routing::put;
use axum::Router;

use crate::handlers::user;
use crate::state::AppState;

/// Routes mounted at `/users`.
///
/// ```text
/// PUT    /me/push-token   -> update_push_token
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/me/push-token", put(user::update_push_token))
}
