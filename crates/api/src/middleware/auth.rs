//! Acting-user extractor for Axum handlers.
//!
//! Session mechanics live in the upstream auth provider; requests reach
//! this service carrying the caller's identity in the `x-user-id` header,
//! either a user id or an external account id.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use pulse_core::error::CoreError;
use pulse_core::roles::Role;
use pulse_core::types::DocId;
use pulse_events::LookupError;

use crate::error::AppError;
use crate::state::AppState;

/// Header carrying the acting user's id or account id.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Authenticated user, resolved against the user directory.
///
/// ```ignore
/// async fn my_handler(user: AuthUser) -> AppResult<Json<()>> {
///     tracing::info!(user_id = %user.user_id, role = %user.role, "handling request");
///     Ok(Json(()))
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AuthUser {
    /// The user's primary id, even when the header carried an account id.
    pub user_id: DocId,
    /// Role read from the user record at request time.
    pub role: Role,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let reference = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| {
                AppError::Core(CoreError::Unauthorized(format!(
                    "Missing {USER_ID_HEADER} header"
                )))
            })?;

        match state.services.directory.resolve(reference).await {
            Ok(resolved) => Ok(AuthUser {
                user_id: resolved.user.id,
                role: resolved.user.role,
            }),
            Err(LookupError::NotFound(_)) => Err(AppError::Core(CoreError::Unauthorized(
                "Unknown user".into(),
            ))),
            Err(LookupError::Store(e)) => Err(AppError::Db(e)),
        }
    }
}
