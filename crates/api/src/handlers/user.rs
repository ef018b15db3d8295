//! Handlers for the caller's own user record.

use axum::extract::State;
use axum::Json;
use pulse_core::error::CoreError;
use pulse_db::models::user::User;
use pulse_db::repositories::UserRepo;
use serde::Deserialize;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// Body of `PUT /users/me/push-token`. A `null` token unregisters the
/// device.
#[derive(Debug, Deserialize, Validate)]
pub struct PushTokenRequest {
    #[validate(length(min = 1, max = 512))]
    pub push_token: Option<String>,
}

/// PUT /api/v1/users/me/push-token
pub async fn update_push_token(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<PushTokenRequest>,
) -> AppResult<Json<DataResponse<User>>> {
    input
        .validate()
        .map_err(|e| AppError::Core(CoreError::Validation(e.to_string())))?;

    let user = UserRepo::update_push_token(&*state.store, &auth.user_id, input.push_token.as_deref())
        .await?
        .ok_or_else(|| AppError::Core(CoreError::not_found("User", auth.user_id.clone())))?;

    tracing::debug!(
        user_id = %user.id,
        registered = user.push_token.is_some(),
        "Push token updated"
    );
    Ok(Json(DataResponse { data: user }))
}
