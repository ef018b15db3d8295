//! Handlers for the `/events` resource.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use pulse_core::error::CoreError;
use pulse_db::models::event::{Event, EventDraft};
use pulse_db::repositories::EventRepo;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::query::PaginationParams;
use crate::response::DataResponse;
use crate::state::AppState;

/// POST /api/v1/events
///
/// Create an event and schedule its notification fan-out. Responds once
/// the event is persisted; delivery continues in the outbox worker. The
/// acting user must be an admin.
pub async fn create_event(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(draft): Json<EventDraft>,
) -> AppResult<(StatusCode, Json<DataResponse<Event>>)> {
    let event = state
        .services
        .publisher
        .create_event_and_notify(draft, &auth.user_id)
        .await?;

    Ok((StatusCode::CREATED, Json(DataResponse { data: event })))
}

/// GET /api/v1/events
pub async fn list_events(
    _auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
) -> AppResult<Json<DataResponse<Vec<Event>>>> {
    let events = EventRepo::list(&*state.store, params.limit(), params.offset()).await?;
    Ok(Json(DataResponse { data: events }))
}

/// GET /api/v1/events/{id}
pub async fn get_event(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<DataResponse<Event>>> {
    let event = EventRepo::find_by_id(&*state.store, &id)
        .await?
        .ok_or_else(|| AppError::Core(CoreError::not_found("Event", id)))?;

    Ok(Json(DataResponse { data: event }))
}
