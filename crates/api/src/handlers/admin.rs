//! Handlers for the `/admin` resource.
//!
//! Delivery reconciliation, creator-reference integrity, dashboard stats
//! and role management. All endpoints require [`RequireAdmin`].

use axum::extract::{Path, State};
use axum::Json;
use pulse_core::error::CoreError;
use pulse_core::roles::Role;
use pulse_db::models::user::User;
use pulse_db::repositories::UserRepo;
use pulse_events::{stats, LookupError, NotificationStats, Reconciliation};
use pulse_integrity::{Diagnosis, RepairReport};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::middleware::rbac::RequireAdmin;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// A diagnosis with its overall health label.
#[derive(Debug, Serialize)]
pub struct DiagnosisResponse {
    #[serde(flatten)]
    pub diagnosis: Diagnosis,
    pub health: &'static str,
}

impl From<Diagnosis> for DiagnosisResponse {
    fn from(diagnosis: Diagnosis) -> Self {
        let health = diagnosis.health();
        Self { diagnosis, health }
    }
}

#[derive(Debug, Deserialize)]
pub struct RepairRequest {
    pub fallback_user_id: String,
}

#[derive(Debug, Serialize)]
pub struct RepairResponse {
    pub diagnosis: DiagnosisResponse,
    pub repair: RepairReport,
}

#[derive(Debug, Serialize)]
pub struct ReconcileResponse {
    #[serde(flatten)]
    pub reconciliation: Reconciliation,
    pub complete: bool,
}

#[derive(Debug, Deserialize)]
pub struct UpdateRoleRequest {
    pub role: String,
}

// ---------------------------------------------------------------------------
// Delivery
// ---------------------------------------------------------------------------

/// POST /api/v1/admin/events/{id}/verify-and-resend
///
/// Verify delivery of an event and write notifications for every user
/// found missing. Safe to repeat: with nobody missing nothing is written.
pub async fn verify_and_resend(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(event_id): Path<String>,
) -> AppResult<Json<DataResponse<ReconcileResponse>>> {
    let reconciliation = state.services.resend.reconcile(&event_id).await?;

    tracing::info!(
        admin_id = %admin.user_id,
        event_id = %event_id,
        missing = reconciliation.verification.missing.len(),
        resent = reconciliation.resend.succeeded,
        "Manual verify-and-resend"
    );

    let complete = reconciliation.is_complete();
    Ok(Json(DataResponse {
        data: ReconcileResponse {
            reconciliation,
            complete,
        },
    }))
}

/// GET /api/v1/admin/notifications/stats
pub async fn notification_stats(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<NotificationStats>>> {
    let stats = stats::collect(&*state.store).await?;
    Ok(Json(DataResponse { data: stats }))
}

// ---------------------------------------------------------------------------
// Integrity
// ---------------------------------------------------------------------------

/// POST /api/v1/admin/integrity/diagnose
pub async fn diagnose(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<DiagnosisResponse>>> {
    let diagnosis = state.scanner.diagnose().await?;
    Ok(Json(DataResponse {
        data: diagnosis.into(),
    }))
}

/// POST /api/v1/admin/integrity/repair
///
/// Diagnose, then point every orphaned record at `fallback_user_id`.
/// Individual update failures are listed in `repair.errors`.
pub async fn repair(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Json(input): Json<RepairRequest>,
) -> AppResult<Json<DataResponse<RepairResponse>>> {
    let fallback = input.fallback_user_id.trim();
    if fallback.is_empty() {
        return Err(AppError::BadRequest("fallback_user_id is required".into()));
    }

    let diagnosis = state.scanner.diagnose().await?;
    let repair = state.scanner.repair(&diagnosis, fallback).await?;

    tracing::info!(
        admin_id = %admin.user_id,
        fallback_user_id = fallback,
        fixed = repair.fixed,
        "Creator references repaired"
    );

    Ok(Json(DataResponse {
        data: RepairResponse {
            diagnosis: diagnosis.into(),
            repair,
        },
    }))
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

/// PUT /api/v1/admin/users/{account_id}/role
///
/// The target is addressed by external account id, the identity admins
/// see in the auth provider's console.
pub async fn update_role(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(account_id): Path<String>,
    Json(input): Json<UpdateRoleRequest>,
) -> AppResult<Json<DataResponse<User>>> {
    let role: Role = input.role.parse()?;

    let target = match state.services.directory.by_account_id(&account_id).await {
        Ok(user) => user,
        Err(LookupError::NotFound(_)) => {
            return Err(AppError::Core(CoreError::not_found("User", account_id)))
        }
        Err(LookupError::Store(e)) => return Err(e.into()),
    };

    let updated = UserRepo::update_role(&*state.store, &target.id, role)
        .await?
        .ok_or_else(|| AppError::Core(CoreError::not_found("User", target.id.clone())))?;

    tracing::info!(
        admin_id = %admin.user_id,
        user_id = %updated.id,
        role = %role,
        "User role changed"
    );

    Ok(Json(DataResponse { data: updated }))
}
