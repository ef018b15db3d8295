use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use pulse_core::error::CoreError;
use pulse_db::store::StoreError;
use pulse_db::DbError;
use pulse_events::{PublishError, ReadStateError, VerifyError};
use pulse_integrity::IntegrityError;
use serde_json::json;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] for domain errors and [`DbError`] for store failures,
/// and adds HTTP-specific variants. The component errors of the
/// notification and integrity crates convert into these variants so
/// handlers can use `?` throughout.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `pulse_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A store or record-schema error from `pulse_db`.
    #[error(transparent)]
    Db(#[from] DbError),

    /// Ground truth could not be fetched; the caller may retry.
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl From<PublishError> for AppError {
    fn from(err: PublishError) -> Self {
        match err {
            PublishError::Validation(errors) => {
                AppError::Core(CoreError::Validation(errors.to_string()))
            }
            PublishError::UnknownUser(id) => AppError::Core(CoreError::Unauthorized(format!(
                "Unknown user: {id}"
            ))),
            PublishError::Forbidden(_) => {
                AppError::Core(CoreError::Forbidden("Admin role required".into()))
            }
            PublishError::Store(e) => AppError::Db(e),
        }
    }
}

impl From<VerifyError> for AppError {
    fn from(err: VerifyError) -> Self {
        match err {
            VerifyError::EventNotFound(id) => AppError::Core(CoreError::not_found("Event", id)),
            VerifyError::VerificationIncomplete(msg) => AppError::Unavailable(msg),
        }
    }
}

impl From<ReadStateError> for AppError {
    fn from(err: ReadStateError) -> Self {
        match err {
            ReadStateError::NotFound(id) => {
                AppError::Core(CoreError::not_found("Notification", id))
            }
            ReadStateError::Store(e) => AppError::Db(e),
        }
    }
}

impl From<IntegrityError> for AppError {
    fn from(err: IntegrityError) -> Self {
        match err {
            IntegrityError::Directory(e) => AppError::Unavailable(e.to_string()),
            IntegrityError::FallbackUserNotFound(id) => AppError::Core(CoreError::Validation(
                format!("Fallback user {id} does not exist"),
            )),
            IntegrityError::Store(e) => AppError::Db(e),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            // --- CoreError variants ---
            AppError::Core(core) => match core {
                CoreError::NotFound { entity, id } => (
                    StatusCode::NOT_FOUND,
                    "NOT_FOUND",
                    format!("{entity} with id {id} not found"),
                ),
                CoreError::Validation(msg) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
                }
                CoreError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
                CoreError::Unauthorized(msg) => {
                    (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone())
                }
                CoreError::Forbidden(msg) => (StatusCode::FORBIDDEN, "FORBIDDEN", msg.clone()),
                CoreError::Internal(msg) => {
                    tracing::error!(error = %msg, "Internal core error");
                    internal()
                }
            },

            // --- Store errors ---
            AppError::Db(err) => classify_db_error(err),

            // --- HTTP-specific errors ---
            AppError::Unavailable(msg) => {
                tracing::warn!(error = %msg, "Dependency unavailable");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "SERVICE_UNAVAILABLE",
                    msg.clone(),
                )
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

fn internal() -> (StatusCode, &'static str, String) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        "An internal error occurred".to_string(),
    )
}

/// Classify a store error into an HTTP status, error code, and message.
///
/// - Id collisions map to 409.
/// - An unreachable backend maps to 503.
/// - Malformed records and database errors map to 500 with a sanitized
///   message; the detail is logged.
fn classify_db_error(err: &DbError) -> (StatusCode, &'static str, String) {
    match err {
        DbError::Store(StoreError::AlreadyExists { collection, id }) => (
            StatusCode::CONFLICT,
            "CONFLICT",
            format!("{collection} record {id} already exists"),
        ),
        DbError::Store(StoreError::Unavailable(msg)) => {
            tracing::warn!(error = %msg, "Store unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                "SERVICE_UNAVAILABLE",
                "The document store is unavailable".to_string(),
            )
        }
        DbError::Store(StoreError::InvalidQuery(msg)) => {
            tracing::error!(error = %msg, "Invalid store query");
            internal()
        }
        DbError::Store(StoreError::Database(e)) => {
            tracing::error!(error = %e, "Database error");
            internal()
        }
        DbError::MalformedRecord { .. } => {
            tracing::error!(error = %err, "Malformed record");
            internal()
        }
    }
}
