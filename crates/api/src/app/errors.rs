use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use almox_core::DomainError;
use almox_infra::StoreError;

/// Handler error: anything the ledger or the repositories can fail with.
#[derive(Debug)]
pub struct ApiError(StoreError);

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        Self(err)
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        Self(StoreError::Domain(err))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        store_error_to_response(self.0)
    }
}

pub fn store_error_to_response(err: StoreError) -> Response {
    match err {
        StoreError::Domain(err) => domain_error_to_response(err),
        StoreError::Database(detail) => {
            tracing::error!(%detail, "storage operation failed");
            json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "operation_failed",
                "the operation could not be completed",
            )
        }
    }
}

pub fn domain_error_to_response(err: DomainError) -> Response {
    match err {
        DomainError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        DomainError::InvalidId(msg) => json_error(StatusCode::BAD_REQUEST, "invalid_id", msg),
        DomainError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
        DomainError::InsufficientStock {
            available,
            requested,
        } => (
            StatusCode::CONFLICT,
            axum::Json(json!({
                "error": "insufficient_stock",
                "message": format!("insufficient stock: {requested} requested, {available} available"),
                "available": available,
                "requested": requested,
            })),
        )
            .into_response(),
        DomainError::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", "not found"),
        DomainError::Unauthorized => {
            json_error(StatusCode::UNAUTHORIZED, "unauthorized", "unauthorized")
        }
    }
}

pub fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
