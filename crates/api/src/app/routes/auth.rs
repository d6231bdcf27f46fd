use std::sync::Arc;

use axum::{Extension, Json, http::StatusCode, response::Response};
use chrono::Utc;
use serde_json::json;

use crate::app::{dto, errors};
use crate::app::extract::JsonBody;
use crate::app::services::AppServices;

/// `POST /auth/login`: exchange the configured credentials for a session token.
pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    JsonBody(body): JsonBody<dto::LoginRequest>,
) -> Result<Json<serde_json::Value>, Response> {
    let user = services
        .credentials
        .verify(&body.username, &body.password)
        .map_err(|e| {
            tracing::warn!(username = %body.username.trim(), "login rejected");
            errors::json_error(StatusCode::UNAUTHORIZED, "invalid_credentials", e.to_string())
        })?;

    let issued = services.tokens.issue(user, Utc::now()).map_err(|e| {
        tracing::error!(error = %e, "failed to issue session token");
        errors::json_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "operation_failed",
            "the operation could not be completed",
        )
    })?;

    tracing::info!(user, "session opened");
    Ok(Json(json!({
        "token": issued.token,
        "expires_at": issued.expires_at,
    })))
}
