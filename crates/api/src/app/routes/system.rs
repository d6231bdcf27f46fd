use axum::{Extension, Json, http::StatusCode, response::IntoResponse};

use almox_auth::SessionContext;

pub async fn health() -> StatusCode {
    StatusCode::OK
}

pub async fn whoami(Extension(session): Extension<SessionContext>) -> impl IntoResponse {
    Json(serde_json::json!({
        "user": session.user_name(),
        "expires_at": session.expires_at(),
    }))
}
