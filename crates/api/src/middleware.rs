use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use chrono::Utc;

use almox_auth::{SessionContext, SessionTokens};

use crate::app::errors::json_error;

#[derive(Clone)]
pub struct AuthState {
    pub tokens: Arc<dyn SessionTokens>,
}

/// Validate the bearer token and attach a [`SessionContext`] to the request.
pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, Response> {
    let Some(token) = extract_bearer(req.headers()) else {
        return Err(unauthorized("missing bearer token"));
    };

    let claims = state.tokens.verify(token, Utc::now()).map_err(|e| {
        tracing::debug!(error = %e, "session token rejected");
        unauthorized("invalid or expired session")
    })?;

    req.extensions_mut().insert(SessionContext::from_claims(&claims));

    Ok(next.run(req).await)
}

fn unauthorized(message: &'static str) -> Response {
    json_error(StatusCode::UNAUTHORIZED, "unauthorized", message)
}

fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    let header = headers.get(axum::http::header::AUTHORIZATION)?;
    let header = header.to_str().ok()?;
    let token = header.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then_some(token)
}
