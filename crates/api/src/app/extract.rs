//! Request extractors whose rejections use the API error envelope.

use axum::extract::{FromRequest, Request};
use axum::http::StatusCode;
use axum::response::Response;
use axum::{Json, async_trait};
use serde::de::DeserializeOwned;

use crate::app::errors::json_error;

/// `Json<T>` whose rejection is a `400 validation_error` JSON body instead of
/// axum's plain-text response.
#[derive(Debug)]
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => {
                tracing::debug!(status = %rejection.status(), "request body rejected");
                Err(json_error(
                    StatusCode::BAD_REQUEST,
                    "validation_error",
                    rejection.body_text(),
                ))
            }
        }
    }
}
