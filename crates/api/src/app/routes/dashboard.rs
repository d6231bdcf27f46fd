use std::sync::Arc;

use axum::{Extension, Json};

use almox_infra::Dashboard;

use crate::app::errors::ApiError;
use crate::app::services::AppServices;

pub async fn dashboard(
    Extension(services): Extension<Arc<AppServices>>,
) -> Result<Json<Dashboard>, ApiError> {
    Ok(Json(services.assets.dashboard().await?))
}
