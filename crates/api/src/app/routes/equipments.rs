use std::sync::Arc;

use axum::{
    Extension, Json, Router,
    extract::{Path, Query},
    http::StatusCode,
    routing::get,
};
use tracing::instrument;

use almox_auth::SessionContext;
use almox_assets::Equipment;
use almox_core::{DomainError, EquipmentId};

use crate::app::dto;
use crate::app::errors::ApiError;
use crate::app::extract::JsonBody;
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/equipments", get(search_equipment).post(create_equipment))
        .route("/equipments/by-barcode", get(find_by_barcode))
        .route(
            "/equipments/:id",
            get(get_equipment).put(update_equipment).delete(delete_equipment),
        )
}

pub async fn search_equipment(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<dto::EquipmentQuery>,
) -> Result<Json<Vec<Equipment>>, ApiError> {
    let filter = query.into_filter()?;
    Ok(Json(services.assets.search_equipment(&filter).await?))
}

#[instrument(skip_all, fields(user = %session.user_name()))]
pub async fn create_equipment(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    JsonBody(body): JsonBody<dto::EquipmentRequest>,
) -> Result<(StatusCode, Json<Equipment>), ApiError> {
    let equipment = services
        .assets
        .create_equipment(body.as_input(), body.invoice.as_ref())
        .await?;
    Ok((StatusCode::CREATED, Json(equipment)))
}

pub async fn get_equipment(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Result<Json<Equipment>, ApiError> {
    let id: EquipmentId = id.parse()?;
    Ok(Json(services.assets.get_equipment(id).await?))
}

#[instrument(skip_all, fields(user = %session.user_name()))]
pub async fn update_equipment(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<dto::EquipmentRequest>,
) -> Result<Json<Equipment>, ApiError> {
    let id: EquipmentId = id.parse()?;
    let equipment = services
        .assets
        .update_equipment(id, body.as_input(), body.invoice.as_ref())
        .await?;
    Ok(Json(equipment))
}

#[instrument(skip_all, fields(user = %session.user_name()))]
pub async fn delete_equipment(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    Path(id): Path<String>,
) -> Result<Json<Equipment>, ApiError> {
    let id: EquipmentId = id.parse()?;
    Ok(Json(services.assets.delete_equipment(id).await?))
}

pub async fn find_by_barcode(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<dto::BarcodeQuery>,
) -> Result<Json<Equipment>, ApiError> {
    services
        .assets
        .find_by_barcode(&query.code)
        .await?
        .map(Json)
        .ok_or_else(|| DomainError::NotFound.into())
}
