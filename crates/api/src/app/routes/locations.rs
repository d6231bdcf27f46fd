use std::sync::Arc;

use axum::{
    Extension, Json, Router,
    extract::{Path, Query},
    http::StatusCode,
    routing::{get, put},
};
use tracing::instrument;

use almox_auth::SessionContext;
use almox_assets::{Location, Sector};
use almox_core::{LocationId, SectorId};

use crate::app::dto;
use crate::app::errors::ApiError;
use crate::app::extract::JsonBody;
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/locations", get(list_locations).post(create_location))
        .route(
            "/locations/:id",
            get(get_location).put(update_location).delete(delete_location),
        )
        .route("/locations/:id/sectors", get(list_sectors).post(create_sector))
        .route("/sectors/:id", put(update_sector).delete(delete_sector))
}

pub async fn list_locations(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<dto::LocationQuery>,
) -> Result<Json<Vec<Location>>, ApiError> {
    Ok(Json(services.assets.list_locations(query.q.as_deref()).await?))
}

#[instrument(skip_all, fields(user = %session.user_name()))]
pub async fn create_location(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    JsonBody(body): JsonBody<dto::LocationRequest>,
) -> Result<(StatusCode, Json<Location>), ApiError> {
    let location = services.assets.create_location(body.as_input()).await?;
    Ok((StatusCode::CREATED, Json(location)))
}

pub async fn get_location(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Result<Json<Location>, ApiError> {
    let id: LocationId = id.parse()?;
    Ok(Json(services.assets.get_location(id).await?))
}

#[instrument(skip_all, fields(user = %session.user_name()))]
pub async fn update_location(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<dto::LocationRequest>,
) -> Result<Json<Location>, ApiError> {
    let id: LocationId = id.parse()?;
    Ok(Json(services.assets.update_location(id, body.as_input()).await?))
}

#[instrument(skip_all, fields(user = %session.user_name()))]
pub async fn delete_location(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    Path(id): Path<String>,
) -> Result<Json<Location>, ApiError> {
    let id: LocationId = id.parse()?;
    Ok(Json(services.assets.delete_location(id).await?))
}

pub async fn list_sectors(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Sector>>, ApiError> {
    let id: LocationId = id.parse()?;
    Ok(Json(services.assets.list_sectors(Some(id)).await?))
}

#[instrument(skip_all, fields(user = %session.user_name()))]
pub async fn create_sector(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<dto::SectorRequest>,
) -> Result<(StatusCode, Json<Sector>), ApiError> {
    let id: LocationId = id.parse()?;
    let sector = services.assets.create_sector(Some(id), &body.name).await?;
    Ok((StatusCode::CREATED, Json(sector)))
}

#[instrument(skip_all, fields(user = %session.user_name()))]
pub async fn update_sector(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<dto::SectorRequest>,
) -> Result<Json<Sector>, ApiError> {
    let id: SectorId = id.parse()?;
    let sector = services
        .assets
        .update_sector(id, body.location_id, &body.name)
        .await?;
    Ok(Json(sector))
}

#[instrument(skip_all, fields(user = %session.user_name()))]
pub async fn delete_sector(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    Path(id): Path<String>,
) -> Result<Json<Sector>, ApiError> {
    let id: SectorId = id.parse()?;
    Ok(Json(services.assets.delete_sector(id).await?))
}
