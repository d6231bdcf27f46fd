use std::sync::Arc;

use axum::{
    Extension, Json, Router,
    extract::{Path, Query},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use tracing::instrument;

use almox_auth::SessionContext;
use almox_core::StockItemId;
use almox_infra::{Adjustment, DeletedItem, MovementOutcome};
use almox_stock::{MovementWithItem, Reconciliation, StockItem, StockMovement};

use crate::app::dto;
use crate::app::errors::ApiError;
use crate::app::extract::JsonBody;
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/items", get(list_items))
        .route("/items/:id", get(get_item).delete(delete_item))
        .route("/items/:id/movements", get(item_movements).post(apply_movement))
        .route("/items/:id/adjust", post(adjust_item))
        .route("/items/:id/reconcile", get(reconcile))
        .route("/deposits", post(deposit))
        .route("/movements", get(list_movements))
}

pub async fn list_items(
    Extension(services): Extension<Arc<AppServices>>,
) -> Result<Json<Vec<StockItem>>, ApiError> {
    Ok(Json(services.ledger.list_items().await?))
}

pub async fn get_item(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Result<Json<StockItem>, ApiError> {
    let id: StockItemId = id.parse()?;
    Ok(Json(services.ledger.get_item(id).await?))
}

/// `201` when the deposit registered a new item, `200` when it topped up an existing one.
#[instrument(skip_all, fields(user = %session.user_name()))]
pub async fn deposit(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    JsonBody(body): JsonBody<dto::DepositRequest>,
) -> Result<Response, ApiError> {
    let deposit = services
        .ledger
        .register_or_deposit(&body.name, body.quantity)
        .await?;
    let status = if deposit.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(deposit)).into_response())
}

#[instrument(skip_all, fields(user = %session.user_name()))]
pub async fn apply_movement(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<dto::MovementBody>,
) -> Result<(StatusCode, Json<MovementOutcome>), ApiError> {
    let id: StockItemId = id.parse()?;
    let outcome = services.ledger.apply_movement(id, body.as_request()).await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

#[instrument(skip_all, fields(user = %session.user_name()))]
pub async fn adjust_item(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<dto::AdjustRequest>,
) -> Result<Json<Adjustment>, ApiError> {
    let id: StockItemId = id.parse()?;
    let adjustment = services
        .ledger
        .adjust_item(id, &body.name, body.add, body.sub, body.reason.as_deref())
        .await?;
    Ok(Json(adjustment))
}

#[instrument(skip_all, fields(user = %session.user_name()))]
pub async fn delete_item(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    Path(id): Path<String>,
) -> Result<Json<DeletedItem>, ApiError> {
    let id: StockItemId = id.parse()?;
    Ok(Json(services.ledger.delete_item(id).await?))
}

pub async fn item_movements(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Query(query): Query<dto::LimitQuery>,
) -> Result<Json<Vec<StockMovement>>, ApiError> {
    let id: StockItemId = id.parse()?;
    Ok(Json(services.ledger.item_movements(id, query.limit).await?))
}

pub async fn list_movements(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<dto::LimitQuery>,
) -> Result<Json<Vec<MovementWithItem>>, ApiError> {
    Ok(Json(services.ledger.list_movements(query.limit).await?))
}

pub async fn reconcile(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Result<Json<Reconciliation>, ApiError> {
    let id: StockItemId = id.parse()?;
    Ok(Json(services.ledger.reconcile(id).await?))
}
