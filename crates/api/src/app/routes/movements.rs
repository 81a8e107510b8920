use std::sync::Arc;

use axum::{
    extract::{
        Extension, Query,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    response::IntoResponse,
    routing::post,
    Json, Router,
};

use stockledger_infra::InventoryService;
use stockledger_infra::service::RECENT_MOVEMENTS;

use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new().route("/", post(create_movement).get(list_movements))
}

pub async fn create_movement(
    Extension(services): Extension<Arc<InventoryService>>,
    body: Result<Json<dto::CreateMovementRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(e) => return errors::rejection_to_response(e),
    };

    match services.record_movement(body.into()).await {
        Ok(movement) => (StatusCode::CREATED, Json(movement)).into_response(),
        Err(e) => errors::inventory_error_to_response(e),
    }
}

pub async fn list_movements(
    Extension(services): Extension<Arc<InventoryService>>,
    query: Result<Query<dto::ListMovementsQuery>, QueryRejection>,
) -> axum::response::Response {
    let Query(query) = match query {
        Ok(q) => q,
        Err(e) => return errors::rejection_to_response(e),
    };

    let limit = query.limit.unwrap_or(RECENT_MOVEMENTS);
    match services.recent_movements(limit).await {
        Ok(moves) => Json(dto::ItemsResponse::from(moves)).into_response(),
        Err(e) => errors::inventory_error_to_response(e),
    }
}
