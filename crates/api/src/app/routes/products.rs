use std::sync::Arc;

use axum::{
    extract::{Extension, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
    routing::post,
    Json, Router,
};

use stockledger_infra::InventoryService;

use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new().route("/", post(create_product).get(list_products))
}

pub async fn create_product(
    Extension(services): Extension<Arc<InventoryService>>,
    body: Result<Json<dto::CreateProductRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(e) => return errors::rejection_to_response(e),
    };

    match services.register_product(body.into()).await {
        Ok(product) => (StatusCode::CREATED, Json(product)).into_response(),
        Err(e) => errors::inventory_error_to_response(e),
    }
}

pub async fn list_products(
    Extension(services): Extension<Arc<InventoryService>>,
) -> axum::response::Response {
    match services.list_products().await {
        Ok(products) => Json(dto::ItemsResponse::from(products)).into_response(),
        Err(e) => errors::inventory_error_to_response(e),
    }
}
