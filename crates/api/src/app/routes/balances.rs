use std::sync::Arc;

use axum::{extract::Extension, response::IntoResponse, routing::get, Json, Router};

use stockledger_infra::InventoryService;

use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new().route("/", get(list_balances))
}

/// Balances ordered by product name. A missing view answers 503, not an empty list.
pub async fn list_balances(
    Extension(services): Extension<Arc<InventoryService>>,
) -> axum::response::Response {
    match services.list_balances().await {
        Ok(rows) => Json(dto::ItemsResponse::from(rows)).into_response(),
        Err(e) => errors::inventory_error_to_response(e),
    }
}
