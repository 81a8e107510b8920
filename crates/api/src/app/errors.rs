use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use stockledger_infra::InventoryError;

/// Status and machine-readable code for each service outcome.
pub fn status_of(err: &InventoryError) -> (StatusCode, &'static str) {
    match err {
        InventoryError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
        InventoryError::InsufficientStock { .. } => {
            (StatusCode::UNPROCESSABLE_ENTITY, "insufficient_stock")
        }
        InventoryError::DuplicateSku(_) => (StatusCode::CONFLICT, "duplicate_sku"),
        InventoryError::UnknownProduct(_) => (StatusCode::UNPROCESSABLE_ENTITY, "unknown_product"),
        InventoryError::BalanceViewUnavailable(_) => {
            (StatusCode::SERVICE_UNAVAILABLE, "balance_view_unavailable")
        }
        InventoryError::Store(_) => (StatusCode::BAD_GATEWAY, "store_error"),
    }
}

pub fn inventory_error_to_response(err: InventoryError) -> axum::response::Response {
    let (status, code) = status_of(&err);
    match err {
        InventoryError::InsufficientStock { available, requested } => (
            status,
            axum::Json(json!({
                "error": code,
                "message": err.to_string(),
                "available": available,
                "requested": requested,
            })),
        )
            .into_response(),
        InventoryError::Store(ref e) => {
            tracing::error!(error = %e, "store request failed");
            json_error(status, code, err.to_string())
        }
        _ => json_error(status, code, err.to_string()),
    }
}

/// Body/query extraction failures (malformed JSON, missing fields, bad numbers).
pub fn rejection_to_response(rejection: impl std::fmt::Display) -> axum::response::Response {
    json_error(StatusCode::BAD_REQUEST, "validation_error", rejection.to_string())
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
