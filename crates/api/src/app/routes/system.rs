use std::sync::Arc;

use axum::{
    extract::State,
    http::{StatusCode, Uri},
    response::{Html, IntoResponse},
};

use crate::app::{errors, ui};

pub async fn health() -> StatusCode {
    StatusCode::OK
}

/// Why the store could not be reached at startup.
#[derive(Debug, Clone)]
pub struct StoreUnavailable {
    pub reason: String,
}

impl StoreUnavailable {
    pub fn message(&self) -> String {
        format!(
            "inventory store is unavailable ({}); \
             verify STORE_BACKEND and its connection settings, then restart",
            self.reason
        )
    }
}

/// Fallback for every route when the startup connectivity check failed.
pub async fn unavailable(
    State(state): State<Arc<StoreUnavailable>>,
    uri: Uri,
) -> axum::response::Response {
    let path = uri.path();
    if path == "/" || path.starts_with("/ui") {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Html(ui::views::unavailable_page(&state.message())),
        )
            .into_response();
    }
    errors::json_error(StatusCode::SERVICE_UNAVAILABLE, "store_unavailable", state.message())
}
