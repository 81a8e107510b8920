//! HTTP application wiring (Axum router + store wiring).
//!
//! - `routes/`: JSON API handlers (one file per area)
//! - `ui/`: server-rendered HTML tabs
//! - `dto.rs`: request/response DTOs
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{response::Redirect, routing::get, Extension, Router};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use stockledger_infra::{InventoryService, SharedStore, StoreConfig, StoreError, store};

pub mod dto;
pub mod errors;
pub mod routes;
pub mod ui;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
///
/// Settings the backend cannot be built from are returned as an error. Any
/// other failure to reach the store yields a router that answers every
/// request with 503.
pub async fn build_app(config: &StoreConfig) -> Result<Router, StoreError> {
    match store::connect(config).await {
        Ok(store) => Ok(build_app_with_store(store).await),
        Err(e @ StoreError::Configuration(_)) => Err(e),
        Err(e) => {
            tracing::error!(error = %e, "failed to connect inventory store");
            Ok(unavailable(e.to_string()))
        }
    }
}

/// Runs the one-time connectivity check, then builds the router.
pub async fn build_app_with_store(store: SharedStore) -> Router {
    let services = Arc::new(InventoryService::new(store));
    let backend = services.store().backend();

    if let Err(e) = services.check_connectivity().await {
        tracing::error!(backend, error = %e, "store connectivity check failed");
        return unavailable(e.to_string());
    }
    tracing::info!(backend, "store connectivity check passed");

    router(services)
}

pub fn router(services: Arc<InventoryService>) -> Router {
    Router::new()
        .route("/health", get(routes::system::health))
        .route("/", get(|| async { Redirect::to("/ui/products") }))
        .merge(routes::router())
        .nest("/ui", ui::router())
        .layer(Extension(services))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
}

fn unavailable(reason: String) -> Router {
    let state = Arc::new(routes::system::StoreUnavailable { reason });
    Router::new()
        .fallback(routes::system::unavailable)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
