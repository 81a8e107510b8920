use axum::Router;

pub mod balances;
pub mod movements;
pub mod products;
pub mod system;

/// Router for the JSON API.
pub fn router() -> Router {
    Router::new()
        .nest("/products", products::router())
        .nest("/movements", movements::router())
        .nest("/balances", balances::router())
}
