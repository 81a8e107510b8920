//! Server-rendered HTML tabs: products, movements, balances.
//!
//! Plain forms posting back to the same path. Every outcome, including store
//! failures, is rendered inline on the active tab.

use std::sync::Arc;

use axum::{
    extract::{Extension, Form, rejection::FormRejection},
    http::StatusCode,
    response::{Html, IntoResponse},
    routing::get,
    Router,
};
use rust_decimal::Decimal;
use serde::Deserialize;

use stockledger_infra::service::RECENT_MOVEMENTS;
use stockledger_infra::{InventoryError, InventoryService, RecordMovement, RegisterProduct};

use crate::app::errors;

pub mod views;

use views::{Flash, Tab};

pub fn router() -> Router {
    Router::new()
        .route("/products", get(products_page).post(create_product))
        .route("/movements", get(movements_page).post(create_movement))
        .route("/balances", get(balances_page))
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProductForm {
    pub sku: String,
    pub name: String,
    pub unit: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MovementForm {
    pub product_id: String,
    pub move_type: String,
    pub qty: String,
    pub note: String,
}

impl Default for MovementForm {
    fn default() -> Self {
        Self {
            product_id: String::new(),
            move_type: "IN".to_string(),
            qty: String::new(),
            note: String::new(),
        }
    }
}

fn error_flash(err: &InventoryError) -> (StatusCode, Flash) {
    let (status, _) = errors::status_of(err);
    (status, Flash::Error(err.to_string()))
}

/// First non-OK status wins.
fn pick_status(current: StatusCode, listing: Option<&InventoryError>) -> StatusCode {
    match listing {
        Some(err) if current == StatusCode::OK => errors::status_of(err).0,
        _ => current,
    }
}

// -------------------------
// Products
// -------------------------

pub async fn products_page(
    Extension(services): Extension<Arc<InventoryService>>,
) -> axum::response::Response {
    render_products(&services, StatusCode::OK, None, &ProductForm::default()).await
}

pub async fn create_product(
    Extension(services): Extension<Arc<InventoryService>>,
    form: Result<Form<ProductForm>, FormRejection>,
) -> axum::response::Response {
    let form = match form {
        Ok(Form(f)) => f,
        Err(e) => {
            let flash = Flash::Error(e.to_string());
            let form = ProductForm::default();
            return render_products(&services, StatusCode::BAD_REQUEST, Some(flash), &form).await;
        }
    };

    let req = RegisterProduct {
        sku: form.sku.clone(),
        name: form.name.clone(),
        unit: Some(form.unit.clone()),
    };

    match services.register_product(req).await {
        Ok(product) => {
            let flash = Flash::Success(format!(
                "Registered {} ({}), unit {}.",
                product.name, product.sku, product.unit
            ));
            render_products(&services, StatusCode::OK, Some(flash), &ProductForm::default()).await
        }
        Err(e) => {
            let (status, flash) = error_flash(&e);
            render_products(&services, status, Some(flash), &form).await
        }
    }
}

async fn render_products(
    services: &InventoryService,
    status: StatusCode,
    flash: Option<Flash>,
    form: &ProductForm,
) -> axum::response::Response {
    let products = services.list_products().await;
    let status = pick_status(status, products.as_ref().err());

    let body = views::products_body(form, &products);
    (status, Html(views::page(Tab::Products, flash.as_ref(), &body))).into_response()
}

// -------------------------
// Movements
// -------------------------

pub async fn movements_page(
    Extension(services): Extension<Arc<InventoryService>>,
) -> axum::response::Response {
    render_movements(&services, StatusCode::OK, None, &MovementForm::default()).await
}

pub async fn create_movement(
    Extension(services): Extension<Arc<InventoryService>>,
    form: Result<Form<MovementForm>, FormRejection>,
) -> axum::response::Response {
    let form = match form {
        Ok(Form(f)) => f,
        Err(e) => {
            let flash = Flash::Error(e.to_string());
            let form = MovementForm::default();
            return render_movements(&services, StatusCode::BAD_REQUEST, Some(flash), &form).await;
        }
    };

    let qty = match form.qty.trim() {
        "" => Err("qty is required".to_string()),
        raw => raw
            .parse::<Decimal>()
            .map_err(|_| format!("qty must be a decimal number such as 2.50, got {raw:?}")),
    };
    let qty = match qty {
        Ok(q) => q,
        Err(msg) => {
            let flash = Some(Flash::Error(msg));
            return render_movements(&services, StatusCode::BAD_REQUEST, flash, &form).await;
        }
    };

    let req = RecordMovement {
        product_id: form.product_id.clone(),
        move_type: form.move_type.clone(),
        qty,
        note: Some(form.note.clone()),
    };

    match services.record_movement(req).await {
        Ok(movement) => {
            let flash =
                Flash::Success(format!("Recorded {} of {}.", movement.move_type, movement.qty));
            // Keep product and type selected for the next entry.
            let next = MovementForm {
                product_id: form.product_id,
                move_type: form.move_type,
                ..MovementForm::default()
            };
            render_movements(&services, StatusCode::OK, Some(flash), &next).await
        }
        Err(e) => {
            let (status, flash) = error_flash(&e);
            render_movements(&services, status, Some(flash), &form).await
        }
    }
}

async fn render_movements(
    services: &InventoryService,
    status: StatusCode,
    flash: Option<Flash>,
    form: &MovementForm,
) -> axum::response::Response {
    let products = services.list_products().await;
    let moves = services.recent_movements(RECENT_MOVEMENTS).await;
    let status = pick_status(status, products.as_ref().err());
    let status = pick_status(status, moves.as_ref().err());

    let body = views::movements_body(form, &products, &moves);
    (status, Html(views::page(Tab::Movements, flash.as_ref(), &body))).into_response()
}

// -------------------------
// Balances
// -------------------------

pub async fn balances_page(
    Extension(services): Extension<Arc<InventoryService>>,
) -> axum::response::Response {
    let rows = services.list_balances().await;
    let status = pick_status(StatusCode::OK, rows.as_ref().err());

    let body = views::balances_body(&rows);
    (status, Html(views::page(Tab::Balances, None, &body))).into_response()
}
