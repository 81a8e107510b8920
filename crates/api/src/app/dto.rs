use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use stockledger_infra::{RecordMovement, RegisterProduct};

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct CreateProductRequest {
    pub sku: String,
    pub name: String,
    #[serde(default)]
    pub unit: Option<String>,
}

impl From<CreateProductRequest> for RegisterProduct {
    fn from(body: CreateProductRequest) -> Self {
        RegisterProduct {
            sku: body.sku,
            name: body.name,
            unit: body.unit,
        }
    }
}

/// `qty` accepts a JSON number or a decimal string.
#[derive(Debug, Deserialize)]
pub struct CreateMovementRequest {
    pub product_id: String,
    pub move_type: String,
    pub qty: Decimal,
    #[serde(default)]
    pub note: Option<String>,
}

impl From<CreateMovementRequest> for RecordMovement {
    fn from(body: CreateMovementRequest) -> Self {
        RecordMovement {
            product_id: body.product_id,
            move_type: body.move_type,
            qty: body.qty,
            note: body.note,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ListMovementsQuery {
    pub limit: Option<usize>,
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct ItemsResponse<T> {
    pub items: Vec<T>,
}

impl<T> From<Vec<T>> for ItemsResponse<T> {
    fn from(items: Vec<T>) -> Self {
        Self { items }
    }
}
