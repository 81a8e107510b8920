//! Stock balance rules.
//!
//! The balance of a product is the signed sum of its movement quantities:
//! `IN` and `ADJ` add, `OUT` subtracts. The store's `stock_balance` view uses the
//! same convention; the functions here are what the in-process backends and the
//! outbound check rely on.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use stockledger_core::ProductId;

use crate::movement::{MoveType, Quantity};

/// One row of the derived balance view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceRow {
    pub product_id: ProductId,
    pub sku: String,
    pub name: String,
    pub unit: String,
    pub balance: Decimal,
}

/// Business-rule rejection: an outbound movement exceeds the stock on hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("insufficient stock: available {available}, requested {requested}")]
pub struct InsufficientStock {
    pub available: Decimal,
    pub requested: Decimal,
}

/// Contribution of a single movement to the balance.
pub fn signed_qty(move_type: MoveType, qty: Quantity) -> Decimal {
    match move_type {
        MoveType::In | MoveType::Adj => qty.value(),
        MoveType::Out => -qty.value(),
    }
}

/// Fold movements into a balance, normalized so `4.00` reads as `4`.
pub fn balance_of(moves: impl IntoIterator<Item = (MoveType, Quantity)>) -> Decimal {
    moves
        .into_iter()
        .fold(Decimal::ZERO, |acc, (t, q)| acc + signed_qty(t, q))
        .normalize()
}

/// Decide whether a movement may be recorded against `available` stock.
///
/// Only `OUT` has a precondition: it must not take the balance below zero.
pub fn ensure_can_record(
    move_type: MoveType,
    qty: Quantity,
    available: Decimal,
) -> Result<(), InsufficientStock> {
    if move_type.draws_down() && available < qty.value() {
        return Err(InsufficientStock {
            available: available.normalize(),
            requested: qty.value(),
        });
    }
    Ok(())
}
