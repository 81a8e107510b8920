//! Inventory domain module.
//!
//! This crate contains business rules for products, stock movements and
//! balances, implemented purely as deterministic domain logic (no IO or
//! storage).

pub mod balance;
pub mod movement;
pub mod product;

pub use balance::{BalanceRow, InsufficientStock, balance_of, ensure_can_record, signed_qty};
pub use movement::{MoveType, Movement, NewMovement, Quantity};
pub use product::{DEFAULT_UNIT, NewProduct, Product, Sku};
