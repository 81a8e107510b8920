use core::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use stockledger_core::{DomainError, DomainResult, Entity, MovementId, ProductId};

/// Kind of stock movement.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MoveType {
    /// Inbound: goods received.
    #[serde(rename = "IN")]
    In,
    /// Outbound: goods issued. Must not drive the balance negative.
    #[serde(rename = "OUT")]
    Out,
    /// Adjustment: correction outside the normal in/out flow. Additive.
    #[serde(rename = "ADJ")]
    Adj,
}

impl MoveType {
    pub const ALL: [MoveType; 3] = [MoveType::In, MoveType::Out, MoveType::Adj];

    pub fn as_str(self) -> &'static str {
        match self {
            MoveType::In => "IN",
            MoveType::Out => "OUT",
            MoveType::Adj => "ADJ",
        }
    }

    /// Whether recording this movement requires enough stock on hand.
    pub fn draws_down(self) -> bool {
        matches!(self, MoveType::Out)
    }
}

impl core::fmt::Display for MoveType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MoveType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "IN" => Ok(MoveType::In),
            "OUT" => Ok(MoveType::Out),
            "ADJ" => Ok(MoveType::Adj),
            _ => Err(DomainError::validation("move_type must be one of: IN, OUT, ADJ")),
        }
    }
}

/// Strictly positive movement quantity with at most two fractional digits.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Quantity(Decimal);

impl Quantity {
    /// Smallest accepted quantity (0.01).
    pub const MIN: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

    /// Exclusive upper bound imposed by the `numeric(12,2)` column.
    pub const LIMIT: Decimal = Decimal::from_parts(1_410_065_408, 2, 0, false, 0);

    pub fn new(value: Decimal) -> DomainResult<Self> {
        if value < Self::MIN {
            return Err(DomainError::validation("quantity must be at least 0.01"));
        }
        if value >= Self::LIMIT {
            return Err(DomainError::validation("quantity is too large"));
        }
        let value = value.normalize();
        if value.scale() > 2 {
            return Err(DomainError::validation(
                "quantity supports at most two decimal places",
            ));
        }
        Ok(Self(value))
    }

    /// Parse form input such as `"4"` or `"2.50"`.
    pub fn parse(raw: &str) -> DomainResult<Self> {
        let value = Decimal::from_str(raw.trim())
            .map_err(|_| DomainError::validation("quantity must be a decimal number"))?;
        Self::new(value)
    }

    pub fn value(self) -> Decimal {
        self.0
    }
}

impl core::fmt::Display for Quantity {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl TryFrom<Decimal> for Quantity {
    type Error = DomainError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Quantity> for Decimal {
    fn from(value: Quantity) -> Self {
        value.0
    }
}

/// A validated movement, ready to be recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewMovement {
    pub product_id: ProductId,
    pub move_type: MoveType,
    pub qty: Quantity,
    pub note: Option<String>,
}

impl NewMovement {
    /// Build a movement; a blank `note` is stored as `None`.
    pub fn new(
        product_id: ProductId,
        move_type: MoveType,
        qty: Quantity,
        note: Option<&str>,
    ) -> Self {
        let note = note
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string);

        Self {
            product_id,
            move_type,
            qty,
            note,
        }
    }
}

/// A recorded movement, as returned by the store. Never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Movement {
    pub id: MovementId,
    pub product_id: ProductId,
    pub move_type: MoveType,
    pub qty: Quantity,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Entity for Movement {
    type Id = MovementId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
