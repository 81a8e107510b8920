use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockledger_core::{DomainError, DomainResult, Entity, ProductId};

/// Unit label used when the caller leaves the unit blank.
pub const DEFAULT_UNIT: &str = "pieces";

/// Stock keeping unit: a human-assigned product code, unique across products.
///
/// Always stored trimmed; uniqueness is therefore checked on the trimmed form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Sku(String);

impl Sku {
    pub fn parse(raw: &str) -> DomainResult<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(DomainError::validation("sku cannot be empty"));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for Sku {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Sku {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Sku> for String {
    fn from(value: Sku) -> Self {
        value.0
    }
}

/// A validated product registration, ready to be inserted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewProduct {
    pub sku: Sku,
    pub name: String,
    pub unit: String,
}

impl NewProduct {
    /// Validate raw form input.
    ///
    /// All fields are trimmed. `sku` and `name` must be non-empty; a blank
    /// `unit` falls back to [`DEFAULT_UNIT`].
    pub fn new(sku: &str, name: &str, unit: &str) -> DomainResult<Self> {
        let sku = Sku::parse(sku)?;

        let name = name.trim();
        if name.is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }

        let unit = match unit.trim() {
            "" => DEFAULT_UNIT,
            u => u,
        };

        Ok(Self {
            sku,
            name: name.to_string(),
            unit: unit.to_string(),
        })
    }
}

/// A registered product, as returned by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub sku: Sku,
    pub name: String,
    pub unit: String,
    pub created_at: DateTime<Utc>,
}

impl Entity for Product {
    type Id = ProductId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
