//! Inventory store abstraction and its backends.
//!
//! The store owns durable records, SKU uniqueness, referential integrity, and
//! the `stock_balance` aggregate. Every backend records movements with an
//! atomic check-and-insert so concurrent `OUT` movements cannot jointly drive a
//! balance negative.

use std::sync::Arc;

use rust_decimal::Decimal;
use thiserror::Error;

use stockledger_core::ProductId;
use stockledger_inventory::{BalanceRow, Movement, NewMovement, NewProduct, Product, Sku};

use crate::config::{BackendConfig, StoreConfig};

pub mod memory;
pub mod postgres;
pub mod rest;

pub use memory::InMemoryStore;
pub use postgres::PostgresStore;
pub use rest::RestStore;

/// Handle shared by all request handlers. Built once at startup.
pub type SharedStore = Arc<dyn InventoryStore>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Unique violation on `products.sku`.
    #[error("a product with sku {0:?} already exists")]
    DuplicateSku(String),

    /// Foreign-key violation: the referenced product does not exist.
    #[error("product {0} does not exist")]
    UnknownProduct(ProductId),

    /// The atomic outbound check failed inside the store.
    #[error("insufficient stock: available {available}")]
    InsufficientStock { available: Decimal },

    /// The `stock_balance` view is missing or unreadable.
    #[error("balance view unavailable: {0}")]
    ViewUnavailable(String),

    /// A returned row had missing or mistyped fields.
    #[error("malformed row: {0}")]
    MalformedRow(String),

    /// Transport, timeout, or permission failure.
    #[error("store unreachable: {0}")]
    Connectivity(String),

    /// The backend cannot be built from the given settings. Retrying will
    /// not help.
    #[error("invalid store configuration: {0}")]
    Configuration(String),

    /// Any other error reported by the store.
    #[error("store rejected request: {0}")]
    Rejected(String),
}

impl StoreError {
    /// Fill in the SKU of a duplicate reported without context.
    pub(crate) fn for_sku(self, sku: &Sku) -> Self {
        match self {
            StoreError::DuplicateSku(_) => StoreError::DuplicateSku(sku.to_string()),
            other => other,
        }
    }

    /// Fill in the product of a foreign-key violation reported without context.
    pub(crate) fn for_product(self, product_id: ProductId) -> Self {
        match self {
            StoreError::UnknownProduct(_) => StoreError::UnknownProduct(product_id),
            other => other,
        }
    }
}

/// Operations the application needs from the persistence layer.
#[async_trait::async_trait]
pub trait InventoryStore: Send + Sync {
    /// Short backend name for logs.
    fn backend(&self) -> &'static str;

    /// Cheap round-trip used by the startup connectivity check.
    async fn ping(&self) -> Result<(), StoreError>;

    async fn insert_product(&self, product: &NewProduct) -> Result<Product, StoreError>;

    /// All products, newest first.
    async fn list_products(&self) -> Result<Vec<Product>, StoreError>;

    /// Current balance of one product, read from the balance view.
    async fn product_balance(&self, product_id: ProductId) -> Result<Decimal, StoreError>;

    /// Append one movement. `OUT` movements are re-checked against the balance
    /// in the same atomic unit as the insert.
    async fn record_move(&self, movement: &NewMovement) -> Result<Movement, StoreError>;

    /// Most recent movements, newest first.
    async fn recent_moves(&self, limit: usize) -> Result<Vec<Movement>, StoreError>;

    /// The balance view, ordered by product name ascending.
    async fn list_balances(&self) -> Result<Vec<BalanceRow>, StoreError>;
}

/// Build the configured backend.
///
/// Does not verify connectivity; callers run [`InventoryStore::ping`] for that.
pub async fn connect(config: &StoreConfig) -> Result<SharedStore, StoreError> {
    let store: SharedStore = match &config.backend {
        BackendConfig::Rest { url, key } => Arc::new(RestStore::new(url, key, config.timeout)?),
        BackendConfig::Postgres {
            database_url,
            run_migrations,
        } => {
            let store = PostgresStore::connect_lazy(database_url, config.timeout)?;
            if *run_migrations {
                store.migrate().await?;
            }
            Arc::new(store)
        }
        BackendConfig::Memory => Arc::new(InMemoryStore::new()),
    };

    tracing::info!(backend = store.backend(), "inventory store configured");
    Ok(store)
}
