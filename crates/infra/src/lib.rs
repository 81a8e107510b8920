//! Infrastructure layer: store backends, configuration, and the inventory
//! service that validates requests before they reach the store.

pub mod config;
pub mod service;
pub mod store;

pub use config::{BackendConfig, ConfigError, StoreConfig};
pub use service::{InventoryError, InventoryService, RecordMovement, RegisterProduct};
pub use store::{InventoryStore, SharedStore, StoreError};
