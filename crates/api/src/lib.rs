//! HTTP API and server-rendered UI for the inventory ledger.

pub mod app;
pub mod config;

pub use config::AppConfig;
