//! Process-wide tracing/logging setup shared by the binaries.

/// Initialize logging using `LOG_FORMAT` and `RUST_LOG`.
///
/// Safe to call multiple times; subsequent calls become no-ops. An
/// unrecognised `LOG_FORMAT` falls back to JSON and is reported once the
/// subscriber is installed.
pub fn init() {
    let raw = std::env::var("LOG_FORMAT").ok();
    match raw.as_deref().map(str::parse::<tracing::LogFormat>) {
        Some(Err(e)) => {
            tracing::init(tracing::LogFormat::Json);
            ::tracing::warn!(error = %e, "falling back to json logs");
        }
        Some(Ok(format)) => tracing::init(format),
        None => tracing::init(tracing::LogFormat::default()),
    }
}

/// Tracing configuration (filters, formatters).
pub mod tracing;

pub use tracing::{LogFormat, UnknownLogFormat};
