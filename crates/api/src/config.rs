//! Process configuration: bind address, logging, and the store.

use std::net::{IpAddr, SocketAddr};

use stockledger_infra::{ConfigError, StoreConfig};

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub addr: SocketAddr,
    pub store: StoreConfig,
}

impl AppConfig {
    /// Load from the process environment. `HOST`/`PORT` default to
    /// `0.0.0.0:8080`; store variables are described on [`StoreConfig::from_env`].
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let raw_host = get("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string());
        let host: IpAddr = raw_host.parse().map_err(|_| ConfigError::Invalid {
            var: "HOST",
            reason: format!("expected an IP address, got {raw_host:?}"),
        })?;
        let port = match get("PORT") {
            None => DEFAULT_PORT,
            Some(raw) => raw.parse::<u16>().map_err(|_| ConfigError::Invalid {
                var: "PORT",
                reason: format!("expected a port number, got {raw:?}"),
            })?,
        };

        Ok(Self {
            addr: SocketAddr::new(host, port),
            store: StoreConfig::from_lookup(&lookup)?,
        })
    }
}
