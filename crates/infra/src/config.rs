//! Store configuration loading.
//!
//! Values come from the process environment (populated from `.env` by the
//! binary). Every lookup goes through a closure so tests can supply a map.

use std::time::Duration;

use thiserror::Error;

pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required configuration: {0} (set it in the environment or in .env)")]
    Missing(&'static str),

    #[error("invalid value for {var}: {reason}")]
    Invalid { var: &'static str, reason: String },
}

/// Which store the application talks to.
#[derive(Clone, PartialEq, Eq)]
pub enum BackendConfig {
    /// Hosted service exposing a PostgREST-compatible API.
    Rest { url: String, key: String },
    /// Direct Postgres connection.
    Postgres {
        database_url: String,
        run_migrations: bool,
    },
    /// Process-local store (dev/test only; data is lost on exit).
    Memory,
}

// Secrets stay out of logs.
impl core::fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            BackendConfig::Rest { url, .. } => f
                .debug_struct("Rest")
                .field("url", url)
                .field("key", &"<redacted>")
                .finish(),
            BackendConfig::Postgres { run_migrations, .. } => f
                .debug_struct("Postgres")
                .field("database_url", &"<redacted>")
                .field("run_migrations", run_migrations)
                .finish(),
            BackendConfig::Memory => f.write_str("Memory"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub backend: BackendConfig,
    /// Per-request timeout (REST) / pool acquire timeout (Postgres).
    pub timeout: Duration,
}

impl StoreConfig {
    pub fn memory() -> Self {
        Self {
            backend: BackendConfig::Memory,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Load configuration from environment variables.
    ///
    /// | Env Var                         | Default  |
    /// |---------------------------------|----------|
    /// | `STORE_BACKEND`                 | `rest`   |
    /// | `STORE_URL` / `SUPABASE_URL`    | required for `rest` |
    /// | `STORE_KEY` / `SUPABASE_KEY`    | required for `rest` |
    /// | `DATABASE_URL`                  | required for `postgres` |
    /// | `STORE_RUN_MIGRATIONS`          | `false`  |
    /// | `STORE_TIMEOUT_SECS`            | `10`     |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Blank values count as unset.
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let timeout_secs = match get("STORE_TIMEOUT_SECS") {
            None => DEFAULT_TIMEOUT_SECS,
            Some(raw) => match raw.parse::<u64>() {
                Ok(0) | Err(_) => {
                    return Err(ConfigError::Invalid {
                        var: "STORE_TIMEOUT_SECS",
                        reason: format!("expected a positive number of seconds, got {raw:?}"),
                    });
                }
                Ok(v) => v,
            },
        };

        let backend = match get("STORE_BACKEND")
            .unwrap_or_else(|| "rest".to_string())
            .to_ascii_lowercase()
            .as_str()
        {
            "rest" => {
                let url = get("STORE_URL")
                    .or_else(|| get("SUPABASE_URL"))
                    .ok_or(ConfigError::Missing("STORE_URL"))?;
                let key = get("STORE_KEY")
                    .or_else(|| get("SUPABASE_KEY"))
                    .ok_or(ConfigError::Missing("STORE_KEY"))?;

                if !(url.starts_with("http://") || url.starts_with("https://")) {
                    return Err(ConfigError::Invalid {
                        var: "STORE_URL",
                        reason: "must start with http:// or https://".to_string(),
                    });
                }

                BackendConfig::Rest {
                    url: url.trim_end_matches('/').to_string(),
                    key,
                }
            }
            "postgres" => {
                let database_url = get("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;
                let run_migrations = match get("STORE_RUN_MIGRATIONS") {
                    None => false,
                    Some(raw) => raw.parse::<bool>().map_err(|_| ConfigError::Invalid {
                        var: "STORE_RUN_MIGRATIONS",
                        reason: format!("expected true or false, got {raw:?}"),
                    })?,
                };
                BackendConfig::Postgres {
                    database_url,
                    run_migrations,
                }
            }
            "memory" => BackendConfig::Memory,
            other => {
                return Err(ConfigError::Invalid {
                    var: "STORE_BACKEND",
                    reason: format!("expected rest, postgres, or memory, got {other:?}"),
                });
            }
        };

        Ok(Self {
            backend,
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}
