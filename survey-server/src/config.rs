use anyhow::{bail, Context, Result};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::reply::Locale;
use crate::state_machine::PostgresConfig;

/// File name of the SQLite database inside `STATE_DIR`.
pub const SQLITE_FILE_NAME: &str = "survey.db";

/// Where confirmed feedback goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageConfig {
    Memory,
    Sqlite { path: PathBuf },
    Postgres(PostgresConfig),
}

impl StorageConfig {
    pub fn backend_name(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Sqlite { .. } => "sqlite",
            Self::Postgres(_) => "postgres",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub locale: Locale,
    pub storage: StorageConfig,
    /// Sessions idle for longer than this are evicted by the server.
    pub session_ttl: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from any variable source. Unset and empty values fall
    /// back to their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port = var("PORT")
            .unwrap_or_else(|| "3000".to_string())
            .parse::<u16>()
            .context("PORT must be a valid number")?;

        let locale = var("SURVEY_LOCALE")
            .unwrap_or_else(|| "en".to_string())
            .parse::<Locale>()
            .map_err(anyhow::Error::msg)
            .context("SURVEY_LOCALE must be 'en' or 'pt-BR'")?;

        let backend = var("STORAGE_BACKEND").unwrap_or_else(|| "sqlite".to_string());
        let storage = match backend.trim().to_ascii_lowercase().as_str() {
            "memory" => StorageConfig::Memory,
            "sqlite" => {
                let state_dir = var("STATE_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from("."));
                StorageConfig::Sqlite {
                    path: state_dir.join(SQLITE_FILE_NAME),
                }
            }
            "postgres" => StorageConfig::Postgres(PostgresConfig {
                host: var("DB_HOST").unwrap_or_else(|| "localhost".to_string()),
                port: var("DB_PORT")
                    .unwrap_or_else(|| "5432".to_string())
                    .parse::<u16>()
                    .context("DB_PORT must be a valid number")?,
                dbname: var("DB_NAME").unwrap_or_else(|| "satisfaction".to_string()),
                user: var("DB_USER").unwrap_or_else(|| "postgres".to_string()),
                password: lookup("DB_PASSWORD").unwrap_or_default(),
            }),
            other => bail!(
                "STORAGE_BACKEND must be 'memory', 'sqlite' or 'postgres', got '{}'",
                other
            ),
        };

        let session_ttl_secs = var("SESSION_TTL_SECS")
            .unwrap_or_else(|| "3600".to_string())
            .parse::<u64>()
            .context("SESSION_TTL_SECS must be a valid number of seconds")?;
        if session_ttl_secs == 0 {
            bail!("SESSION_TTL_SECS must be greater than zero");
        }

        Ok(Config {
            port,
            locale,
            storage,
            session_ttl: Duration::from_secs(session_ttl_secs),
        })
    }
}
