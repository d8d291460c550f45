use std::env;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::db::PoolOptions;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{key} has an invalid value '{value}'")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub pool: PoolOptions,
}

impl Settings {
    /// Reads settings from the process environment (after `.env` loading).
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = PoolOptions::default();

        let database_url = lookup("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;
        let host = lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = parse_or(&lookup, "PORT", 8080)?;
        let max_size = parse_or(&lookup, "DB_POOL_SIZE", defaults.max_size)?;
        let connection_timeout = parse_or(
            &lookup,
            "DB_CONNECTION_TIMEOUT_SECS",
            defaults.connection_timeout.as_secs(),
        )?;
        let statement_timeout = parse_or(
            &lookup,
            "DB_STATEMENT_TIMEOUT_MS",
            defaults.statement_timeout.as_millis() as u64,
        )?;

        if max_size == 0 {
            return Err(ConfigError::Invalid {
                key: "DB_POOL_SIZE",
                value: "0".to_string(),
            });
        }

        Ok(Settings {
            database_url,
            host,
            port,
            pool: PoolOptions {
                max_size,
                connection_timeout: Duration::from_secs(connection_timeout),
                statement_timeout: Duration::from_millis(statement_timeout),
            },
        })
    }
}

fn parse_or<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(key) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
    }
}
