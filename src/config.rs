//! Configuration management for the phonebook server.
//!
//! This module handles loading and validating configuration from environment variables.
//! It avoids polluting stdout (which MCP uses for communication) by loading
//! the .env file through `dotenvy`, which never prints.

use crate::error::{ConfigError, ConfigResult};
use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Which contact store the server runs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StorageBackend {
    #[default]
    Sqlite,
    Memory,
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sqlite" => Ok(StorageBackend::Sqlite),
            "memory" => Ok(StorageBackend::Memory),
            other => Err(format!("Must be 'sqlite' or 'memory', got: {}", other)),
        }
    }
}

impl fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageBackend::Sqlite => f.write_str("sqlite"),
            StorageBackend::Memory => f.write_str("memory"),
        }
    }
}

/// Configuration for the phonebook server.
#[derive(Debug, Clone)]
pub struct Config {
    /// Contact store (default: sqlite)
    pub storage: StorageBackend,

    /// SQLite connection URL
    pub database_url: String,

    /// Connection pool size (default: 5)
    pub db_max_connections: u32,

    /// List limit when the caller gives none (default: 20)
    pub default_page_size: usize,

    /// Hard cap on the list limit (default: 100)
    pub max_page_size: usize,

    /// Search limit when the caller gives none (default: 20)
    pub default_search_limit: usize,

    /// Hard cap on the search limit (default: 50)
    pub max_search_limit: usize,

    /// Per-operation deadline in seconds (default: 10)
    pub operation_timeout_secs: u64,

    /// Log level (default: "info")
    pub log_level: String,
}

/// The knobs the contact service needs, handed to it at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceConfig {
    pub default_page_size: usize,
    pub max_page_size: usize,
    pub default_search_limit: usize,
    pub max_search_limit: usize,
    pub operation_timeout: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Config::default().service_config()
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// All variables are optional:
    /// - `PHONEBOOK_STORAGE`: `sqlite` or `memory` (default: sqlite)
    /// - `DATABASE_URL`: SQLite URL (default: `sqlite:phonebook.db?mode=rwc`)
    /// - `DB_MAX_CONNECTIONS`: pool size (default: 5)
    /// - `DEFAULT_PAGE_SIZE` / `MAX_PAGE_SIZE`: list limits (default: 20 / 100)
    /// - `DEFAULT_SEARCH_LIMIT` / `MAX_SEARCH_LIMIT`: search limits (default: 20 / 50)
    /// - `OPERATION_TIMEOUT_SECS`: per-operation deadline (default: 10)
    /// - `LOG_LEVEL`: Logging level (default: "info")
    pub fn from_env() -> ConfigResult<Self> {
        // Try to load .env file if it exists (but don't fail if it doesn't)
        let _ = dotenvy::dotenv();

        let defaults = Config::default();

        let storage = match env::var("PHONEBOOK_STORAGE") {
            Ok(val) => val.parse().map_err(|reason| ConfigError::InvalidValue {
                var: "PHONEBOOK_STORAGE".to_string(),
                reason,
            })?,
            Err(_) => defaults.storage,
        };

        let database_url = env::var("DATABASE_URL").unwrap_or(defaults.database_url);
        if database_url.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                var: "DATABASE_URL".to_string(),
                reason: "Cannot be empty".to_string(),
            });
        }

        let db_max_connections =
            Self::parse_env_u32("DB_MAX_CONNECTIONS", defaults.db_max_connections)?;
        Self::require_positive("DB_MAX_CONNECTIONS", db_max_connections as u64)?;

        let default_page_size =
            Self::parse_env_usize("DEFAULT_PAGE_SIZE", defaults.default_page_size)?;
        let max_page_size = Self::parse_env_usize("MAX_PAGE_SIZE", defaults.max_page_size)?;
        let default_search_limit =
            Self::parse_env_usize("DEFAULT_SEARCH_LIMIT", defaults.default_search_limit)?;
        let max_search_limit =
            Self::parse_env_usize("MAX_SEARCH_LIMIT", defaults.max_search_limit)?;

        Self::require_positive("DEFAULT_PAGE_SIZE", default_page_size as u64)?;
        Self::require_positive("MAX_PAGE_SIZE", max_page_size as u64)?;
        Self::require_positive("DEFAULT_SEARCH_LIMIT", default_search_limit as u64)?;
        Self::require_positive("MAX_SEARCH_LIMIT", max_search_limit as u64)?;

        if default_page_size > max_page_size {
            return Err(ConfigError::InvalidValue {
                var: "DEFAULT_PAGE_SIZE".to_string(),
                reason: format!("Must not exceed MAX_PAGE_SIZE ({})", max_page_size),
            });
        }
        if default_search_limit > max_search_limit {
            return Err(ConfigError::InvalidValue {
                var: "DEFAULT_SEARCH_LIMIT".to_string(),
                reason: format!("Must not exceed MAX_SEARCH_LIMIT ({})", max_search_limit),
            });
        }

        let operation_timeout_secs =
            Self::parse_env_u64("OPERATION_TIMEOUT_SECS", defaults.operation_timeout_secs)?;
        Self::require_positive("OPERATION_TIMEOUT_SECS", operation_timeout_secs)?;

        let log_level = env::var("LOG_LEVEL").unwrap_or(defaults.log_level);

        Ok(Config {
            storage,
            database_url,
            db_max_connections,
            default_page_size,
            max_page_size,
            default_search_limit,
            max_search_limit,
            operation_timeout_secs,
            log_level,
        })
    }

    /// The subset of settings the contact service consumes.
    pub fn service_config(&self) -> ServiceConfig {
        ServiceConfig {
            default_page_size: self.default_page_size,
            max_page_size: self.max_page_size,
            default_search_limit: self.default_search_limit,
            max_search_limit: self.max_search_limit,
            operation_timeout: Duration::from_secs(self.operation_timeout_secs),
        }
    }

    fn require_positive(var_name: &str, value: u64) -> ConfigResult<()> {
        if value == 0 {
            return Err(ConfigError::InvalidValue {
                var: var_name.to_string(),
                reason: "Must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Parse an environment variable as u64 with a default value.
    fn parse_env_u64(var_name: &str, default: u64) -> ConfigResult<u64> {
        match env::var(var_name) {
            Ok(val) => val.parse::<u64>().map_err(|_| ConfigError::InvalidValue {
                var: var_name.to_string(),
                reason: format!("Must be a positive number, got: {}", val),
            }),
            Err(_) => Ok(default),
        }
    }

    /// Parse an environment variable as usize with a default value.
    fn parse_env_usize(var_name: &str, default: usize) -> ConfigResult<usize> {
        match env::var(var_name) {
            Ok(val) => val.parse::<usize>().map_err(|_| ConfigError::InvalidValue {
                var: var_name.to_string(),
                reason: format!("Must be a positive number, got: {}", val),
            }),
            Err(_) => Ok(default),
        }
    }

    /// Parse an environment variable as u32 with a default value.
    fn parse_env_u32(var_name: &str, default: u32) -> ConfigResult<u32> {
        match env::var(var_name) {
            Ok(val) => val.parse::<u32>().map_err(|_| ConfigError::InvalidValue {
                var: var_name.to_string(),
                reason: format!("Must be a positive number, got: {}", val),
            }),
            Err(_) => Ok(default),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            storage: StorageBackend::Sqlite,
            database_url: "sqlite:phonebook.db?mode=rwc".to_string(),
            db_max_connections: 5,
            default_page_size: 20,
            max_page_size: 100,
            default_search_limit: 20,
            max_search_limit: 50,
            operation_timeout_secs: 10,
            log_level: "info".to_string(),
        }
    }
}
