//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::collections::HashMap;
use std::net::SocketAddr;

use mole_tracker_core::DEFAULT_USER_ID;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub database_url: String,
    pub db_max_connections: u32,
    pub log_level: Level,
    /// Owner recorded on every new mole.
    pub default_user_id: String,
    /// Origins allowed by CORS. Empty means any origin.
    pub cors_allowed_origins: Vec<String>,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_vars(std::env::vars().collect())
    }

    /// Builds the configuration from an explicit variable map.
    pub fn from_vars(vars: HashMap<String, String>) -> Result<Self, ConfigError> {
        let get = |key: &str| vars.get(key).map(String::as_str).filter(|v| !v.is_empty());

        // --- Load Server and Database Settings ---
        let bind_address_str = get("BIND_ADDRESS").unwrap_or("0.0.0.0:5000");
        let bind_address = bind_address_str.parse::<SocketAddr>().map_err(|e| {
            ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
        })?;

        let database_url = get("DATABASE_URL")
            .ok_or_else(|| ConfigError::MissingVar("DATABASE_URL".to_string()))?
            .to_string();

        let db_max_connections = match get("DB_MAX_CONNECTIONS") {
            Some(raw) => raw
                .parse::<u32>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| {
                    ConfigError::InvalidValue(
                        "DB_MAX_CONNECTIONS".to_string(),
                        format!("'{}' is not a positive integer", raw),
                    )
                })?,
            None => 5,
        };

        let log_level_str = get("RUST_LOG").unwrap_or("INFO");
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Load Domain Settings ---
        let default_user_id = get("DEFAULT_USER_ID")
            .unwrap_or(DEFAULT_USER_ID)
            .to_string();

        let cors_allowed_origins = get("CORS_ALLOWED_ORIGINS")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|origin| !origin.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            bind_address,
            database_url,
            db_max_connections,
            log_level,
            default_user_id,
            cors_allowed_origins,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn defaults_apply_when_only_database_url_is_set() {
        let config = Config::from_vars(vars(&[("DATABASE_URL", "postgres://localhost/moles")])).unwrap();
        assert_eq!(config.bind_address, "0.0.0.0:5000".parse::<SocketAddr>().unwrap());
        assert_eq!(config.db_max_connections, 5);
        assert_eq!(config.log_level, Level::INFO);
        assert_eq!(config.default_user_id, "default-user");
        assert!(config.cors_allowed_origins.is_empty());
    }

    #[test]
    fn missing_database_url_is_reported() {
        let err = Config::from_vars(HashMap::new()).unwrap_err();
        assert!(matches!(err, ConfigError::MissingVar(ref name) if name == "DATABASE_URL"));
    }

    #[test]
    fn overrides_are_parsed() {
        let config = Config::from_vars(vars(&[
            ("DATABASE_URL", "postgres://db/moles"),
            ("BIND_ADDRESS", "127.0.0.1:8080"),
            ("DB_MAX_CONNECTIONS", "12"),
            ("RUST_LOG", "debug"),
            ("DEFAULT_USER_ID", "alice"),
            ("CORS_ALLOWED_ORIGINS", "http://localhost:3000, https://moles.example ,"),
        ]))
        .unwrap();

        assert_eq!(config.bind_address.port(), 8080);
        assert_eq!(config.db_max_connections, 12);
        assert_eq!(config.log_level, Level::DEBUG);
        assert_eq!(config.default_user_id, "alice");
        assert_eq!(
            config.cors_allowed_origins,
            vec!["http://localhost:3000".to_string(), "https://moles.example".to_string()]
        );
    }

    #[test]
    fn invalid_values_are_rejected() {
        for (key, value) in [
            ("BIND_ADDRESS", "not-an-address"),
            ("DB_MAX_CONNECTIONS", "0"),
            ("RUST_LOG", "chatty"),
        ] {
            let err = Config::from_vars(vars(&[("DATABASE_URL", "postgres://db"), (key, value)]))
                .unwrap_err();
            assert!(matches!(err, ConfigError::InvalidValue(ref name, _) if name == key));
        }
    }
}
