//! Configuration module
//!
//! Loads configuration from environment variables.

use std::env;
use std::str::FromStr;

/// Minimum JWT secret length accepted in production
const MIN_PRODUCTION_SECRET_LEN: usize = 32;

/// Which storage collaborator backs the server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres,
    Memory,
}

impl FromStr for StorageBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "postgres" => Ok(Self::Postgres),
            "memory" => Ok(Self::Memory),
            _ => Err(ConfigError::InvalidValue("STORAGE_BACKEND")),
        }
    }
}

/// Application configuration
#[derive(Clone)]
pub struct Config {
    pub storage_backend: StorageBackend,

    /// Database connection URL, required for the postgres backend
    pub database_url: Option<String>,

    /// Maximum database connections in pool
    pub database_max_connections: u32,

    pub host: String,
    pub port: u16,

    /// Environment (development, production)
    pub environment: String,

    /// HMAC secret used to sign bearer tokens
    pub jwt_secret: String,

    /// Locale used for messages when the caller sends none
    pub default_locale: String,

    /// Upload limit for beneficiary images, in bytes
    pub max_image_bytes: usize,

    /// Credential seeded into the memory backend
    pub admin_login: Option<String>,
    pub admin_password: Option<String>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from any key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let storage_backend = lookup("STORAGE_BACKEND")
            .unwrap_or_else(|| "postgres".to_string())
            .parse()?;

        let database_url = lookup("DATABASE_URL");
        if storage_backend == StorageBackend::Postgres && database_url.is_none() {
            return Err(ConfigError::MissingEnv("DATABASE_URL"));
        }

        let database_max_connections = lookup("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|| "10".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidValue("DATABASE_MAX_CONNECTIONS"))?;

        let host = lookup("HOST").unwrap_or_else(|| "127.0.0.1".to_string());

        let port = lookup("PORT")
            .unwrap_or_else(|| "3000".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidValue("PORT"))?;

        let environment = lookup("ENVIRONMENT").unwrap_or_else(|| "development".to_string());

        let jwt_secret = lookup("JWT_SECRET")
            .filter(|secret| !secret.is_empty())
            .ok_or(ConfigError::MissingEnv("JWT_SECRET"))?;

        let default_locale = lookup("DEFAULT_LOCALE").unwrap_or_else(|| "pt-BR".to_string());

        let max_image_bytes = lookup("MAX_IMAGE_BYTES")
            .unwrap_or_else(|| "5242880".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidValue("MAX_IMAGE_BYTES"))?;

        let config = Self {
            storage_backend,
            database_url,
            database_max_connections,
            host,
            port,
            environment,
            jwt_secret,
            default_locale,
            max_image_bytes,
            admin_login: lookup("ADMIN_LOGIN"),
            admin_password: lookup("ADMIN_PASSWORD"),
        };

        if config.is_production() && config.jwt_secret.len() < MIN_PRODUCTION_SECRET_LEN {
            return Err(ConfigError::InvalidValue("JWT_SECRET"));
        }

        Ok(config)
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("storage_backend", &self.storage_backend)
            .field("database_max_connections", &self.database_max_connections)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("environment", &self.environment)
            .field("default_locale", &self.default_locale)
            .field("max_image_bytes", &self.max_image_bytes)
            .field("admin_login", &self.admin_login)
            .finish_non_exhaustive()
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnv(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[("DATABASE_URL", "postgres://localhost/loans"), ("JWT_SECRET", "dev")])
            .unwrap();

        assert_eq!(config.storage_backend, StorageBackend::Postgres);
        assert_eq!(config.port, 3000);
        assert_eq!(config.database_max_connections, 10);
        assert_eq!(config.default_locale, "pt-BR");
        assert_eq!(config.max_image_bytes, 5 * 1024 * 1024);
        assert!(!config.is_production());
    }

    #[test]
    fn test_postgres_requires_database_url() {
        let err = load(&[("JWT_SECRET", "dev")]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnv("DATABASE_URL")));

        let config = load(&[("STORAGE_BACKEND", "memory"), ("JWT_SECRET", "dev")]).unwrap();
        assert_eq!(config.storage_backend, StorageBackend::Memory);
    }

    #[test]
    fn test_secret_required() {
        let err = load(&[("STORAGE_BACKEND", "memory")]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnv("JWT_SECRET")));
    }

    #[test]
    fn test_production_requires_long_secret() {
        let err = load(&[
            ("STORAGE_BACKEND", "memory"),
            ("ENVIRONMENT", "production"),
            ("JWT_SECRET", "short"),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue("JWT_SECRET")));

        let secret = "x".repeat(32);
        assert!(load(&[
            ("STORAGE_BACKEND", "memory"),
            ("ENVIRONMENT", "production"),
            ("JWT_SECRET", secret.as_str()),
        ])
        .is_ok());
    }

    #[test]
    fn test_invalid_values() {
        let err = load(&[("STORAGE_BACKEND", "sqlite"), ("JWT_SECRET", "dev")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue("STORAGE_BACKEND")));

        let err = load(&[("STORAGE_BACKEND", "memory"), ("JWT_SECRET", "dev"), ("PORT", "http")])
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue("PORT")));
    }
}
