//! Shared configuration loader module for GifGuess services
//!
//! Environment-driven configuration with typed parsing, validation, and
//! optional `.env` support. Variables use the `GIFGUESS_` prefix.
//!
//! # Example
//!
//! ```no_run
//! use gifguess_core::config::{load_dotenv, ConfigLoader, RedisConfig};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! load_dotenv();
//!
//! let redis_config = RedisConfig::from_env()?;
//! redis_config.validate()?;
//! # Ok(())
//! # }
//! ```

use crate::error::CoreError;
use std::time::Duration;
use url::Url;

/// Configuration loader trait
///
/// Standardized loading and validation from environment variables.
pub trait ConfigLoader: Sized {
    /// Load configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns a `ConfigurationError` if a required variable is missing or a
    /// value cannot be parsed.
    fn from_env() -> Result<Self, CoreError>;

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns a `ConfigurationError` if any validation check fails.
    fn validate(&self) -> Result<(), CoreError>;
}

/// Redis configuration for the shared result/item cache
///
/// # Environment Variables
///
/// - `GIFGUESS_REDIS_URL` (required, falls back to `REDIS_URL`): Redis connection URL
/// - `GIFGUESS_REDIS_CONNECTION_TIMEOUT` (optional): Connection timeout in seconds (default: 10)
/// - `GIFGUESS_REDIS_RESPONSE_TIMEOUT` (optional): Response timeout in seconds (default: 5)
#[derive(Debug, Clone)]
pub struct RedisConfig {
    /// Redis connection URL
    pub url: String,
    /// Connection timeout duration
    pub connection_timeout: Duration,
    /// Response timeout duration
    pub response_timeout: Duration,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: "redis://localhost:6379/0".to_string(),
            connection_timeout: Duration::from_secs(10),
            response_timeout: Duration::from_secs(5),
        }
    }
}

impl RedisConfig {
    /// Build from an arbitrary variable source, e.g. a map in tests
    pub fn from_lookup<F>(lookup: F) -> Result<Self, CoreError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let url = lookup("GIFGUESS_REDIS_URL")
            .or_else(|| lookup("REDIS_URL"))
            .ok_or_else(|| {
                CoreError::config(
                    "REDIS_URL or GIFGUESS_REDIS_URL must be set",
                    "GIFGUESS_REDIS_URL",
                )
            })?;

        let connection_timeout_secs = parse_value(
            "GIFGUESS_REDIS_CONNECTION_TIMEOUT",
            lookup("GIFGUESS_REDIS_CONNECTION_TIMEOUT"),
            10u64,
        )?;
        let response_timeout_secs = parse_value(
            "GIFGUESS_REDIS_RESPONSE_TIMEOUT",
            lookup("GIFGUESS_REDIS_RESPONSE_TIMEOUT"),
            5u64,
        )?;

        Ok(Self {
            url,
            connection_timeout: Duration::from_secs(connection_timeout_secs),
            response_timeout: Duration::from_secs(response_timeout_secs),
        })
    }
}

impl ConfigLoader for RedisConfig {
    fn from_env() -> Result<Self, CoreError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn validate(&self) -> Result<(), CoreError> {
        let parsed = Url::parse(&self.url).map_err(|e| {
            CoreError::config(format!("Invalid REDIS_URL: {}", e), "GIFGUESS_REDIS_URL")
        })?;

        if !matches!(parsed.scheme(), "redis" | "rediss") {
            return Err(CoreError::config(
                format!("REDIS_URL must use redis:// or rediss://, got {}", parsed.scheme()),
                "GIFGUESS_REDIS_URL",
            ));
        }

        if self.connection_timeout.is_zero() {
            return Err(CoreError::config(
                "connection_timeout must be greater than 0 seconds",
                "GIFGUESS_REDIS_CONNECTION_TIMEOUT",
            ));
        }

        if self.response_timeout.is_zero() {
            return Err(CoreError::config(
                "response_timeout must be greater than 0 seconds",
                "GIFGUESS_REDIS_RESPONSE_TIMEOUT",
            ));
        }

        Ok(())
    }
}

/// Parse `value` read from `key`, falling back to `default` when absent
///
/// # Errors
///
/// Returns a `ConfigurationError` naming `key` if the value is set but
/// cannot be parsed into `T`.
pub fn parse_value<T>(key: &str, value: Option<String>, default: T) -> Result<T, CoreError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .map(|v| {
            v.parse::<T>()
                .map_err(|e| CoreError::config(format!("Failed to parse {}: {}", key, e), key))
        })
        .unwrap_or(Ok(default))
}

/// Load .env file if present
///
/// A missing file is not an error.
pub fn load_dotenv() {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("Warning: Failed to load .env file: {}", e);
        }
    }
}
