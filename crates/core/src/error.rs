//! Error types shared by the GifGuess crates

use thiserror::Error;

/// Errors raised by the shared core building blocks
#[derive(Debug, Error)]
pub enum CoreError {
    /// A configuration value is missing, unparseable, or out of range
    #[error("Configuration error: {message}")]
    ConfigurationError {
        message: String,
        key: Option<String>,
    },

    /// A value failed validation
    #[error("Validation error: {message}")]
    ValidationError {
        message: String,
        field: Option<String>,
    },

    /// Tracing subscriber could not be installed
    #[error("Telemetry error: {0}")]
    TelemetryError(String),
}

impl CoreError {
    /// Build a configuration error tied to an environment key
    pub fn config(message: impl Into<String>, key: impl Into<String>) -> Self {
        Self::ConfigurationError {
            message: message.into(),
            key: Some(key.into()),
        }
    }

    /// Build a validation error tied to a field
    pub fn validation_field(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Whether retrying the failed operation could succeed
    ///
    /// Configuration and validation problems never fix themselves.
    pub fn is_retryable(&self) -> bool {
        match self {
            CoreError::ConfigurationError { .. } | CoreError::ValidationError { .. } => false,
            CoreError::TelemetryError(_) => false,
        }
    }

    /// The environment key or field this error refers to, if any
    pub fn key(&self) -> Option<&str> {
        match self {
            CoreError::ConfigurationError { key, .. } => key.as_deref(),
            CoreError::ValidationError { field, .. } => field.as_deref(),
            CoreError::TelemetryError(_) => None,
        }
    }
}
