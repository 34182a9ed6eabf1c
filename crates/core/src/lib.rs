//! # GifGuess Core
//!
//! Shared building blocks for the GifGuess acquisition services.
//!
//! ## Modules
//!
//! - `error`: Error types and handling
//! - `config`: Environment configuration loading and validation
//! - `retry`: Linear backoff policy
//! - `resilience`: Consecutive-failure circuit breaker
//! - `telemetry`: Structured logging setup and span helpers

pub mod config;
pub mod error;
pub mod resilience;
pub mod retry;
pub mod telemetry;

// Re-export commonly used types
pub use config::{load_dotenv, parse_value, ConfigLoader, RedisConfig};
pub use error::CoreError;
pub use resilience::{BreakerState, FailureBreaker};
pub use retry::BackoffPolicy;
pub use telemetry::{
    cache_op_span, external_api_span, init_tracing, LogFormat, TelemetryError, TracingConfig,
};

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, CoreError>;
