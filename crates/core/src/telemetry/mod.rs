//! Structured logging and span helpers
//!
//! # Example
//!
//! ```rust,no_run
//! use gifguess_core::telemetry::{init_tracing, TracingConfig};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     init_tracing(TracingConfig::from_env())?;
//!     Ok(())
//! }
//! ```

pub mod tracing;

pub use self::tracing::{
    cache_op_span, external_api_span, init_tracing, LogFormat, TelemetryError, TracingConfig,
};
