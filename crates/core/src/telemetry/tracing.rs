//! Tracing subscriber configuration and span constructors

use thiserror::Error;
use tracing::{span, Level, Span};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Telemetry configuration errors
#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("Unknown log format: {0} (expected \"pretty\" or \"json\")")]
    UnknownFormat(String),

    #[error("Failed to initialize tracing subscriber: {0}")]
    SubscriberInit(String),
}

impl From<TelemetryError> for crate::error::CoreError {
    fn from(err: TelemetryError) -> Self {
        crate::error::CoreError::TelemetryError(err.to_string())
    }
}

/// Output format for console logs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = TelemetryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(TelemetryError::UnknownFormat(other.to_string())),
        }
    }
}

/// Configuration for structured logging
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Service name recorded on startup
    pub service_name: String,

    /// Console output format
    pub format: LogFormat,

    /// Emit logs to stderr; when false only the filter is installed
    pub enable_console: bool,

    /// Filter used when `RUST_LOG` is unset
    pub default_filter: String,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            service_name: "gifguess".to_string(),
            format: LogFormat::Pretty,
            enable_console: true,
            default_filter: "info".to_string(),
        }
    }
}

impl TracingConfig {
    /// Create config from environment variables
    ///
    /// - SERVICE_NAME: Service identifier
    /// - LOG_FORMAT: "pretty" (default) or "json"
    /// - LOG_CONSOLE_ENABLED: "false"/"0" disables console output
    ///
    /// An unknown LOG_FORMAT falls back to pretty output.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source; unset or unparsable values
    /// keep their defaults
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let service_name = lookup("SERVICE_NAME").unwrap_or(defaults.service_name);

        let format = lookup("LOG_FORMAT")
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.format);

        let enable_console = lookup("LOG_CONSOLE_ENABLED")
            .map(|v| v != "false" && v != "0")
            .unwrap_or(defaults.enable_console);

        Self {
            service_name,
            format,
            enable_console,
            default_filter: defaults.default_filter,
        }
    }
}

/// Install the global tracing subscriber
///
/// Must be called once at process startup.
///
/// # Errors
///
/// Returns `SubscriberInit` if a global subscriber is already installed.
pub fn init_tracing(config: TracingConfig) -> Result<(), TelemetryError> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.default_filter));

    let subscriber = tracing_subscriber::registry().with(env_filter);

    let result = match (config.enable_console, config.format) {
        (true, LogFormat::Json) => subscriber
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_writer(std::io::stderr),
            )
            .try_init(),
        (true, LogFormat::Pretty) => subscriber
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_line_number(true)
                    .with_writer(std::io::stderr),
            )
            .try_init(),
        (false, _) => subscriber.try_init(),
    };
    result.map_err(|e| TelemetryError::SubscriberInit(e.to_string()))?;

    tracing::info!(
        service_name = %config.service_name,
        format = ?config.format,
        "Tracing initialized"
    );

    Ok(())
}

/// Create a cache operation span
///
/// # Example
///
/// ```rust
/// use gifguess_core::telemetry::cache_op_span;
///
/// let _span = cache_op_span("GET", "gifs:item:abc123");
/// ```
pub fn cache_op_span(operation: &str, key: &str) -> Span {
    span!(
        Level::DEBUG,
        "cache.command",
        cache.operation = %operation,
        cache.key = %key,
        otel.kind = "client"
    )
}

/// Create an external API call span
///
/// # Example
///
/// ```rust
/// use gifguess_core::telemetry::external_api_span;
///
/// let _span = external_api_span("GET", "https://api.giphy.com/v1/gifs/search", "giphy");
/// ```
pub fn external_api_span(method: &str, url: &str, service: &str) -> Span {
    span!(
        Level::INFO,
        "http.client",
        http.method = %method,
        http.url = %url,
        peer.service = %service,
        otel.kind = "client"
    )
}
