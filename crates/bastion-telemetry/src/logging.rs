//! Structured logging for Bastion.
//!
//! Installs a global `tracing-subscriber` with an [`EnvFilter`] and either
//! JSON (production) or pretty (development) output.
//!
//! # Example
//!
//! ```rust,ignore
//! use bastion_telemetry::logging::{init_logging, LogConfig};
//!
//! init_logging(&LogConfig::default())?;
//!
//! tracing::info!(user_id = "u-1", "Principal authenticated");
//! ```

use serde::{Deserialize, Serialize};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::error::TelemetryError;
use crate::TelemetryResult;

/// Log output format.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON formatted logs (production).
    #[default]
    Json,
    /// Human-readable pretty format (development).
    Pretty,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// Whether logging is enabled.
    pub enabled: bool,

    /// Filter directive (e.g., "info", "bastion_tasks=debug,warn").
    pub level: String,

    /// Output format.
    pub format: LogFormat,

    /// Whether to include file/line info.
    pub file_line_info: bool,

    /// Whether to include target (module path).
    pub include_target: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: "info".to_string(),
            format: LogFormat::Json,
            file_line_info: false,
            include_target: true,
        }
    }
}

impl LogConfig {
    /// Creates a development configuration with human-readable output.
    #[must_use]
    pub fn development() -> Self {
        Self {
            level: "debug".to_string(),
            format: LogFormat::Pretty,
            file_line_info: true,
            ..Self::default()
        }
    }

    /// Creates a production configuration with JSON output.
    #[must_use]
    pub fn production() -> Self {
        Self::default()
    }
}

/// Initializes the global logging subscriber.
///
/// Does nothing when logging is disabled.
///
/// # Errors
///
/// Returns `TelemetryError::InvalidFilter` for a bad filter directive and
/// `TelemetryError::LoggingInit` if a global subscriber is already set.
pub fn init_logging(config: &LogConfig) -> TelemetryResult<()> {
    if !config.enabled {
        return Ok(());
    }

    let filter = create_env_filter(&config.level)?;

    match config.format {
        LogFormat::Json => {
            let fmt_layer = tracing_subscriber::fmt::layer()
                .json()
                .with_file(config.file_line_info)
                .with_line_number(config.file_line_info)
                .with_target(config.include_target)
                .with_filter(filter);

            tracing_subscriber::registry()
                .with(fmt_layer)
                .try_init()
                .map_err(|e| TelemetryError::LoggingInit(e.to_string()))?;
        }
        LogFormat::Pretty => {
            let fmt_layer = tracing_subscriber::fmt::layer()
                .pretty()
                .with_file(config.file_line_info)
                .with_line_number(config.file_line_info)
                .with_target(config.include_target)
                .with_filter(filter);

            tracing_subscriber::registry()
                .with(fmt_layer)
                .try_init()
                .map_err(|e| TelemetryError::LoggingInit(e.to_string()))?;
        }
    }

    Ok(())
}

/// Creates an env filter from a directive string.
///
/// # Errors
///
/// Returns error if the directive is invalid.
pub fn create_env_filter(filter: &str) -> TelemetryResult<EnvFilter> {
    EnvFilter::try_new(filter).map_err(|e| TelemetryError::InvalidFilter {
        filter: filter.to_string(),
        reason: e.to_string(),
    })
}

/// Field names emitted by the `log_request_*` macros.
///
/// Secrets and raw tokens never appear under any of these.
pub mod fields {
    /// Request ID field name.
    pub const REQUEST_ID: &str = "request_id";

    /// User ID field name.
    pub const USER_ID: &str = "user_id";

    /// Classified error code field name.
    pub const ERROR_CODE: &str = "error_code";

    /// Classifying adapter name field name.
    pub const ERROR_ADAPTER: &str = "error_adapter";

    /// Error field name.
    pub const ERROR: &str = "error";

    /// Duration field name (in milliseconds).
    pub const DURATION_MS: &str = "duration_ms";
}

/// Logs the start of a unit of work.
#[macro_export]
macro_rules! log_request_start {
    ($request_id:expr, $user_id:expr) => {
        tracing::debug!(
            request_id = %$request_id,
            user_id = %$user_id,
            "Request started"
        );
    };
}

/// Logs the successful completion of a unit of work.
#[macro_export]
macro_rules! log_request_complete {
    ($request_id:expr, $duration_ms:expr) => {
        tracing::info!(
            request_id = %$request_id,
            duration_ms = $duration_ms,
            "Request completed"
        );
    };
}

/// Logs a failed unit of work with its classified code and internal cause.
#[macro_export]
macro_rules! log_request_failure {
    ($request_id:expr, $adapter:expr, $code:expr, $error:expr) => {
        tracing::warn!(
            request_id = %$request_id,
            error_adapter = %$adapter,
            error_code = $code,
            error = %$error,
            "Request failed"
        );
    };
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use tracing_subscriber::fmt::MakeWriter;

    use super::*;

    #[test]
    fn test_default_config() {
        let config = LogConfig::default();
        assert!(config.enabled);
        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.level, "info");
        assert_eq!(LogConfig::production(), config);
    }

    #[test]
    fn test_development_config() {
        let config = LogConfig::development();
        assert_eq!(config.format, LogFormat::Pretty);
        assert!(config.file_line_info);
        assert_eq!(config.level, "debug");
    }

    #[test]
    fn test_log_format_serde() {
        let format: LogFormat = serde_json::from_str(r#""pretty""#).unwrap();
        assert_eq!(format, LogFormat::Pretty);
        assert_eq!(serde_json::to_string(&LogFormat::Json).unwrap(), r#""json""#);
    }

    #[test]
    fn test_create_env_filter() {
        assert!(create_env_filter("info").is_ok());
        assert!(create_env_filter("bastion_tasks=debug,warn").is_ok());
        assert!(matches!(
            create_env_filter("bastion=notalevel"),
            Err(TelemetryError::InvalidFilter { .. })
        ));
    }

    #[test]
    fn test_disabled_logging() {
        let config = LogConfig {
            enabled: false,
            level: "not a filter [[[".to_string(),
            ..LogConfig::default()
        };

        assert!(init_logging(&config).is_ok());
    }

    #[test]
    fn test_second_init_fails() {
        let config = LogConfig::development();

        let first = init_logging(&config);
        let second = init_logging(&config);

        assert!(first.is_ok());
        assert!(matches!(second, Err(TelemetryError::LoggingInit(_))));
    }

    #[derive(Clone, Default)]
    struct Capture(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for Capture {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for Capture {
        type Writer = Self;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    fn emitted_fields(emit: impl FnOnce()) -> Vec<serde_json::Value> {
        let capture = Capture::default();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .json()
            .with_writer(capture.clone())
            .finish();
        tracing::subscriber::with_default(subscriber, emit);

        let output = String::from_utf8(capture.0.lock().unwrap().clone()).unwrap();
        output
            .lines()
            .map(|line| serde_json::from_str::<serde_json::Value>(line).unwrap()["fields"].clone())
            .collect()
    }

    #[test]
    fn test_macros_emit_standard_field_names() {
        let events = emitted_fields(|| {
            crate::log_request_start!("r-1", "u-1");
            crate::log_request_complete!("r-1", 12_u64);
            crate::log_request_failure!("r-1", "denied", 320_u32, "missing role admin");
        });

        assert_eq!(events.len(), 3);
        assert_eq!(events[0][fields::REQUEST_ID], "r-1");
        assert_eq!(events[0][fields::USER_ID], "u-1");
        assert_eq!(events[1][fields::DURATION_MS], 12);
        assert_eq!(events[2][fields::ERROR_ADAPTER], "denied");
        assert_eq!(events[2][fields::ERROR_CODE], 320);
        assert_eq!(events[2][fields::ERROR], "missing role admin");
    }
}
