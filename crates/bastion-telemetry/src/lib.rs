//! Logging setup for Bastion services.
//!
//! - [`init_logging`] installs a global `tracing` subscriber from a [`LogConfig`]
//! - [`fields`] names the structured fields Bastion crates log with
//! - `log_request_*` macros emit the request boundary events
//!
//! ```text
//! tracing::info!(..) ──▶ EnvFilter ──▶ fmt layer (json | pretty) ──▶ stdout
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use bastion_telemetry::{init_logging, LogConfig};
//!
//! fn main() -> Result<(), bastion_telemetry::TelemetryError> {
//!     init_logging(&LogConfig::development())?;
//!     tracing::info!("Service starting");
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]

pub mod error;
pub mod logging;

pub use error::TelemetryError;
pub use logging::{create_env_filter, fields, init_logging, LogConfig, LogFormat};

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;
