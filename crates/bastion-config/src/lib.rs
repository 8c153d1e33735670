//! Typed configuration for Bastion.
//!
//! - TOML and JSON configuration files
//! - Environment variable overrides, optionally seeded from a `.env` file
//! - Strict parsing (fails on unknown fields)
//! - Layered loading (defaults → file → env)
//!
//! [`BastionConfig`] has three sections:
//!
//! - [`JwtConfig`] - whether tokens are verified, expected issuer, leeway
//! - [`IdentityConfig`] - where signing secrets come from and how often to retry
//! - [`LoggingConfig`] - subscriber level and format
//!
//! # Example
//!
//! ```no_run
//! use bastion_config::ConfigLoader;
//!
//! # fn main() -> Result<(), bastion_config::ConfigError> {
//! let config = ConfigLoader::new()
//!     .with_file("bastion.toml")?
//!     .with_env_prefix("BASTION")
//!     .load()?;
//!
//! println!("Verifying tokens issued by {}", config.jwt.issuer);
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration File Format
//!
//! ```toml
//! [jwt]
//! enabled = true
//! issuer = "zen-iam"
//! leeway_secs = 30
//!
//! [identity]
//! app_name = "billing"
//! secret_endpoint_url = "https://iam.internal/secret"
//! hmac_key = "pre-shared-key"
//! fetch_timeout_ms = 10000
//! retry_backoff_ms = 30000
//!
//! [logging]
//! level = "info"
//! format = "json"
//! ```
//!
//! # Environment Variable Overrides
//!
//! Every value can be overridden with `PREFIX__SECTION__KEY`:
//!
//! - `BASTION__JWT__ISSUER=zen-iam`
//! - `BASTION__IDENTITY__HMAC_KEY=...`
//! - `BASTION__LOGGING__FORMAT=pretty`

#![warn(missing_docs)]

mod config;
mod error;
mod loader;
mod schema;

pub use bastion_telemetry::LogFormat;
pub use config::{BastionConfig, BastionConfigBuilder};
pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use schema::{IdentityConfig, JwtConfig, LoggingConfig};
