//! Configuration schema types.
//!
//! This module defines the structure of all configuration sections.

use std::fmt;
use std::time::Duration;

use bastion_telemetry::{LogConfig, LogFormat};
use serde::{Deserialize, Serialize};

/// Token verification section.
///
/// # Example
///
/// ```
/// use bastion_config::JwtConfig;
///
/// let config = JwtConfig {
///     issuer: "zen-iam".to_string(),
///     leeway_secs: 30,
///     ..Default::default()
/// };
/// assert!(config.enabled);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct JwtConfig {
    /// When `false` no verifier is built and the rotation loop never runs.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Expected `iss` claim. Required when enabled.
    #[serde(default)]
    pub issuer: String,

    /// Clock-skew tolerance for `exp`, in seconds.
    #[serde(default)]
    pub leeway_secs: u64,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            issuer: String::new(),
            leeway_secs: 0,
        }
    }
}

/// Identity service section: where signing secrets come from.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct IdentityConfig {
    /// Name this service signs secret requests as.
    #[serde(default)]
    pub app_name: String,

    /// Full URL the signed secret request is posted to.
    ///
    /// Used as-is, nothing is appended. Configurations that named only the
    /// identity service base URL must add the `/secret` path themselves.
    #[serde(default)]
    pub secret_endpoint_url: String,

    /// Pre-shared HMAC key for signing secret requests.
    #[serde(default)]
    pub hmac_key: String,

    /// Upper bound on one secret fetch, in milliseconds.
    #[serde(default = "default_fetch_timeout_ms")]
    pub fetch_timeout_ms: u64,

    /// Delay before the next rotation cycle after a failed one, in milliseconds.
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            app_name: String::new(),
            secret_endpoint_url: String::new(),
            hmac_key: String::new(),
            fetch_timeout_ms: default_fetch_timeout_ms(),
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

impl IdentityConfig {
    /// Fetch timeout as a [`Duration`].
    pub const fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    /// Retry backoff as a [`Duration`].
    pub const fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

impl fmt::Debug for IdentityConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityConfig")
            .field("app_name", &self.app_name)
            .field("secret_endpoint_url", &self.secret_endpoint_url)
            .field("hmac_key", &"<redacted>")
            .field("fetch_timeout_ms", &self.fetch_timeout_ms)
            .field("retry_backoff_ms", &self.retry_backoff_ms)
            .finish()
    }
}

fn default_fetch_timeout_ms() -> u64 {
    10_000
}

fn default_retry_backoff_ms() -> u64 {
    30_000
}

/// Logging section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Enable logging.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Filter directive (trace, debug, info, warn, error, or per-target).
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log output format.
    #[serde(default)]
    pub format: LogFormat,

    /// Include source file and line in logs.
    #[serde(default)]
    pub include_location: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: default_log_level(),
            format: LogFormat::default(),
            include_location: false,
        }
    }
}

impl LoggingConfig {
    /// Converts the section into a subscriber configuration.
    pub fn to_log_config(&self) -> LogConfig {
        LogConfig {
            enabled: self.enabled,
            level: self.level.clone(),
            format: self.format,
            file_line_info: self.include_location,
            ..LogConfig::default()
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jwt_config_default() {
        let config = JwtConfig::default();
        assert!(config.enabled);
        assert!(config.issuer.is_empty());
        assert_eq!(config.leeway_secs, 0);
    }

    #[test]
    fn test_identity_config_defaults_applied() {
        let toml = r#"
            app_name = "billing"
            secret_endpoint_url = "https://iam.internal/secret"
        "#;
        let config: IdentityConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.app_name, "billing");
        assert_eq!(config.fetch_timeout(), Duration::from_secs(10));
        assert_eq!(config.retry_backoff(), Duration::from_secs(30));
    }

    #[test]
    fn test_identity_config_unknown_field_rejected() {
        let toml = r#"
            app_name = "billing"
            token_endpoint_url = "https://iam.internal/token"
        "#;
        let result: Result<IdentityConfig, _> = toml::from_str(toml);
        assert!(result.is_err());
    }

    #[test]
    fn test_identity_config_debug_redacts_key() {
        let config = IdentityConfig {
            hmac_key: "pre-shared-key".to_string(),
            ..Default::default()
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("pre-shared-key"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_logging_config_to_log_config() {
        let config = LoggingConfig {
            level: "bastion_tasks=debug".to_string(),
            format: LogFormat::Pretty,
            include_location: true,
            ..Default::default()
        };
        let log = config.to_log_config();
        assert_eq!(log.level, "bastion_tasks=debug");
        assert_eq!(log.format, LogFormat::Pretty);
        assert!(log.file_line_info);
    }
}
