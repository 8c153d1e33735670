//! Top-level configuration.
//!
//! This module provides the root [`BastionConfig`] struct and its builder.

use serde::{Deserialize, Serialize};

use crate::{ConfigError, IdentityConfig, JwtConfig, LoggingConfig};

/// Complete Bastion configuration.
///
/// Use [`ConfigLoader`](crate::ConfigLoader) to load it from files and
/// environment variables.
///
/// # Example
///
/// ```
/// use bastion_config::BastionConfig;
///
/// let config = BastionConfig::default();
/// assert!(config.jwt.enabled);
/// assert_eq!(config.identity.retry_backoff_ms, 30_000);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct BastionConfig {
    /// Token verification.
    #[serde(default)]
    pub jwt: JwtConfig,

    /// Identity service used by secret rotation.
    #[serde(default)]
    pub identity: IdentityConfig,

    /// Logging.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl BastionConfig {
    /// Create a new configuration builder.
    #[must_use]
    pub fn builder() -> BastionConfigBuilder {
        BastionConfigBuilder::new()
    }

    /// Validate the configuration.
    ///
    /// With JWT enabled the issuer, app name, secret endpoint and HMAC key
    /// are all required.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt.enabled {
            require("jwt.issuer", &self.jwt.issuer)?;
            require("identity.app_name", &self.identity.app_name)?;
            require("identity.secret_endpoint_url", &self.identity.secret_endpoint_url)?;
            require("identity.hmac_key", &self.identity.hmac_key)?;

            if !self.identity.secret_endpoint_url.starts_with("http://")
                && !self.identity.secret_endpoint_url.starts_with("https://")
            {
                return Err(ConfigError::invalid_value(
                    "identity.secret_endpoint_url",
                    format!("not an http(s) URL: {}", self.identity.secret_endpoint_url),
                ));
            }
            if self.identity.fetch_timeout_ms == 0 {
                return Err(ConfigError::invalid_value(
                    "identity.fetch_timeout_ms",
                    "must be greater than zero",
                ));
            }
            if self.identity.retry_backoff_ms == 0 {
                return Err(ConfigError::invalid_value(
                    "identity.retry_backoff_ms",
                    "must be greater than zero",
                ));
            }
        }

        if self.logging.enabled {
            bastion_telemetry::create_env_filter(&self.logging.level)
                .map_err(|e| ConfigError::invalid_value("logging.level", e.to_string()))?;
        }

        Ok(())
    }

    /// Development preset: pretty debug logs.
    ///
    /// ```
    /// use bastion_config::BastionConfig;
    ///
    /// let config = BastionConfig::development();
    /// assert_eq!(config.logging.level, "debug");
    /// ```
    #[must_use]
    pub fn development() -> Self {
        let mut config = Self::default();
        config.logging.level = "debug".to_string();
        config.logging.format = bastion_telemetry::LogFormat::Pretty;
        config.logging.include_location = true;
        config
    }
}

fn require(field: &str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        Err(ConfigError::missing_field(field))
    } else {
        Ok(())
    }
}

/// Builder for [`BastionConfig`].
#[derive(Debug, Default)]
pub struct BastionConfigBuilder {
    jwt: Option<JwtConfig>,
    identity: Option<IdentityConfig>,
    logging: Option<LoggingConfig>,
}

impl BastionConfigBuilder {
    /// Create a new builder with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the JWT section.
    #[must_use]
    pub fn jwt(mut self, jwt: JwtConfig) -> Self {
        self.jwt = Some(jwt);
        self
    }

    /// Set the identity service section.
    #[must_use]
    pub fn identity(mut self, identity: IdentityConfig) -> Self {
        self.identity = Some(identity);
        self
    }

    /// Set the logging section.
    #[must_use]
    pub fn logging(mut self, logging: LoggingConfig) -> Self {
        self.logging = Some(logging);
        self
    }

    /// Build the configuration. Unset sections use their defaults.
    #[must_use]
    pub fn build(self) -> BastionConfig {
        BastionConfig {
            jwt: self.jwt.unwrap_or_default(),
            identity: self.identity.unwrap_or_default(),
            logging: self.logging.unwrap_or_default(),
        }
    }

    /// Build and validate the configuration.
    pub fn build_validated(self) -> Result<BastionConfig, ConfigError> {
        let config = self.build();
        config.validate()?;
        Ok(config)
    }
}
