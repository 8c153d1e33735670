//! Configuration error types.

use std::path::PathBuf;

use bastion_core::BastionError;
use thiserror::Error;

/// Errors that can occur during configuration loading.
///
/// All of them are startup failures and are never retried.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file not found.
    #[error("configuration file not found: {path}")]
    FileNotFound {
        /// Path to the missing file.
        path: PathBuf,
    },

    /// Failed to read configuration file.
    #[error("failed to read configuration file: {path}")]
    ReadError {
        /// Path to the file.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// TOML parsing error.
    #[error("failed to parse TOML configuration: {0}")]
    TomlError(#[from] toml::de::Error),

    /// JSON parsing error.
    #[error("failed to parse JSON configuration: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Neither TOML nor JSON.
    #[error("unsupported configuration format: {0}")]
    UnsupportedFormat(String),

    /// Unknown key in an environment override.
    #[error("unknown configuration field: {field} in section {section}")]
    UnknownField {
        /// The unknown field name.
        field: String,
        /// The section containing the field.
        section: String,
    },

    /// Invalid configuration value.
    #[error("invalid configuration value for {field}: {reason}")]
    InvalidValue {
        /// The field with the invalid value.
        field: String,
        /// Explanation of why the value is invalid.
        reason: String,
    },

    /// Missing required field.
    #[error("missing required configuration field: {field}")]
    MissingField {
        /// The missing field name.
        field: String,
    },

    /// Environment variable parsing error.
    #[error("failed to parse environment variable {var}: {reason}")]
    EnvParseError {
        /// The environment variable name.
        var: String,
        /// Explanation of the parsing error.
        reason: String,
    },

    /// A `.env` file could not be loaded.
    #[error("failed to load env file {path}: {reason}")]
    Dotenv {
        /// Path to the env file.
        path: PathBuf,
        /// Explanation from the loader.
        reason: String,
    },
}

impl ConfigError {
    /// Create a new file not found error.
    pub fn file_not_found(path: impl Into<PathBuf>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    /// Create a new read error.
    pub fn read_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::ReadError {
            path: path.into(),
            source,
        }
    }

    /// Create a new unknown field error.
    pub fn unknown_field(field: impl Into<String>, section: impl Into<String>) -> Self {
        Self::UnknownField {
            field: field.into(),
            section: section.into(),
        }
    }

    /// Create a new invalid value error.
    pub fn invalid_value(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create a new missing field error.
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
        }
    }

    /// Create a new environment variable parse error.
    pub fn env_parse_error(var: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::EnvParseError {
            var: var.into(),
            reason: reason.into(),
        }
    }
}

impl From<ConfigError> for BastionError {
    fn from(err: ConfigError) -> Self {
        Self::internal_configuration(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bastion_core::ErrorRegistry;

    #[test]
    fn test_file_not_found_error() {
        let err = ConfigError::file_not_found("/path/to/bastion.toml");
        assert!(err.to_string().contains("/path/to/bastion.toml"));
    }

    #[test]
    fn test_unknown_field_error() {
        let err = ConfigError::unknown_field("TOKEN_URL", "identity");
        assert!(err.to_string().contains("TOKEN_URL"));
        assert!(err.to_string().contains("identity"));
    }

    #[test]
    fn test_env_parse_error() {
        let err = ConfigError::env_parse_error("BASTION__JWT__LEEWAY_SECS", "expected integer");
        assert!(err.to_string().contains("BASTION__JWT__LEEWAY_SECS"));
        assert!(err.to_string().contains("expected integer"));
    }

    #[test]
    fn test_converts_to_internal_configuration() {
        let err: BastionError = ConfigError::missing_field("jwt.issuer").into();
        assert!(matches!(err, BastionError::InternalConfiguration { .. }));
        assert_eq!(ErrorRegistry::with_defaults().describe(&err).code, 610);
    }
}
