//! Configuration loader with layered approach.
//!
//! This module provides the [`ConfigLoader`] for loading configuration from
//! multiple sources: defaults, files, and environment variables.

use std::env;
use std::fs;
use std::path::Path;

use crate::{BastionConfig, ConfigError, LogFormat};

/// Configuration loader with layered approach.
///
/// Later layers override earlier ones:
/// 1. Default values (built into the code)
/// 2. Configuration file or string (TOML or JSON)
/// 3. Environment variables, optionally seeded from a `.env` file
///
/// # Example
///
/// ```no_run
/// use bastion_config::ConfigLoader;
///
/// # fn main() -> Result<(), bastion_config::ConfigError> {
/// let config = ConfigLoader::new()
///     .with_optional_file("bastion.toml")?
///     .with_dotenv()
///     .with_env_prefix("BASTION")
///     .load()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ConfigLoader {
    config: BastionConfig,
    env_prefix: Option<String>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Create a loader starting from defaults.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: BastionConfig::default(),
            env_prefix: None,
        }
    }

    /// Start with the development preset.
    #[must_use]
    pub fn with_development(mut self) -> Self {
        self.config = BastionConfig::development();
        self
    }

    /// Load configuration from a file.
    ///
    /// The format is chosen by extension: `.toml` or `.json`. Sections the
    /// file leaves out keep their defaults.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::file_not_found(path));
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::read_error(path, e))?;

        self.config = Self::parse_file(&content, path)?;
        Ok(self)
    }

    /// Load configuration from a file if it exists.
    pub fn with_optional_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            self.with_file(path)
        } else {
            Ok(self)
        }
    }

    /// Load configuration from a string in `format` ("toml" or "json").
    ///
    /// ```
    /// use bastion_config::ConfigLoader;
    ///
    /// let toml = r#"
    ///     [jwt]
    ///     enabled = false
    /// "#;
    ///
    /// let config = ConfigLoader::new()
    ///     .with_string(toml, "toml")
    ///     .unwrap()
    ///     .load()
    ///     .unwrap();
    ///
    /// assert!(!config.jwt.enabled);
    /// ```
    pub fn with_string(mut self, content: &str, format: &str) -> Result<Self, ConfigError> {
        self.config = match format.to_lowercase().as_str() {
            "toml" => toml::from_str(content)?,
            "json" => serde_json::from_str(content)?,
            _ => return Err(ConfigError::UnsupportedFormat(format.to_string())),
        };
        Ok(self)
    }

    /// Set the environment variable prefix for overrides.
    ///
    /// Variables use the format `PREFIX__SECTION__KEY`, e.g.
    /// `BASTION__JWT__ISSUER=zen-iam` or `BASTION__IDENTITY__FETCH_TIMEOUT_MS=5000`.
    #[must_use]
    pub fn with_env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = Some(prefix.to_uppercase());
        self
    }

    /// Load a `.env` file from the current directory or its parents, if any.
    ///
    /// Variables already set in the process environment win.
    #[must_use]
    pub fn with_dotenv(self) -> Self {
        let _ = dotenvy::dotenv();
        self
    }

    /// Load a specific `.env` file.
    pub fn with_dotenv_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        dotenvy::from_path(path).map_err(|e| ConfigError::Dotenv {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Ok(self)
    }

    /// Apply environment overrides from the process environment and validate.
    pub fn load(self) -> Result<BastionConfig, ConfigError> {
        self.load_with_env(env::vars())
    }

    /// Like [`load`](Self::load), reading overrides from `vars` instead of the
    /// process environment.
    pub fn load_with_env<I>(mut self, vars: I) -> Result<BastionConfig, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        if let Some(prefix) = self.env_prefix.take() {
            let marker = format!("{prefix}__");
            let mut overrides: Vec<(String, String)> = vars
                .into_iter()
                .filter(|(key, _)| key.starts_with(&marker))
                .collect();
            overrides.sort();

            for (key, value) in overrides {
                self.apply_env_var(&key, &value, &prefix)?;
            }
        }

        self.config.validate()?;
        Ok(self.config)
    }

    /// Finalize without validation.
    #[must_use]
    pub fn load_unvalidated(self) -> BastionConfig {
        self.config
    }

    fn parse_file(content: &str, path: &Path) -> Result<BastionConfig, ConfigError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase);

        match extension.as_deref() {
            Some("toml") => Ok(toml::from_str(content)?),
            Some("json") => Ok(serde_json::from_str(content)?),
            _ => Err(ConfigError::UnsupportedFormat(path.display().to_string())),
        }
    }

    fn apply_env_var(&mut self, key: &str, value: &str, prefix: &str) -> Result<(), ConfigError> {
        let key_without_prefix = key
            .strip_prefix(prefix)
            .and_then(|k| k.strip_prefix("__"))
            .ok_or_else(|| ConfigError::env_parse_error(key, "invalid key format"))?;

        let parts: Vec<&str> = key_without_prefix.split("__").collect();
        let jwt = &mut self.config.jwt;
        let identity = &mut self.config.identity;
        let logging = &mut self.config.logging;

        match parts.as_slice() {
            ["JWT", "ENABLED"] => jwt.enabled = parse_bool_var(key, value)?,
            ["JWT", "ISSUER"] => jwt.issuer = value.to_string(),
            ["JWT", "LEEWAY_SECS"] => jwt.leeway_secs = parse_u64_var(key, value)?,

            ["IDENTITY", "APP_NAME"] => identity.app_name = value.to_string(),
            ["IDENTITY", "SECRET_ENDPOINT_URL"] => identity.secret_endpoint_url = value.to_string(),
            ["IDENTITY", "HMAC_KEY"] => identity.hmac_key = value.to_string(),
            ["IDENTITY", "FETCH_TIMEOUT_MS"] => {
                identity.fetch_timeout_ms = parse_u64_var(key, value)?;
            }
            ["IDENTITY", "RETRY_BACKOFF_MS"] => {
                identity.retry_backoff_ms = parse_u64_var(key, value)?;
            }

            ["LOGGING", "ENABLED"] => logging.enabled = parse_bool_var(key, value)?,
            ["LOGGING", "LEVEL"] => logging.level = value.to_string(),
            ["LOGGING", "FORMAT"] => {
                logging.format = match value.to_lowercase().as_str() {
                    "json" => LogFormat::Json,
                    "pretty" => LogFormat::Pretty,
                    _ => {
                        return Err(ConfigError::env_parse_error(
                            key,
                            "expected 'json' or 'pretty'",
                        ))
                    }
                };
            }
            ["LOGGING", "INCLUDE_LOCATION"] => {
                logging.include_location = parse_bool_var(key, value)?;
            }

            [section, field @ ..] => {
                return Err(ConfigError::unknown_field(
                    field.join("__"),
                    section.to_lowercase(),
                ))
            }
            [] => return Err(ConfigError::env_parse_error(key, "invalid key format")),
        }

        Ok(())
    }
}

fn parse_bool_var(key: &str, value: &str) -> Result<bool, ConfigError> {
    parse_bool(value).ok_or_else(|| ConfigError::env_parse_error(key, "expected boolean"))
}

fn parse_u64_var(key: &str, value: &str) -> Result<u64, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::env_parse_error(key, "expected integer"))
}

/// Parse a boolean from a string.
fn parse_bool(s: &str) -> Option<bool> {
    match s.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    const DISABLED: &str = r#"
        [jwt]
        enabled = false
    "#;

    #[test]
    fn test_loader_defaults_unvalidated() {
        let config = ConfigLoader::new().load_unvalidated();
        assert_eq!(config, BastionConfig::default());
    }

    #[test]
    fn test_loader_defaults_fail_validation() {
        let result = ConfigLoader::new().load_with_env(Vec::new());
        assert!(matches!(result, Err(ConfigError::MissingField { .. })));
    }

    #[test]
    fn test_loader_with_string_json() {
        let json = r#"{"jwt": {"enabled": false}, "logging": {"format": "pretty"}}"#;

        let config = ConfigLoader::new()
            .with_string(json, "json")
            .unwrap()
            .load_with_env(Vec::new())
            .unwrap();

        assert!(!config.jwt.enabled);
        assert_eq!(config.logging.format, LogFormat::Pretty);
    }

    #[test]
    fn test_loader_unsupported_format() {
        let result = ConfigLoader::new().with_string("jwt: {}", "yaml");
        assert!(matches!(result, Err(ConfigError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_loader_with_file_not_found() {
        let result = ConfigLoader::new().with_file("/nonexistent/bastion.toml");
        assert!(matches!(result, Err(ConfigError::FileNotFound { .. })));
    }

    #[test]
    fn test_loader_with_optional_file_not_found() {
        let config = ConfigLoader::new()
            .with_optional_file("/nonexistent/bastion.toml")
            .unwrap()
            .load_unvalidated();

        assert_eq!(config, BastionConfig::default());
    }

    #[test]
    fn test_env_overrides_every_section() {
        let config = ConfigLoader::new()
            .with_env_prefix("bastion")
            .load_with_env(vars(&[
                ("BASTION__JWT__ISSUER", "zen-iam"),
                ("BASTION__JWT__LEEWAY_SECS", "30"),
                ("BASTION__IDENTITY__APP_NAME", "billing"),
                ("BASTION__IDENTITY__SECRET_ENDPOINT_URL", "https://iam.internal/secret"),
                ("BASTION__IDENTITY__HMAC_KEY", "pre-shared-key"),
                ("BASTION__IDENTITY__RETRY_BACKOFF_MS", "15000"),
                ("BASTION__LOGGING__FORMAT", "Pretty"),
                ("OTHER__JWT__ISSUER", "ignored"),
            ]))
            .unwrap();

        assert_eq!(config.jwt.issuer, "zen-iam");
        assert_eq!(config.jwt.leeway_secs, 30);
        assert_eq!(config.identity.app_name, "billing");
        assert_eq!(config.identity.retry_backoff_ms, 15_000);
        assert_eq!(config.identity.fetch_timeout_ms, 10_000);
        assert_eq!(config.logging.format, LogFormat::Pretty);
    }

    #[test]
    fn test_env_overrides_string_layer() {
        let config = ConfigLoader::new()
            .with_string(DISABLED, "toml")
            .unwrap()
            .with_env_prefix("BASTION")
            .load_with_env(vars(&[("BASTION__LOGGING__LEVEL", "warn")]))
            .unwrap();

        assert!(!config.jwt.enabled);
        assert_eq!(config.logging.level, "warn");
    }

    #[test]
    fn test_env_invalid_integer() {
        let result = ConfigLoader::new()
            .with_env_prefix("BASTION")
            .load_with_env(vars(&[("BASTION__JWT__LEEWAY_SECS", "soon")]));

        assert!(matches!(result, Err(ConfigError::EnvParseError { .. })));
    }

    #[test]
    fn test_env_unknown_key() {
        let result = ConfigLoader::new()
            .with_string(DISABLED, "toml")
            .unwrap()
            .with_env_prefix("BASTION")
            .load_with_env(vars(&[("BASTION__IDENTITY__TOKEN_ENDPOINT_URL", "x")]));

        match result {
            Err(ConfigError::UnknownField { field, section }) => {
                assert_eq!(field, "TOKEN_ENDPOINT_URL");
                assert_eq!(section, "identity");
            }
            other => panic!("expected unknown field, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool("true"), Some(true));
        assert_eq!(parse_bool("TRUE"), Some(true));
        assert_eq!(parse_bool("1"), Some(true));
        assert_eq!(parse_bool("on"), Some(true));

        assert_eq!(parse_bool("False"), Some(false));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("no"), Some(false));

        assert_eq!(parse_bool("maybe"), None);
        assert_eq!(parse_bool(""), None);
    }
}
