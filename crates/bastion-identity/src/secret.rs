//! Rotating signing-secret material.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Signing secrets reported by the identity service.
///
/// `previous_secret` is absent only right after the first bootstrap.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretMaterial {
    /// Secret new tokens are signed with.
    pub current_secret: String,
    /// Secret the previous generation of tokens was signed with.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_secret: Option<String>,
    /// How long this material stays current, in milliseconds.
    #[serde(rename = "expires")]
    pub validity_window_ms: u64,
}

impl SecretMaterial {
    /// Creates secret material.
    #[must_use]
    pub fn new(
        current_secret: impl Into<String>,
        previous_secret: Option<String>,
        validity_window_ms: u64,
    ) -> Self {
        Self {
            current_secret: current_secret.into(),
            previous_secret,
            validity_window_ms,
        }
    }

    /// Returns the validity window.
    #[must_use]
    pub const fn validity_window(&self) -> Duration {
        Duration::from_millis(self.validity_window_ms)
    }
}

impl fmt::Debug for SecretMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretMaterial")
            .field("current_secret", &"<redacted>")
            .field(
                "previous_secret",
                &self.previous_secret.as_ref().map(|_| "<redacted>"),
            )
            .field("validity_window_ms", &self.validity_window_ms)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_format() {
        let material: SecretMaterial =
            serde_json::from_str(r#"{"currentSecret":"a","previousSecret":"b","expires":3600000}"#)
                .unwrap();

        assert_eq!(material.current_secret, "a");
        assert_eq!(material.previous_secret.as_deref(), Some("b"));
        assert_eq!(material.validity_window(), Duration::from_secs(3600));
    }

    #[test]
    fn test_previous_is_optional() {
        let material: SecretMaterial =
            serde_json::from_str(r#"{"currentSecret":"a","expires":1}"#).unwrap();
        assert!(material.previous_secret.is_none());
    }

    #[test]
    fn test_debug_redacts() {
        let material = SecretMaterial::new("hunter2", Some("hunter1".to_string()), 5);
        let debug = format!("{material:?}");
        assert!(!debug.contains("hunter"));
    }
}
