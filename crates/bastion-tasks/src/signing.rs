//! Signed secret requests.
//!
//! The identity service authenticates this service by an HMAC-SHA-512
//! signature over `appName:timestamp:nonce`, keyed by a pre-provisioned key.

use std::fmt;

use chrono::Utc;
use hmac::{Hmac, Mac};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::Sha512;

use crate::error::{RotationError, RotationResult};

type HmacSha512 = Hmac<Sha512>;

/// Length of the random nonce.
pub const NONCE_LENGTH: usize = 24;

/// A signed request for the latest secret material.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedSecretRequest {
    /// Requesting application.
    pub app_name: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    /// Random alphanumeric nonce.
    pub nonce: String,
    /// Lowercase hex HMAC-SHA-512 signature.
    pub signature: String,
}

impl SignedSecretRequest {
    /// Checks the signature against `key`.
    pub fn verify(&self, key: &str) -> bool {
        let Ok(mut mac) = HmacSha512::new_from_slice(key.as_bytes()) else {
            return false;
        };
        mac.update(signing_input(&self.app_name, self.timestamp, &self.nonce).as_bytes());
        hex::decode(&self.signature).is_ok_and(|expected| mac.verify_slice(&expected).is_ok())
    }
}

/// Signs secret requests for one application.
#[derive(Clone)]
pub struct RequestSigner {
    app_name: String,
    key: String,
}

impl RequestSigner {
    /// Creates a signer. Both the app name and key are required.
    pub fn new(app_name: impl Into<String>, key: impl Into<String>) -> RotationResult<Self> {
        let app_name = app_name.into();
        let key = key.into();
        if app_name.trim().is_empty() {
            return Err(RotationError::invalid_config("app name must not be empty"));
        }
        if key.is_empty() {
            return Err(RotationError::invalid_config("HMAC key must not be empty"));
        }
        Ok(Self { app_name, key })
    }

    /// Returns the application name.
    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    /// Builds a freshly signed request with the current time and a new nonce.
    pub fn sign(&self) -> RotationResult<SignedSecretRequest> {
        let nonce: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(NONCE_LENGTH)
            .map(char::from)
            .collect();
        self.sign_with(Utc::now().timestamp_millis(), nonce)
    }

    /// Builds a signed request for a given timestamp and nonce.
    pub fn sign_with(&self, timestamp: i64, nonce: String) -> RotationResult<SignedSecretRequest> {
        let signature = signature(&self.key, &self.app_name, timestamp, &nonce)?;
        Ok(SignedSecretRequest {
            app_name: self.app_name.clone(),
            timestamp,
            nonce,
            signature,
        })
    }
}

impl fmt::Debug for RequestSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestSigner")
            .field("app_name", &self.app_name)
            .field("key", &"<redacted>")
            .finish()
    }
}

fn signing_input(app_name: &str, timestamp: i64, nonce: &str) -> String {
    format!("{app_name}:{timestamp}:{nonce}")
}

fn signature(key: &str, app_name: &str, timestamp: i64, nonce: &str) -> RotationResult<String> {
    let mut mac = HmacSha512::new_from_slice(key.as_bytes())
        .map_err(|error| RotationError::invalid_config(format!("unusable HMAC key: {error}")))?;
    mac.update(signing_input(app_name, timestamp, nonce).as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}
