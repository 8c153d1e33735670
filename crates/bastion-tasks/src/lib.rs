//! # Bastion Tasks
//!
//! Background secret rotation for Bastion.
//!
//! - [`SecretRotationLoop`] - fetches the latest signing secret and installs it
//!   into a [`CredentialVerifier`](bastion_identity::CredentialVerifier),
//!   retrying once and backing off on failure
//! - [`IdentityService`] / [`HttpIdentityService`] - where secrets come from
//! - [`RequestSigner`] - HMAC-SHA-512 request signing for the identity service
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use bastion_identity::{CredentialVerifier, VerifierSettings};
//! use bastion_tasks::{HttpIdentityService, RequestSigner, RotationConfig, SecretRotationLoop};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let verifier = Arc::new(CredentialVerifier::new(VerifierSettings::new("zen-iam"))?);
//! let service = HttpIdentityService::new("https://iam.internal/secret", Duration::from_secs(10))?;
//!
//! let rotation = Arc::new(SecretRotationLoop::new(
//!     RotationConfig::default(),
//!     RequestSigner::new("billing", "pre-shared-key")?,
//!     Arc::new(service),
//!     Arc::clone(&verifier),
//! ));
//! let _handle = rotation.spawn();
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod client;
mod error;
mod rotation;
mod signing;

pub use client::{BoxFuture, HttpIdentityService, IdentityService, IDENTITY_SERVICE};
pub use error::{RotationError, RotationResult};
pub use rotation::{CycleOutcome, RotationConfig, RotationStats, SecretRotationLoop};
pub use signing::{RequestSigner, SignedSecretRequest, NONCE_LENGTH};
