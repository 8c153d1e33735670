//! # Bastion Identity
//!
//! Bearer credential verification for Bastion.
//!
//! - [`CredentialVerifier`] - verifies HS256 tokens against the current and
//!   previous signing secrets and issues new tokens
//! - [`SecretMaterial`] - rotating secret material as reported by the identity service
//! - [`TokenClaims`] - the claims carried by an authorization token
//! - [`parse_bearer`] / [`bearer_token`] - `Authorization: Bearer` parsing
//!
//! Key material is installed by the rotation loop in `bastion-tasks`; this
//! crate never fetches secrets itself.

#![doc(html_root_url = "https://docs.rs/bastion-identity/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod bearer;
mod claims;
mod issuer;
mod secret;
mod verifier;

pub use bearer::{bearer_token, parse_bearer, AUTHORIZATION_HEADER, BEARER_SCHEME};
pub use claims::TokenClaims;
pub use issuer::TokenRequest;
pub use secret::SecretMaterial;
pub use verifier::{CredentialVerifier, VerifierSettings, VerifierState};
