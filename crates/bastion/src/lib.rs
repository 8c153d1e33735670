//! # Bastion
//!
//! **Authentication, authorization and error classification for services**
//!
//! - **Credential verification** – bearer tokens checked against the current
//!   signing secret, with the previous one honored through a rotation window
//! - **Secret rotation** – a self-rescheduling loop that fetches new secrets
//!   from the identity service, retrying once and then backing off
//! - **Authorization gates** – role, capability and identity checks over the
//!   current principal
//! - **Error classification** – every failure maps to a stable code, message
//!   and status through a registry of adapters
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use bastion::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConfigLoader::new()
//!         .with_optional_file("bastion.toml")?
//!         .with_env_prefix("BASTION")
//!         .load()?;
//!
//!     let bastion = Bastion::from_config(config)?;
//!     bastion.init_logging()?;
//!     let _rotation = bastion.start();
//!
//!     let boundary = bastion.boundary();
//!     let report = boundary.run(&headers, |ctx| {
//!         require_any_role(ctx, ["auditor", "admin"])?;
//!         Ok(build_report())
//!     });
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! Config ──▶ Bastion ──▶ SecretRotationLoop ──fetch──▶ identity service
//!               │                │
//!               │             install
//!               ▼                ▼
//!        RequestBoundary ──▶ CredentialVerifier ──▶ PrincipalContext ──▶ gates
//!               │
//!               └── failure ──▶ ErrorRegistry ──▶ ErrorEnvelope
//! ```

#![doc(html_root_url = "https://docs.rs/bastion/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod app;
mod boundary;

pub use app::Bastion;
pub use boundary::{Rejection, RequestBoundary};

// Re-export core types
pub use bastion_core as core;

// Re-export identity types
pub use bastion_identity as identity;

// Re-export authorization gates
pub use bastion_authz as authz;

// Re-export background rotation types
pub use bastion_tasks as tasks;

// Re-export configuration types
pub use bastion_config as config;

// Re-export logging setup
pub use bastion_telemetry as telemetry;

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```rust,ignore
/// use bastion::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{Bastion, Rejection, RequestBoundary};

    pub use bastion_core::{
        BastionError, BastionResult, ErrorAdapter, ErrorRegistry, Principal, PrincipalContext,
        RequestId,
    };

    pub use bastion_authz::{
        guard, require_all_capabilities, require_all_roles, require_any_capability,
        require_any_role, require_capability, require_role, require_signed_in, require_user_id,
        AppGate, Requirement,
    };

    pub use bastion_identity::{CredentialVerifier, SecretMaterial, TokenRequest};

    pub use bastion_config::{BastionConfig, ConfigLoader};
}
