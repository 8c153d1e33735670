//! # Bastion Core
//!
//! Core types shared by every Bastion crate:
//!
//! - [`BastionError`] - Standard error taxonomy
//! - [`FailureKind`] / [`kinds`] - Failure-kind tree used for classification
//! - [`ErrorRegistry`] - Maps failures to stable codes and client-safe messages
//! - [`Principal`] - Verified caller identity
//! - [`PrincipalContext`] - Request-scoped slot holding the principal
//! - [`RequestId`] - UUID v7 request identifier

#![doc(html_root_url = "https://docs.rs/bastion-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod classify;
mod context;
mod error;
mod kind;
mod principal;

pub use classify::{
    Classification, ErrorAdapter, ErrorRegistry, ExternalExtractor, Provenance,
    UNKNOWN_ERROR_CODE, UNKNOWN_ERROR_MESSAGE,
};
pub use context::{PrincipalContext, PrincipalScope, RequestId};
pub use error::{
    BastionError, BastionResult, ErrorCategory, ErrorDetail, ErrorEnvelope, ExternalDetail,
    Failure,
};
pub use kind::{kinds, Ancestors, FailureKind};
pub use principal::{Principal, PrincipalBuilder};
