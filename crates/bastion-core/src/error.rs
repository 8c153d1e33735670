//! Error types for Bastion.
//!
//! This module provides [`BastionError`], the failure vocabulary shared by the
//! verifier, the authorization gate and the rotation loop, together with the
//! [`Failure`] trait that lets the classification registry resolve any error
//! (ours or a downstream crate's) to a stable adapter.
//!
//! # Taxonomy
//!
//! | Variant | Failure kind | Category |
//! |---|---|---|
//! | `InvalidCredential` | `invalid_credential` | `Authentication` |
//! | `AuthenticationRequired` | `authentication_required` | `Authentication` |
//! | `AuthorizationDenied` | `authorization_denied` | `Authorization` |
//! | `InternalConfiguration` | `internal_configuration` | `Internal` |
//! | `ExternalServiceFailure` | `external` | `External` |
//! | `ExternalTimeout` | `external_timeout` | `Timeout` |
//! | `InvalidRequest` | `invalid_request` | `Validation` |
//! | `NotFound` | `not_found` | `NotFound` |
//! | `NoPrincipal` | `no_principal` | `Internal` |
//! | `Internal` | `internal` | `Internal` |

use http::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::kind::{kinds, FailureKind};

/// Result type alias using [`BastionError`].
pub type BastionResult<T> = Result<T, BastionError>;

/// Categories of errors for coarse handling decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Request validation errors.
    Validation,
    /// Resource not found.
    NotFound,
    /// Authentication errors (invalid/missing credentials).
    Authentication,
    /// Authorization errors (permission denied).
    Authorization,
    /// Internal errors, including configuration problems.
    Internal,
    /// External service errors (downstream failures).
    External,
    /// Downstream timeout.
    Timeout,
}

impl ErrorCategory {
    /// Returns the default HTTP status code for this error category.
    #[must_use]
    pub const fn default_status_code(&self) -> StatusCode {
        match self {
            Self::Validation => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Authentication => StatusCode::UNAUTHORIZED,
            Self::Authorization => StatusCode::FORBIDDEN,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            Self::External => StatusCode::BAD_GATEWAY,
            Self::Timeout => StatusCode::GATEWAY_TIMEOUT,
        }
    }
}

/// Code and message reported by a third-party service whose failure we wrap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalDetail {
    /// The downstream service's own error code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// The downstream service's own error message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ExternalDetail {
    /// Returns `None` when neither code nor message is known.
    #[must_use]
    pub fn from_parts(code: Option<String>, message: Option<String>) -> Option<Self> {
        if code.is_none() && message.is_none() {
            None
        } else {
            Some(Self { code, message })
        }
    }
}

/// A failure the classification registry can resolve.
///
/// Implemented by [`BastionError`]; downstream crates implement it for their
/// own error types and declare their own [`FailureKind`]s under the built-in
/// tree.
pub trait Failure: std::error::Error + Send + Sync + 'static {
    /// The exact kind of this failure.
    fn kind(&self) -> &'static FailureKind;

    /// A client-safe message carried by this particular failure, if any.
    ///
    /// When present it replaces the adapter's default message.
    fn client_message(&self) -> Option<&str> {
        None
    }

    /// Code and message reported by a wrapped third-party error, if any.
    fn external_detail(&self) -> Option<ExternalDetail> {
        None
    }
}

/// Standard error type for Bastion.
///
/// Display strings are meant for server-side logs; what clients see is decided
/// by the classification registry.
#[derive(Error, Debug)]
pub enum BastionError {
    /// Bearer credential was malformed, expired, forged, or could not be
    /// checked because no verifier is installed yet.
    #[error("Invalid credential: {message}")]
    InvalidCredential {
        /// Human-readable error message.
        message: String,
        /// The underlying verification failure (logged, never exposed).
        #[source]
        source: Option<anyhow::Error>,
    },

    /// A principal is required but none is present.
    #[error("Authentication required: {message}")]
    AuthenticationRequired {
        /// Human-readable error message.
        message: String,
    },

    /// The principal lacks a required role or capability, or is a different
    /// user or application than required.
    #[error("Authorization denied: {message}")]
    AuthorizationDenied {
        /// Human-readable error message.
        message: String,
    },

    /// Required configuration is missing or invalid. Fatal at startup.
    #[error("Internal configuration error: {message}")]
    InternalConfiguration {
        /// Human-readable error message.
        message: String,
    },

    /// A downstream service failed.
    #[error("External service error: {message}")]
    ExternalServiceFailure {
        /// Human-readable error message.
        message: String,
        /// The name of the external service.
        service: Option<String>,
        /// The downstream error code and message, when reported.
        external: Option<ExternalDetail>,
        /// The underlying transport or decoding error.
        #[source]
        source: Option<anyhow::Error>,
    },

    /// A downstream service did not answer in time.
    #[error("External service timeout: {message}")]
    ExternalTimeout {
        /// Human-readable error message.
        message: String,
        /// The name of the external service.
        service: Option<String>,
    },

    /// The request was invalid.
    #[error("Invalid request: {message}")]
    InvalidRequest {
        /// Debug message for logs.
        message: String,
        /// Message safe to return to the client, overriding the default.
        client_message: Option<String>,
    },

    /// Resource not found.
    #[error("Not found: {message}")]
    NotFound {
        /// Human-readable error message.
        message: String,
    },

    /// A principal was requested from an empty context.
    #[error("Principal was requested but the context is empty")]
    NoPrincipal,

    /// Internal error.
    #[error("Internal error: {message}")]
    Internal {
        /// Human-readable error message.
        message: String,
        /// The underlying error (not exposed to clients).
        #[source]
        source: Option<anyhow::Error>,
    },
}

impl BastionError {
    /// Creates an invalid credential error.
    #[must_use]
    pub fn invalid_credential(message: impl Into<String>) -> Self {
        Self::InvalidCredential {
            message: message.into(),
            source: None,
        }
    }

    /// Creates an invalid credential error with its underlying cause.
    pub fn invalid_credential_with_source(
        message: impl Into<String>,
        source: impl Into<anyhow::Error>,
    ) -> Self {
        Self::InvalidCredential {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Creates an authentication required error.
    #[must_use]
    pub fn authentication_required(message: impl Into<String>) -> Self {
        Self::AuthenticationRequired {
            message: message.into(),
        }
    }

    /// Creates an authorization denied error.
    #[must_use]
    pub fn authorization_denied(message: impl Into<String>) -> Self {
        Self::AuthorizationDenied {
            message: message.into(),
        }
    }

    /// Creates an internal configuration error.
    #[must_use]
    pub fn internal_configuration(message: impl Into<String>) -> Self {
        Self::InternalConfiguration {
            message: message.into(),
        }
    }

    /// Creates an external service error.
    #[must_use]
    pub fn external(message: impl Into<String>, service: Option<impl Into<String>>) -> Self {
        Self::ExternalServiceFailure {
            message: message.into(),
            service: service.map(Into::into),
            external: None,
            source: None,
        }
    }

    /// Creates an external service error carrying the downstream code/message.
    #[must_use]
    pub fn external_with_detail(
        message: impl Into<String>,
        service: impl Into<String>,
        external: Option<ExternalDetail>,
    ) -> Self {
        Self::ExternalServiceFailure {
            message: message.into(),
            service: Some(service.into()),
            external,
            source: None,
        }
    }

    /// Creates an external service error with its underlying cause.
    pub fn external_with_source(
        message: impl Into<String>,
        service: impl Into<String>,
        source: impl Into<anyhow::Error>,
    ) -> Self {
        Self::ExternalServiceFailure {
            message: message.into(),
            service: Some(service.into()),
            external: None,
            source: Some(source.into()),
        }
    }

    /// Creates an external timeout error.
    #[must_use]
    pub fn external_timeout(message: impl Into<String>, service: Option<impl Into<String>>) -> Self {
        Self::ExternalTimeout {
            message: message.into(),
            service: service.map(Into::into),
        }
    }

    /// Creates an invalid request error with only a debug message.
    #[must_use]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
            client_message: None,
        }
    }

    /// Creates an invalid request error whose client message overrides the default.
    #[must_use]
    pub fn invalid_request_for_client(
        client_message: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidRequest {
            message: message.into(),
            client_message: Some(client_message.into()),
        }
    }

    /// Creates a not found error.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
            source: None,
        }
    }

    /// Creates an internal error with a source error.
    pub fn internal_with_source(
        message: impl Into<String>,
        source: impl Into<anyhow::Error>,
    ) -> Self {
        Self::Internal {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Returns the error category.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidCredential { .. } | Self::AuthenticationRequired { .. } => {
                ErrorCategory::Authentication
            }
            Self::AuthorizationDenied { .. } => ErrorCategory::Authorization,
            Self::InternalConfiguration { .. } | Self::NoPrincipal | Self::Internal { .. } => {
                ErrorCategory::Internal
            }
            Self::ExternalServiceFailure { .. } => ErrorCategory::External,
            Self::ExternalTimeout { .. } => ErrorCategory::Timeout,
            Self::InvalidRequest { .. } => ErrorCategory::Validation,
            Self::NotFound { .. } => ErrorCategory::NotFound,
        }
    }

    /// Returns the HTTP status code for this error's category.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        self.category().default_status_code()
    }

    /// Returns the full cause chain rendered for logs.
    #[must_use]
    pub fn log_chain(&self) -> String {
        let mut rendered = self.to_string();
        let mut source = std::error::Error::source(self);
        while let Some(cause) = source {
            rendered.push_str(": ");
            rendered.push_str(&cause.to_string());
            source = cause.source();
        }
        rendered
    }
}

impl Failure for BastionError {
    fn kind(&self) -> &'static FailureKind {
        match self {
            Self::InvalidCredential { .. } => &kinds::INVALID_CREDENTIAL,
            Self::AuthenticationRequired { .. } => &kinds::AUTHENTICATION_REQUIRED,
            Self::AuthorizationDenied { .. } => &kinds::AUTHORIZATION_DENIED,
            Self::InternalConfiguration { .. } => &kinds::INTERNAL_CONFIGURATION,
            Self::ExternalServiceFailure { .. } => &kinds::EXTERNAL,
            Self::ExternalTimeout { .. } => &kinds::EXTERNAL_TIMEOUT,
            Self::InvalidRequest { .. } => &kinds::INVALID_REQUEST,
            Self::NotFound { .. } => &kinds::NOT_FOUND,
            Self::NoPrincipal => &kinds::NO_PRINCIPAL,
            Self::Internal { .. } => &kinds::INTERNAL,
        }
    }

    fn client_message(&self) -> Option<&str> {
        match self {
            Self::InvalidRequest {
                client_message: Some(message),
                ..
            } => Some(message),
            _ => None,
        }
    }

    fn external_detail(&self) -> Option<ExternalDetail> {
        match self {
            Self::ExternalServiceFailure { external, .. } => external.clone(),
            _ => None,
        }
    }
}

/// Serializable error envelope for client responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    /// The error details.
    pub error: ErrorDetail,
    /// The request ID for correlation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

/// Error detail within an envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Stable numeric error code.
    pub code: u32,
    /// Client-safe message.
    pub message: String,
    /// Downstream code/message for failures wrapping a third-party error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external: Option<ExternalDetail>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_credential_keeps_cause() {
        let cause = std::io::Error::new(std::io::ErrorKind::Other, "signature mismatch");
        let error = BastionError::invalid_credential_with_source("Could not verify token", cause);

        assert_eq!(error.category(), ErrorCategory::Authentication);
        assert_eq!(error.status_code(), StatusCode::UNAUTHORIZED);
        assert!(std::error::Error::source(&error).is_some());
        assert!(error.log_chain().contains("signature mismatch"));
    }

    #[test]
    fn test_authorization_denied() {
        let error = BastionError::authorization_denied("missing role");
        assert_eq!(error.category(), ErrorCategory::Authorization);
        assert_eq!(error.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(error.kind().name(), "authorization_denied");
    }

    #[test]
    fn test_client_message_only_for_invalid_request() {
        let error = BastionError::invalid_request_for_client("name is required", "name was null");
        assert_eq!(error.client_message(), Some("name is required"));
        assert!(error.to_string().contains("name was null"));

        assert_eq!(BastionError::invalid_request("bad").client_message(), None);
        assert_eq!(
            BastionError::authorization_denied("secret detail").client_message(),
            None
        );
    }

    #[test]
    fn test_external_detail() {
        let detail = ExternalDetail::from_parts(Some("E42".to_string()), None);
        let error = BastionError::external_with_detail("identity service failed", "iam", detail);

        let external = error.external_detail().unwrap();
        assert_eq!(external.code.as_deref(), Some("E42"));
        assert!(external.message.is_none());
        assert_eq!(error.kind().name(), "external");
    }

    #[test]
    fn test_external_detail_from_empty_parts() {
        assert!(ExternalDetail::from_parts(None, None).is_none());
    }

    #[test]
    fn test_every_variant_has_error_status() {
        let errors = [
            BastionError::invalid_credential("x"),
            BastionError::authentication_required("x"),
            BastionError::authorization_denied("x"),
            BastionError::internal_configuration("x"),
            BastionError::external("x", None::<String>),
            BastionError::external_timeout("x", Some("iam")),
            BastionError::invalid_request("x"),
            BastionError::not_found("x"),
            BastionError::NoPrincipal,
            BastionError::internal("x"),
        ];

        for error in errors {
            let status = error.status_code();
            assert!(
                status.is_client_error() || status.is_server_error(),
                "{error:?} should map to an error status, got {status}"
            );
        }
    }

    #[test]
    fn test_envelope_serialization_skips_empty_fields() {
        let envelope = ErrorEnvelope {
            error: ErrorDetail {
                code: 320,
                message: "refused".to_string(),
                external: None,
            },
            request_id: None,
        };

        let json = serde_json::to_string(&envelope).expect("serialization should work");
        assert_eq!(json, r#"{"error":{"code":320,"message":"refused"}}"#);
    }
}
