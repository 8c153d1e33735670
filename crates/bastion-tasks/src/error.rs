//! Error types for secret rotation.

use std::time::Duration;

use bastion_core::BastionError;
use thiserror::Error;

/// Result type for rotation operations.
pub type RotationResult<T> = Result<T, RotationError>;

/// Errors raised by a single rotation attempt.
///
/// These never leave the rotation loop; they are logged and the loop retries
/// or backs off.
#[derive(Debug, Error)]
pub enum RotationError {
    /// The identity service did not answer within the fetch timeout.
    #[error("secret fetch timed out after {0:?}")]
    Timeout(Duration),

    /// The identity service answered with a failure.
    #[error("secret fetch failed: {0}")]
    Fetch(#[source] BastionError),

    /// The fetched material could not be installed.
    #[error("secret material rejected: {0}")]
    Install(#[source] BastionError),

    /// Invalid rotation configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl RotationError {
    /// Create a timeout error.
    pub fn timeout(duration: Duration) -> Self {
        Self::Timeout(duration)
    }

    /// Create an invalid configuration error.
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig(reason.into())
    }

    /// Check if another attempt could succeed.
    pub fn should_retry(&self) -> bool {
        !matches!(self, Self::InvalidConfig(_))
    }
}

impl From<RotationError> for BastionError {
    fn from(error: RotationError) -> Self {
        match error {
            RotationError::Timeout(duration) => BastionError::external_timeout(
                format!("secret fetch timed out after {duration:?}"),
                Some(crate::client::IDENTITY_SERVICE),
            ),
            RotationError::Fetch(inner) | RotationError::Install(inner) => inner,
            RotationError::InvalidConfig(reason) => BastionError::internal_configuration(reason),
        }
    }
}
