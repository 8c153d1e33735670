//! Authorization token issuing.

use bastion_core::{BastionError, BastionResult};
use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, Header};
use uuid::Uuid;

use crate::claims::TokenClaims;
use crate::verifier::CredentialVerifier;

/// Tokens are backdated so that verifiers with a slightly slow clock accept them.
const ISSUED_AT_BACKDATE_SECS: i64 = 15;

/// What to put in a new authorization token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenRequest {
    /// User id.
    pub user_id: String,
    /// Application the user signed into.
    pub app_name: String,
    /// Username.
    pub username: String,
    /// Roles.
    pub roles: Vec<String>,
    /// Capabilities ("events").
    pub events: Vec<String>,
    /// Expiry.
    pub expires_at: DateTime<Utc>,
}

impl TokenRequest {
    /// Creates a request for `user_id` expiring at `expires_at`.
    #[must_use]
    pub fn new(user_id: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            user_id: user_id.into(),
            app_name: String::new(),
            username: String::new(),
            roles: Vec::new(),
            events: Vec::new(),
            expires_at,
        }
    }

    /// Sets the application name.
    #[must_use]
    pub fn app_name(mut self, app_name: impl Into<String>) -> Self {
        self.app_name = app_name.into();
        self
    }

    /// Sets the username.
    #[must_use]
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = username.into();
        self
    }

    /// Adds a role.
    #[must_use]
    pub fn role(mut self, role: impl Into<String>) -> Self {
        self.roles.push(role.into());
        self
    }

    /// Adds a capability.
    #[must_use]
    pub fn event(mut self, event: impl Into<String>) -> Self {
        self.events.push(event.into());
        self
    }
}

impl CredentialVerifier {
    /// Signs a new authorization token with the current secret.
    ///
    /// The token carries the configured issuer, an issued-at 15 seconds in the
    /// past, the requested expiry and a fresh token id.
    pub fn issue(&self, request: &TokenRequest) -> BastionResult<String> {
        let state = self.snapshot().ok_or_else(|| {
            BastionError::internal("Cannot issue tokens before a signing secret is installed")
        })?;

        let claims = TokenClaims {
            iss: self.settings().issuer.clone(),
            iat: Some(Utc::now().timestamp() - ISSUED_AT_BACKDATE_SECS),
            exp: request.expires_at.timestamp(),
            jti: Some(Uuid::now_v7().to_string()),
            user_id: request.user_id.clone(),
            app_name: request.app_name.clone(),
            username: request.username.clone(),
            user_roles: request.roles.clone(),
            user_events: request.events.clone(),
        };

        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &state.signing_key)
            .map_err(|error| BastionError::internal_with_source("Could not sign token", error))
    }
}
