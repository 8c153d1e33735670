//! Bearer credential verification against current and previous secrets.
//!
//! The verifier holds two generations of HS256 keys. Tokens are checked
//! against the current key first and, only if that fails, against the previous
//! key, so tokens signed just before a rotation keep working until they expire.
//!
//! Key material is published as one immutable [`VerifierState`] snapshot
//! behind an `Arc`. [`CredentialVerifier::install`] builds the whole snapshot
//! first and then swaps it in under a write lock; readers clone the `Arc`
//! under a read lock and verify outside it. A reader never observes a new
//! current key paired with a stale previous key.

use std::fmt;
use std::sync::Arc;

use bastion_core::{BastionError, BastionResult, Principal, PrincipalContext};
use chrono::{DateTime, Utc};
use http::HeaderMap;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Validation};
use parking_lot::RwLock;
use tracing::{debug, info};

use crate::bearer::bearer_token;
use crate::claims::TokenClaims;
use crate::secret::SecretMaterial;

/// Static verification settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifierSettings {
    /// Required `iss` claim.
    pub issuer: String,
    /// Allowed clock skew when checking expiry, in seconds.
    pub leeway_secs: u64,
}

impl VerifierSettings {
    /// Creates settings with no leeway.
    #[must_use]
    pub fn new(issuer: impl Into<String>) -> Self {
        Self {
            issuer: issuer.into(),
            leeway_secs: 0,
        }
    }

    /// Sets the leeway in seconds.
    #[must_use]
    pub const fn with_leeway_secs(mut self, leeway_secs: u64) -> Self {
        self.leeway_secs = leeway_secs;
        self
    }
}

/// One generation of key material.
pub(crate) struct KeyVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl KeyVerifier {
    fn new(secret: &str, settings: &VerifierSettings) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[settings.issuer.as_str()]);
        validation.set_required_spec_claims(&["exp", "iss"]);
        validation.leeway = settings.leeway_secs;

        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    fn decode(&self, raw_token: &str) -> Result<TokenClaims, jsonwebtoken::errors::Error> {
        jsonwebtoken::decode::<TokenClaims>(raw_token, &self.key, &self.validation)
            .map(|data| data.claims)
    }
}

/// An installed snapshot of verifier key material.
pub struct VerifierState {
    pub(crate) current: KeyVerifier,
    pub(crate) previous: Option<KeyVerifier>,
    pub(crate) signing_key: EncodingKey,
    installed_at: DateTime<Utc>,
}

impl VerifierState {
    fn build(material: &SecretMaterial, settings: &VerifierSettings) -> BastionResult<Self> {
        require_non_blank("secret", &material.current_secret)?;
        if let Some(previous) = &material.previous_secret {
            require_non_blank("previous secret", previous)?;
        }

        Ok(Self {
            current: KeyVerifier::new(&material.current_secret, settings),
            previous: material
                .previous_secret
                .as_deref()
                .map(|secret| KeyVerifier::new(secret, settings)),
            signing_key: EncodingKey::from_secret(material.current_secret.as_bytes()),
            installed_at: Utc::now(),
        })
    }

    /// Returns `true` if a previous-generation key is installed.
    #[must_use]
    pub const fn has_previous(&self) -> bool {
        self.previous.is_some()
    }

    /// Returns when this snapshot was installed.
    #[must_use]
    pub const fn installed_at(&self) -> DateTime<Utc> {
        self.installed_at
    }
}

impl fmt::Debug for VerifierState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VerifierState")
            .field("has_previous", &self.has_previous())
            .field("installed_at", &self.installed_at)
            .finish_non_exhaustive()
    }
}

/// Verifies bearer tokens and turns them into [`Principal`]s.
///
/// # Example
///
/// ```
/// use bastion_identity::{CredentialVerifier, SecretMaterial, TokenRequest, VerifierSettings};
///
/// let verifier = CredentialVerifier::new(VerifierSettings::new("zen-iam")).unwrap();
/// verifier.install(&SecretMaterial::new("s3cret", None, 3_600_000)).unwrap();
///
/// let token = verifier
///     .issue(&TokenRequest::new("u-1", chrono::Utc::now() + chrono::Duration::minutes(5)).role("admin"))
///     .unwrap();
/// let principal = verifier.verify(&token).unwrap();
/// assert!(principal.has_role("admin"));
/// ```
pub struct CredentialVerifier {
    settings: VerifierSettings,
    state: RwLock<Option<Arc<VerifierState>>>,
}

impl CredentialVerifier {
    /// Creates a verifier with no key material installed.
    ///
    /// Every verification fails closed until [`install`](Self::install)
    /// succeeds once.
    pub fn new(settings: VerifierSettings) -> BastionResult<Self> {
        require_non_blank("issuer", &settings.issuer)?;
        Ok(Self {
            settings,
            state: RwLock::new(None),
        })
    }

    /// Returns the verification settings.
    #[must_use]
    pub const fn settings(&self) -> &VerifierSettings {
        &self.settings
    }

    /// Builds a new state from `material` and swaps it in atomically.
    ///
    /// On error the installed state is left untouched.
    pub fn install(&self, material: &SecretMaterial) -> BastionResult<()> {
        let state = Arc::new(VerifierState::build(material, &self.settings)?);
        let has_previous = state.has_previous();
        *self.state.write() = Some(state);

        info!(
            issuer = %self.settings.issuer,
            has_previous,
            validity_window_ms = material.validity_window_ms,
            "Installed verifier key material"
        );
        Ok(())
    }

    /// Returns the installed snapshot, if any.
    #[must_use]
    pub fn snapshot(&self) -> Option<Arc<VerifierState>> {
        self.state.read().clone()
    }

    /// Returns `true` once key material has been installed.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.state.read().is_some()
    }

    /// Verifies a raw token and decodes its claims into a [`Principal`].
    ///
    /// Every failure (malformed token, bad signature, wrong issuer, expired
    /// beyond leeway, no key material yet) is reported as
    /// [`BastionError::InvalidCredential`]. When both generations reject the
    /// token, the current generation's failure is kept as the cause.
    pub fn verify(&self, raw_token: &str) -> BastionResult<Principal> {
        let Some(state) = self.snapshot() else {
            return Err(BastionError::invalid_credential(
                "Could not verify token: verifier not yet initialized",
            ));
        };

        let claims = match state.current.decode(raw_token) {
            Ok(claims) => claims,
            Err(current_error) => match state.previous.as_ref().map(|p| p.decode(raw_token)) {
                Some(Ok(claims)) => {
                    debug!("Token verified with previous secret");
                    claims
                }
                _ => {
                    return Err(BastionError::invalid_credential_with_source(
                        "Could not verify token",
                        current_error,
                    ))
                }
            },
        };

        Ok(claims.into_principal(raw_token))
    }

    /// Authenticates a request from its headers.
    ///
    /// When a bearer credential is presented it is verified and the resulting
    /// principal is set on `ctx`. When none is presented the context is left
    /// empty, which is not an error.
    pub fn authenticate(&self, headers: &HeaderMap, ctx: &mut PrincipalContext) -> BastionResult<()> {
        let Some(raw_token) = bearer_token(headers) else {
            debug!(request_id = %ctx.request_id(), "No bearer credential presented");
            return Ok(());
        };

        let principal = self.verify(raw_token)?;
        debug!(
            request_id = %ctx.request_id(),
            user_id = %principal.user_id(),
            "Authenticated principal"
        );
        ctx.set(principal);
        Ok(())
    }
}

impl fmt::Debug for CredentialVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialVerifier")
            .field("settings", &self.settings)
            .field("state", &self.snapshot())
            .finish()
    }
}

fn require_non_blank(name: &str, value: &str) -> BastionResult<()> {
    if value.trim().is_empty() {
        return Err(BastionError::internal_configuration(format!(
            "{name} must not be empty"
        )));
    }
    Ok(())
}
