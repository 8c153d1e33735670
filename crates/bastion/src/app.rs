//! Wiring from configuration to running components.

use std::sync::Arc;

use bastion_authz::AppGate;
use bastion_config::BastionConfig;
use bastion_core::{BastionError, BastionResult, ErrorRegistry};
use bastion_identity::{CredentialVerifier, VerifierSettings};
use bastion_tasks::{
    HttpIdentityService, IdentityService, RequestSigner, RotationConfig, SecretRotationLoop,
};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::boundary::RequestBoundary;

/// A configured Bastion instance.
///
/// Owns the error registry, the credential verifier and the secret rotation
/// loop that keeps the verifier supplied. With JWT disabled there is neither a
/// verifier nor a rotation loop, and no principal is ever established.
pub struct Bastion {
    config: BastionConfig,
    registry: Arc<ErrorRegistry>,
    verifier: Option<Arc<CredentialVerifier>>,
    rotation: Option<Arc<SecretRotationLoop>>,
    app_gate: Option<AppGate>,
}

impl Bastion {
    /// Builds an instance that fetches secrets over HTTP.
    ///
    /// Configuration problems are `InternalConfiguration` failures.
    pub fn from_config(config: BastionConfig) -> BastionResult<Self> {
        config.validate()?;
        if !config.jwt.enabled {
            return Ok(Self::without_verification(config));
        }

        let service = HttpIdentityService::new(
            config.identity.secret_endpoint_url.clone(),
            config.identity.fetch_timeout(),
        )?;
        Self::with_identity_service(config, Arc::new(service))
    }

    /// Builds an instance that fetches secrets from `service`.
    pub fn with_identity_service(
        config: BastionConfig,
        service: Arc<dyn IdentityService>,
    ) -> BastionResult<Self> {
        config.validate()?;
        if !config.jwt.enabled {
            return Ok(Self::without_verification(config));
        }

        let settings = VerifierSettings::new(config.jwt.issuer.clone())
            .with_leeway_secs(config.jwt.leeway_secs);
        let verifier = Arc::new(CredentialVerifier::new(settings)?);

        let signer = RequestSigner::new(
            config.identity.app_name.clone(),
            config.identity.hmac_key.clone(),
        )
        .map_err(BastionError::from)?;
        let rotation_config = RotationConfig::new()
            .with_fetch_timeout(config.identity.fetch_timeout())
            .with_retry_backoff(config.identity.retry_backoff());
        let rotation = Arc::new(SecretRotationLoop::new(
            rotation_config,
            signer,
            service,
            Arc::clone(&verifier),
        ));

        let app_gate = AppGate::new(config.identity.app_name.clone())?;

        info!(
            issuer = %config.jwt.issuer,
            app_name = %config.identity.app_name,
            leeway_secs = config.jwt.leeway_secs,
            "Bastion configured"
        );

        Ok(Self {
            config,
            registry: Arc::new(ErrorRegistry::with_defaults()),
            verifier: Some(verifier),
            rotation: Some(rotation),
            app_gate: Some(app_gate),
        })
    }

    fn without_verification(config: BastionConfig) -> Self {
        warn!("Token verification is disabled");
        let app_gate = AppGate::new(config.identity.app_name.clone()).ok();
        Self {
            config,
            registry: Arc::new(ErrorRegistry::with_defaults()),
            verifier: None,
            rotation: None,
            app_gate,
        }
    }

    /// Installs the global log subscriber described by the logging section.
    pub fn init_logging(&self) -> BastionResult<()> {
        bastion_telemetry::init_logging(&self.config.logging.to_log_config())
            .map_err(|e| BastionError::internal_configuration(e.to_string()))
    }

    /// Starts the rotation loop on the current Tokio runtime.
    ///
    /// Returns `None` when verification is disabled or the loop was already
    /// started; nothing new is scheduled then.
    pub fn start(&self) -> Option<JoinHandle<()>> {
        match &self.rotation {
            Some(rotation) => Arc::clone(rotation).spawn(),
            None => {
                warn!("Secret rotation is disabled, not scheduling");
                None
            }
        }
    }

    /// Returns a request boundary sharing this instance's verifier and registry.
    pub fn boundary(&self) -> RequestBoundary {
        RequestBoundary::new(self.verifier.clone(), Arc::clone(&self.registry))
    }

    /// Returns the configuration.
    pub fn config(&self) -> &BastionConfig {
        &self.config
    }

    /// Returns the error registry. Register custom adapters here.
    pub fn registry(&self) -> &Arc<ErrorRegistry> {
        &self.registry
    }

    /// Returns the credential verifier, if verification is enabled.
    pub fn verifier(&self) -> Option<&Arc<CredentialVerifier>> {
        self.verifier.as_ref()
    }

    /// Returns the rotation loop, if verification is enabled.
    pub fn rotation(&self) -> Option<&Arc<SecretRotationLoop>> {
        self.rotation.as_ref()
    }

    /// Returns the gate bound to the configured application name, if one is set.
    pub fn app_gate(&self) -> Option<&AppGate> {
        self.app_gate.as_ref()
    }
}

impl std::fmt::Debug for Bastion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bastion")
            .field("config", &self.config)
            .field("verifier", &self.verifier.is_some())
            .field("rotation", &self.rotation)
            .field("app_gate", &self.app_gate)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bastion_config::{IdentityConfig, JwtConfig};

    fn config() -> BastionConfig {
        BastionConfig::builder()
            .jwt(JwtConfig {
                issuer: "zen-iam".to_string(),
                leeway_secs: 5,
                ..Default::default()
            })
            .identity(IdentityConfig {
                app_name: "billing".to_string(),
                secret_endpoint_url: "http://127.0.0.1:9/secret".to_string(),
                hmac_key: "pre-shared-key".to_string(),
                retry_backoff_ms: 1_000,
                ..Default::default()
            })
            .build()
    }

    #[test]
    fn test_from_config_wires_components() {
        let bastion = Bastion::from_config(config()).unwrap();

        let verifier = bastion.verifier().unwrap();
        assert_eq!(verifier.settings().issuer, "zen-iam");
        assert_eq!(verifier.settings().leeway_secs, 5);
        assert!(!verifier.is_ready());

        let rotation = bastion.rotation().unwrap();
        assert_eq!(
            rotation.config().retry_backoff,
            std::time::Duration::from_secs(1)
        );
        assert_eq!(bastion.app_gate().unwrap().app_name(), "billing");
    }

    #[test]
    fn test_missing_issuer_is_internal_configuration() {
        let mut config = config();
        config.jwt.issuer = String::new();

        let err = Bastion::from_config(config).unwrap_err();
        assert!(matches!(err, BastionError::InternalConfiguration { .. }));
    }

    #[tokio::test]
    async fn test_start_schedules_one_loop() {
        let bastion = Bastion::from_config(config()).unwrap();

        let handle = bastion.start().unwrap();
        assert!(bastion.rotation().unwrap().is_started());
        assert!(bastion.start().is_none());

        handle.abort();
    }

    #[test]
    fn test_disabled_jwt_has_no_verifier() {
        let config = BastionConfig::builder()
            .jwt(JwtConfig {
                enabled: false,
                ..Default::default()
            })
            .build();

        let bastion = Bastion::from_config(config).unwrap();
        assert!(bastion.verifier().is_none());
        assert!(bastion.rotation().is_none());
        assert!(bastion.app_gate().is_none());
        assert!(bastion.start().is_none());
    }
}
