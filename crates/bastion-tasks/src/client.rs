//! Identity-service client.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use bastion_core::{BastionError, BastionResult, ExternalDetail};
use bastion_identity::SecretMaterial;
use serde_json::Value;
use tracing::debug;

use crate::signing::SignedSecretRequest;

/// Service name used in errors and logs.
pub const IDENTITY_SERVICE: &str = "identity-service";

/// A boxed future that is `Send`.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Source of the latest signing-secret material.
///
/// # Example
///
/// ```
/// use bastion_core::BastionResult;
/// use bastion_identity::SecretMaterial;
/// use bastion_tasks::{BoxFuture, IdentityService, SignedSecretRequest};
///
/// struct Fixed;
///
/// impl IdentityService for Fixed {
///     fn fetch_latest_secret<'a>(
///         &'a self,
///         _request: &'a SignedSecretRequest,
///     ) -> BoxFuture<'a, BastionResult<SecretMaterial>> {
///         Box::pin(async { Ok(SecretMaterial::new("s1", None, 60_000)) })
///     }
/// }
/// ```
pub trait IdentityService: Send + Sync {
    /// Fetches the latest secret material for the signed request.
    fn fetch_latest_secret<'a>(
        &'a self,
        request: &'a SignedSecretRequest,
    ) -> BoxFuture<'a, BastionResult<SecretMaterial>>;
}

/// [`IdentityService`] over HTTP.
///
/// Posts the signed request as JSON to the endpoint URL exactly as given and
/// decodes [`SecretMaterial`] from the response body.
#[derive(Debug, Clone)]
pub struct HttpIdentityService {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpIdentityService {
    /// Creates a client for `endpoint` with a per-request timeout.
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> BastionResult<Self> {
        let endpoint = endpoint.into();
        if endpoint.trim().is_empty() {
            return Err(BastionError::internal_configuration(
                "identity service endpoint must not be empty",
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| {
                BastionError::internal_with_source("Could not build HTTP client", error)
            })?;

        Ok(Self { client, endpoint })
    }

    /// Returns the endpoint URL.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn fetch(&self, request: &SignedSecretRequest) -> BastionResult<SecretMaterial> {
        debug!(endpoint = %self.endpoint, app_name = %request.app_name, "Requesting latest secret");

        let response = self
            .client
            .post(&self.endpoint)
            .json(request)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BastionError::external_with_detail(
                format!("identity service responded with status {status}"),
                IDENTITY_SERVICE,
                external_detail(&body),
            ));
        }

        response.json::<SecretMaterial>().await.map_err(|error| {
            BastionError::external_with_source(
                "Could not decode secret material",
                IDENTITY_SERVICE,
                error,
            )
        })
    }
}

impl IdentityService for HttpIdentityService {
    fn fetch_latest_secret<'a>(
        &'a self,
        request: &'a SignedSecretRequest,
    ) -> BoxFuture<'a, BastionResult<SecretMaterial>> {
        Box::pin(self.fetch(request))
    }
}

fn transport_error(error: reqwest::Error) -> BastionError {
    if error.is_timeout() {
        BastionError::external_timeout(
            format!("identity service did not answer: {error}"),
            Some(IDENTITY_SERVICE),
        )
    } else {
        BastionError::external_with_source("Could not reach identity service", IDENTITY_SERVICE, error)
    }
}

/// Reads `code` and `message` from an error body, if it is JSON.
fn external_detail(body: &str) -> Option<ExternalDetail> {
    let value: Value = serde_json::from_str(body).ok()?;
    let code = value.get("code").and_then(|code| match code {
        Value::String(code) => Some(code.clone()),
        Value::Number(code) => Some(code.to_string()),
        _ => None,
    });
    let message = value
        .get("message")
        .and_then(Value::as_str)
        .map(ToString::to_string);
    ExternalDetail::from_parts(code, message)
}
