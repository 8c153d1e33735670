//! End to end: configuration, rotation, authentication, gates, classification.

use std::sync::Arc;
use std::time::Duration;

use bastion::prelude::*;
use bastion::config::{IdentityConfig, JwtConfig};
use bastion::core::kinds;
use bastion::tasks::{BoxFuture, IdentityService, SignedSecretRequest};
use http::header::AUTHORIZATION;
use http::{HeaderMap, HeaderValue, StatusCode};
use script::Script;

mod script {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use bastion::identity::SecretMaterial;

    /// Replies handed out in order; repeats the last one when exhausted.
    pub struct Script(Mutex<VecDeque<SecretMaterial>>);

    impl Script {
        pub fn new(replies: impl IntoIterator<Item = SecretMaterial>) -> Self {
            Self(Mutex::new(replies.into_iter().collect()))
        }

        pub fn next(&self) -> Option<SecretMaterial> {
            let mut replies = self.0.lock().unwrap();
            if replies.len() > 1 {
                replies.pop_front()
            } else {
                replies.front().cloned()
            }
        }
    }
}

struct StubIdentityService {
    script: Script,
}

impl IdentityService for StubIdentityService {
    fn fetch_latest_secret<'a>(
        &'a self,
        _request: &'a SignedSecretRequest,
    ) -> BoxFuture<'a, BastionResult<SecretMaterial>> {
        let reply = self.script.next();
        Box::pin(async move {
            reply.ok_or_else(|| BastionError::external("no secret scripted", Some("stub")))
        })
    }
}

fn config() -> BastionConfig {
    BastionConfig::builder()
        .jwt(JwtConfig {
            issuer: "zen-iam".to_string(),
            ..Default::default()
        })
        .identity(IdentityConfig {
            app_name: "billing".to_string(),
            secret_endpoint_url: "http://127.0.0.1:9/secret".to_string(),
            hmac_key: "pre-shared-key".to_string(),
            ..Default::default()
        })
        .build()
}

fn secret(current: &str, previous: Option<&str>) -> SecretMaterial {
    SecretMaterial::new(current, previous.map(ToString::to_string), 3_600_000)
}

async fn started(replies: Vec<SecretMaterial>) -> Bastion {
    let service = Arc::new(StubIdentityService {
        script: Script::new(replies),
    });
    let bastion = Bastion::with_identity_service(config(), service).unwrap();
    bastion.rotation().unwrap().run_cycle().await;
    bastion
}

fn token(bastion: &Bastion, roles: &[&str]) -> String {
    let mut request = TokenRequest::new("u-1", chrono::Utc::now() + chrono::Duration::minutes(5))
        .app_name("billing")
        .username("ada");
    for role in roles {
        request = request.role(*role);
    }
    bastion.verifier().unwrap().issue(&request).unwrap()
}

fn bearer(token: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
    );
    headers
}

#[tokio::test]
async fn authenticated_request_passes_gates() {
    let bastion = started(vec![secret("secret-a", None)]).await;
    let headers = bearer(&token(&bastion, &["admin"]));
    let gate = bastion.app_gate().unwrap().clone();

    let user = bastion
        .boundary()
        .run(&headers, |ctx| {
            require_role(ctx, "admin")?;
            gate.require_username(ctx, "ada")?;
            Ok(gate.require_signed_into_app(ctx)?.user_id().to_string())
        })
        .unwrap();

    assert_eq!(user, "u-1");
}

#[tokio::test]
async fn missing_credential_is_authentication_required() {
    let bastion = started(vec![secret("secret-a", None)]).await;

    let rejection = bastion
        .boundary()
        .run(&HeaderMap::new(), |ctx| require_signed_in(ctx).map(|_| ()))
        .unwrap_err();

    assert_eq!(rejection.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(rejection.code(), 300);
}

#[tokio::test]
async fn bad_credential_never_reaches_operation() {
    let bastion = started(vec![secret("secret-a", None)]).await;
    let mut ran = false;

    let rejection = bastion
        .boundary()
        .run(&bearer("not.a.token"), |_| {
            ran = true;
            Ok(())
        })
        .unwrap_err();

    assert!(!ran);
    assert_eq!(rejection.code(), 310);
    assert_eq!(rejection.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn missing_role_is_denied_with_client_message() {
    let bastion = started(vec![secret("secret-a", None)]).await;
    let headers = bearer(&token(&bastion, &["reader"]));

    let rejection = bastion
        .boundary()
        .run(&headers, |ctx| require_any_role(ctx, ["admin", "auditor"]))
        .unwrap_err();

    assert_eq!(rejection.status(), StatusCode::FORBIDDEN);
    assert_eq!(rejection.code(), 320);
}

#[tokio::test]
async fn token_survives_one_rotation() {
    let bastion = started(vec![
        secret("secret-a", None),
        secret("secret-b", Some("secret-a")),
        secret("secret-c", Some("secret-b")),
    ])
    .await;
    let old = token(&bastion, &["admin"]);

    bastion.rotation().unwrap().run_cycle().await;
    assert!(bastion
        .boundary()
        .run(&bearer(&old), |ctx| require_role(ctx, "admin"))
        .is_ok());

    bastion.rotation().unwrap().run_cycle().await;
    let rejection = bastion
        .boundary()
        .run(&bearer(&old), |ctx| require_role(ctx, "admin"))
        .unwrap_err();
    assert_eq!(rejection.code(), 310);
}

#[tokio::test]
async fn custom_adapter_overrides_default() {
    let bastion = started(vec![secret("secret-a", None)]).await;
    bastion.registry().register(
        ErrorAdapter::new("billing_denied", 4_031, "Billing access denied.")
            .with_status(StatusCode::FORBIDDEN),
        &[&kinds::AUTHORIZATION_DENIED],
    );
    let headers = bearer(&token(&bastion, &[]));

    let rejection = bastion
        .boundary()
        .run(&headers, |ctx| require_capability(ctx, "invoice.void"))
        .unwrap_err();

    assert_eq!(rejection.code(), 4_031);
    assert_eq!(rejection.envelope().error.message, "Billing access denied.");
}

#[tokio::test]
async fn async_operation_sees_principal_across_awaits() {
    let bastion = started(vec![secret("secret-a", None)]).await;
    let headers = bearer(&token(&bastion, &["admin"]));

    let user = bastion
        .boundary()
        .run_async(&headers, |ctx| {
            Box::pin(async move {
                tokio::time::sleep(Duration::from_millis(1)).await;
                require_role(ctx, "admin")?;
                Ok(ctx.get()?.user_id().to_string())
            })
        })
        .await
        .unwrap();

    assert_eq!(user, "u-1");
}

#[test]
fn disabled_verification_never_authenticates() {
    let config = BastionConfig::builder()
        .jwt(JwtConfig {
            enabled: false,
            ..Default::default()
        })
        .build();
    let bastion = Bastion::from_config(config).unwrap();

    let result = tokio_test::block_on(bastion.boundary().run_async(
        &bearer("anything"),
        |ctx| Box::pin(async move { Ok(ctx.is_present()) }),
    ));

    assert_eq!(result, Ok(false));
}
