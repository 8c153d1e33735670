//! Request boundary.
//!
//! A [`RequestBoundary`] runs one unit of work:
//!
//! ```text
//! headers ──▶ new PrincipalContext ──▶ authenticate ──▶ operation ──▶ Ok(T)
//!                                          │                │
//!                                          └──── Err ───────┴──▶ classify ──▶ Rejection
//! ```
//!
//! The context is cleared on every exit path, including early returns, panics
//! and a dropped `run_async` future. Internal causes are logged; only the
//! classified envelope reaches the caller.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use bastion_core::{
    BastionError, BastionResult, ErrorEnvelope, ErrorRegistry, Principal, PrincipalContext,
    RequestId, UNKNOWN_ERROR_CODE, UNKNOWN_ERROR_MESSAGE,
};
use bastion_identity::CredentialVerifier;
use bastion_tasks::BoxFuture;
use http::header::CONTENT_TYPE;
use http::{HeaderMap, HeaderValue, Response, StatusCode};

/// A classified, client-safe failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    status: StatusCode,
    envelope: ErrorEnvelope,
}

impl Rejection {
    /// HTTP status to answer with.
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Stable error code.
    pub const fn code(&self) -> u32 {
        self.envelope.error.code
    }

    /// The envelope sent to the client.
    pub const fn envelope(&self) -> &ErrorEnvelope {
        &self.envelope
    }

    /// Builds a JSON response carrying the envelope.
    pub fn into_response(self) -> Response<String> {
        let body = serde_json::to_string(&self.envelope).unwrap_or_else(|_| {
            format!(r#"{{"error":{{"code":{UNKNOWN_ERROR_CODE},"message":"{UNKNOWN_ERROR_MESSAGE}"}}}}"#)
        });

        let mut response = Response::new(body);
        *response.status_mut() = self.status;
        response
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        response
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}): {}",
            self.status, self.envelope.error.code, self.envelope.error.message
        )
    }
}

impl std::error::Error for Rejection {}

/// Runs operations inside a fresh principal context.
#[derive(Clone)]
pub struct RequestBoundary {
    verifier: Option<Arc<CredentialVerifier>>,
    registry: Arc<ErrorRegistry>,
}

impl RequestBoundary {
    /// Creates a boundary. Without a verifier no principal is ever established.
    pub fn new(verifier: Option<Arc<CredentialVerifier>>, registry: Arc<ErrorRegistry>) -> Self {
        Self { verifier, registry }
    }

    /// Returns the registry failures are classified with.
    pub fn registry(&self) -> &ErrorRegistry {
        &self.registry
    }

    /// Authenticates from `headers` and runs `op`.
    ///
    /// ```
    /// use std::sync::Arc;
    ///
    /// use bastion::RequestBoundary;
    /// use bastion_authz::require_signed_in;
    /// use bastion_core::ErrorRegistry;
    /// use http::HeaderMap;
    ///
    /// let boundary = RequestBoundary::new(None, Arc::new(ErrorRegistry::with_defaults()));
    /// let rejection = boundary
    ///     .run(&HeaderMap::new(), |ctx| require_signed_in(ctx).map(|_| ()))
    ///     .unwrap_err();
    /// assert_eq!(rejection.code(), 300);
    /// ```
    pub fn run<T, F>(&self, headers: &HeaderMap, op: F) -> Result<T, Rejection>
    where
        F: FnOnce(&PrincipalContext) -> BastionResult<T>,
    {
        let mut ctx = PrincipalContext::new();
        let request_id = ctx.request_id();

        let result = {
            let mut scope = ctx.enter(None);
            self.authenticate(headers, &mut scope)
                .and_then(|()| op(&*scope))
        };

        self.finish(request_id, ctx.elapsed(), result)
    }

    /// Async form of [`run`](Self::run).
    ///
    /// `op` borrows the context for the life of its future:
    ///
    /// ```rust,ignore
    /// boundary
    ///     .run_async(&headers, |ctx| {
    ///         Box::pin(async move {
    ///             require_role(ctx, "admin")?;
    ///             load_report().await
    ///         })
    ///     })
    ///     .await
    /// ```
    pub async fn run_async<T, F>(&self, headers: &HeaderMap, op: F) -> Result<T, Rejection>
    where
        F: for<'c> FnOnce(&'c PrincipalContext) -> BoxFuture<'c, BastionResult<T>>,
    {
        let mut ctx = PrincipalContext::new();
        let request_id = ctx.request_id();

        let result = {
            let mut scope = ctx.enter(None);
            match self.authenticate(headers, &mut scope) {
                Ok(()) => op(&*scope).await,
                Err(e) => Err(e),
            }
        };

        self.finish(request_id, ctx.elapsed(), result)
    }

    /// Classifies `error` into a rejection and logs its internal cause.
    pub fn reject(&self, request_id: RequestId, error: &BastionError) -> Rejection {
        let classification = self.registry.describe(error);
        bastion_telemetry::log_request_failure!(
            request_id,
            classification.adapter,
            classification.code,
            error.log_chain()
        );

        Rejection {
            status: classification.status,
            envelope: classification.to_envelope(Some(request_id)),
        }
    }

    fn authenticate(&self, headers: &HeaderMap, ctx: &mut PrincipalContext) -> BastionResult<()> {
        if let Some(verifier) = &self.verifier {
            verifier.authenticate(headers, ctx)?;
        }
        bastion_telemetry::log_request_start!(
            ctx.request_id(),
            ctx.get_optional().map_or("anonymous", Principal::user_id)
        );
        Ok(())
    }

    fn finish<T>(
        &self,
        request_id: RequestId,
        elapsed: Duration,
        result: BastionResult<T>,
    ) -> Result<T, Rejection> {
        match result {
            Ok(value) => {
                bastion_telemetry::log_request_complete!(request_id, duration_ms(elapsed));
                Ok(value)
            }
            Err(error) => Err(self.reject(request_id, &error)),
        }
    }
}

impl fmt::Debug for RequestBoundary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestBoundary")
            .field("authenticates", &self.verifier.is_some())
            .finish_non_exhaustive()
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
