//! Request-scoped principal context.
//!
//! A [`PrincipalContext`] holds at most one [`Principal`] for one unit of work.
//! It is created empty when the work starts, populated once the credential is
//! verified, and cleared when the work ends. Contexts are passed explicitly and
//! never shared between concurrent requests.

use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::error::{BastionError, BastionResult};
use crate::principal::Principal;

/// A unique identifier for each request, using UUID v7.
///
/// Time-ordered, so log lines sort by request start.
///
/// # Example
///
/// ```
/// use bastion_core::RequestId;
///
/// let id = RequestId::new();
/// assert_eq!(id.as_uuid().get_version_num(), 7);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Creates a new unique request ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Creates a `RequestId` from an existing UUID, e.g. one propagated by a caller.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for RequestId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl From<RequestId> for Uuid {
    fn from(id: RequestId) -> Self {
        id.0
    }
}

/// Holds the principal for one unit of work.
///
/// # Example
///
/// ```
/// use bastion_core::{Principal, PrincipalContext};
///
/// let mut ctx = PrincipalContext::new();
/// {
///     let scope = ctx.enter(Some(Principal::builder("u-1").role("reader").build()));
///     assert!(scope.get().unwrap().has_role("reader"));
/// }
/// assert!(ctx.get_optional().is_none());
/// ```
#[derive(Debug)]
pub struct PrincipalContext {
    request_id: RequestId,
    principal: Option<Arc<Principal>>,
    started_at: Instant,
}

impl PrincipalContext {
    /// Creates an empty context with a fresh request ID.
    #[must_use]
    pub fn new() -> Self {
        Self::with_request_id(RequestId::new())
    }

    /// Creates an empty context with the specified request ID.
    #[must_use]
    pub fn with_request_id(request_id: RequestId) -> Self {
        Self {
            request_id,
            principal: None,
            started_at: Instant::now(),
        }
    }

    /// Returns the request ID.
    #[must_use]
    pub const fn request_id(&self) -> RequestId {
        self.request_id
    }

    /// Sets the principal.
    ///
    /// A context is populated once per unit of work; replacing a principal is
    /// allowed but logged.
    pub fn set(&mut self, principal: impl Into<Arc<Principal>>) {
        let principal = principal.into();
        if let Some(previous) = &self.principal {
            warn!(
                request_id = %self.request_id,
                previous = %previous.log_id(),
                replacement = %principal.log_id(),
                "Replacing principal in a populated context"
            );
        }
        self.principal = Some(principal);
    }

    /// Removes the principal, if any.
    pub fn clear(&mut self) {
        self.principal = None;
    }

    /// Returns the principal, or [`BastionError::NoPrincipal`] if none is set.
    pub fn get(&self) -> BastionResult<&Principal> {
        self.principal.as_deref().ok_or(BastionError::NoPrincipal)
    }

    /// Returns the principal, if any. Absence is not an error.
    #[must_use]
    pub fn get_optional(&self) -> Option<&Principal> {
        self.principal.as_deref()
    }

    /// Returns a shared handle to the principal, for work that outlives a borrow.
    #[must_use]
    pub fn shared(&self) -> Option<Arc<Principal>> {
        self.principal.clone()
    }

    /// Returns `true` if a principal is set.
    #[must_use]
    pub const fn is_present(&self) -> bool {
        self.principal.is_some()
    }

    /// Returns the elapsed time since the context was created.
    #[must_use]
    pub fn elapsed(&self) -> std::time::Duration {
        self.started_at.elapsed()
    }

    /// Populates the context for a scope that clears it on every exit path,
    /// including early `?` returns and panics.
    pub fn enter(&mut self, principal: Option<Principal>) -> PrincipalScope<'_> {
        if let Some(principal) = principal {
            self.set(principal);
        }
        PrincipalScope { context: self }
    }
}

impl Default for PrincipalContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Guard returned by [`PrincipalContext::enter`]. Clears the context on drop.
#[derive(Debug)]
pub struct PrincipalScope<'a> {
    context: &'a mut PrincipalContext,
}

impl Deref for PrincipalScope<'_> {
    type Target = PrincipalContext;

    fn deref(&self) -> &Self::Target {
        self.context
    }
}

impl DerefMut for PrincipalScope<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.context
    }
}

impl Drop for PrincipalScope<'_> {
    fn drop(&mut self) {
        self.context.clear();
    }
}
